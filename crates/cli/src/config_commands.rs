use {anyhow::Result, parlor_config::ParlorConfig};

/// Loaded config with the CLI `--bind` / `--port` flags applied on top.
pub fn effective_config(
    mut config: ParlorConfig,
    bind: Option<String>,
    port: Option<u16>,
) -> ParlorConfig {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config
}

pub fn print_config(config: &ParlorConfig) -> Result<()> {
    print!("{}", parlor_config::to_toml(config)?);
    Ok(())
}

pub fn print_path() -> Result<()> {
    match parlor_config::find_config_file() {
        Some(path) => println!("{}", path.display()),
        None => println!("no config file found, using defaults"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn cli_flags_override_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parlor.toml");
        std::fs::write(&path, "[server]\nbind = \"0.0.0.0\"\nport = 9000\n").unwrap();
        let loaded = parlor_config::load_config(&path).unwrap();

        let config = effective_config(loaded.clone(), None, Some(9100));
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.port, 9100);

        let config = effective_config(loaded, Some("127.0.0.1".into()), None);
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn rendered_config_round_trips() {
        let rendered = parlor_config::to_toml(&ParlorConfig::default()).unwrap();
        assert!(rendered.contains("[sockets]"));
        assert!(rendered.contains("console-channel"));
    }
}
