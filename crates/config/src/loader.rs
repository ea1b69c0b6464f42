use std::{
    path::{Path, PathBuf},
    sync::RwLock,
};

use tracing::{debug, warn};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::ParlorConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["parlor.toml", "parlor.yaml", "parlor.yml", "parlor.json"];

static CONFIG_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Override the user-global config directory (e.g. from `--config-dir`).
pub fn set_config_dir(dir: PathBuf) {
    if let Ok(mut guard) = CONFIG_DIR_OVERRIDE.write() {
        *guard = Some(dir);
    }
}

/// Drop a previously set config directory override.
pub fn clear_config_dir() {
    if let Ok(mut guard) = CONFIG_DIR_OVERRIDE.write() {
        *guard = None;
    }
}

/// Returns the user-global config directory (`~/.config/parlor/` unless overridden).
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(guard) = CONFIG_DIR_OVERRIDE.read()
        && let Some(dir) = guard.as_ref()
    {
        return Some(dir.clone());
    }
    directories::ProjectDirs::from("", "", "parlor").map(|d| d.config_dir().to_path_buf())
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<ParlorConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let expanded = substitute_env(&raw);
    for name in &expanded.unresolved {
        warn!(path = %path.display(), var = %name, "config references an unset environment variable");
    }
    parse_config(&expanded.text, path)
}

/// Discover and load config from standard locations, then apply env overrides.
///
/// Search order:
/// 1. `./parlor.{toml,yaml,yml,json}` (project-local)
/// 2. `<config_dir>/parlor.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to `ParlorConfig::default()` if no file is found or it fails to parse.
pub fn discover_and_load() -> ParlorConfig {
    let mut config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            match load_config(&path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                    ParlorConfig::default()
                },
            }
        },
        None => {
            debug!("no config file found, using defaults");
            ParlorConfig::default()
        },
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config
}

/// Apply `PARLOR_BIND` / `PARLOR_PORT` / `PARLOR_NLU_ENDPOINT` overrides.
pub fn apply_env_overrides(config: &mut ParlorConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(bind) = lookup("PARLOR_BIND") {
        config.server.bind = bind;
    }
    if let Some(port) = lookup("PARLOR_PORT") {
        match port.parse() {
            Ok(p) => config.server.port = p,
            Err(e) => warn!(value = %port, error = %e, "ignoring invalid PARLOR_PORT"),
        }
    }
    if let Some(endpoint) = lookup("PARLOR_NLU_ENDPOINT") {
        config.nlu.endpoint = Some(endpoint);
    }
}

/// The config file `discover_and_load` would read, if any.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

fn parse_config(raw: &str, path: &Path) -> Result<ParlorConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}
