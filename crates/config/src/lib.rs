//! Configuration loading, env substitution, and overrides.
//!
//! Config files: `parlor.toml`, `parlor.yaml`, or `parlor.json`
//! Searched in `./` then `~/.config/parlor/`.
//!
//! `${ENV_VAR}` and `${ENV_VAR:-fallback}` placeholders are expanded before
//! parsing.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{
        apply_env_overrides, clear_config_dir, config_dir, discover_and_load, find_config_file,
        load_config, set_config_dir,
    },
    schema::{
        AuthConfig, ChannelsConfig, MetricsConfig, NluConfig, OperatorSession, ParlorConfig,
        ServerConfig, SocketsConfig,
    },
};

/// Render a config as pretty TOML (used by `parlor config show`).
pub fn to_toml(config: &ParlorConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}
