//! Configuration system for the Converto client.
//!
//! Provides TOML-based configuration with:
//! - Backend address and timeouts (`[backend]`)
//! - OAuth client settings per provider (`[google]`, `[github]`, `[oauth]`)
//! - Result merging policy (`[archive]`) and log output (`[logging]`)
//! - Config file layering (user config + project-local overrides)
//! - Client secret resolution (keyring → env var → config file)

pub mod discovery;
pub mod error;
pub mod secrets;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, config_dir, data_dir, load_config, load_config_file,
    load_config_with_options, log_dir, save_config, user_config_path,
};
pub use error::{ConfigError, Result};
pub use secrets::{ResolvedSecret, SecretKind, SecretSource, resolve_secret};
pub use types::*;
