//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [backend]    # application backend URL and timeouts
//! [google]     # Google OAuth client
//! [github]     # GitHub OAuth client
//! [oauth]      # sign-in behaviour shared by both providers
//! [archive]    # result merging
//! [logging]    # log file output
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Default backend address.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000/api";

/// Default request timeout against the backend, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default wait for the OAuth browser redirect, in seconds.
pub const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 120;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g. project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertoConfig {
    pub backend: Option<BackendConfig>,
    pub google: Option<GoogleSection>,
    pub github: Option<GitHubSection>,
    pub oauth: Option<OAuthSection>,
    pub archive: Option<ArchiveSection>,
    pub logging: Option<LoggingConfig>,
}

impl ConvertoConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole, not field by field.
    pub fn merge(&mut self, other: ConvertoConfig) {
        if other.backend.is_some() {
            self.backend = other.backend;
        }
        if other.google.is_some() {
            self.google = other.google;
        }
        if other.github.is_some() {
            self.github = other.github;
        }
        if other.oauth.is_some() {
            self.oauth = other.oauth;
        }
        if other.archive.is_some() {
            self.archive = other.archive;
        }
        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// A config with every section filled with its defaults, for `config init`.
    pub fn starter() -> Self {
        Self {
            backend: Some(BackendConfig::default()),
            google: Some(GoogleSection::default()),
            github: Some(GitHubSection::default()),
            oauth: Some(OAuthSection::default()),
            archive: Some(ArchiveSection::default()),
            logging: Some(LoggingConfig::default()),
        }
    }

    pub fn effective_backend(&self) -> BackendConfig {
        self.backend.clone().unwrap_or_default()
    }

    pub fn effective_oauth(&self) -> OAuthSection {
        self.oauth.clone().unwrap_or_default()
    }

    pub fn effective_archive(&self) -> ArchiveSection {
        self.archive.clone().unwrap_or_default()
    }

    pub fn effective_logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    /// Google client settings; fails when no client id is configured.
    pub fn require_google(&self) -> Result<&GoogleSection> {
        match &self.google {
            Some(google) if google.client_id.as_deref().is_some_and(|id| !id.is_empty()) => {
                Ok(google)
            }
            _ => Err(ConfigError::MissingField {
                field: "client_id".to_string(),
                context: "[google]".to_string(),
            }),
        }
    }

    /// GitHub client settings; fails when no client id is configured.
    pub fn require_github(&self) -> Result<&GitHubSection> {
        match &self.github {
            Some(github) if github.client_id.as_deref().is_some_and(|id| !id.is_empty()) => {
                Ok(github)
            }
            _ => Err(ConfigError::MissingField {
                field: "client_id".to_string(),
                context: "[github]".to_string(),
            }),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend API.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OAuth Provider Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Google OAuth client (`[google]`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSection {
    pub client_id: Option<String>,
    /// Prefer the keyring or `CONVERTO_GOOGLE_CLIENT_SECRET` over this field.
    pub client_secret: Option<String>,
    /// Loopback port for the redirect; `0` picks a free port.
    pub redirect_port: u16,
}

impl GoogleSection {
    pub fn has_plaintext_secret(&self) -> bool {
        self.client_secret.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// GitHub OAuth client (`[github]`). The secret lives with the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubSection {
    pub client_id: Option<String>,
    /// Loopback port for the redirect; `0` picks a free port.
    pub redirect_port: u16,
}

/// Sign-in behaviour (`[oauth]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthSection {
    /// How long to wait for the browser redirect.
    pub callback_timeout_secs: u64,
    /// Launch the system browser; when false the URL is only printed.
    pub open_browser: bool,
}

impl Default for OAuthSection {
    fn default() -> Self {
        Self {
            callback_timeout_secs: DEFAULT_CALLBACK_TIMEOUT_SECS,
            open_browser: true,
        }
    }
}

impl OAuthSection {
    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.callback_timeout_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Archive Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Result merging (`[archive]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveSection {
    /// `"rename"` or `"skip"`.
    pub on_collision: String,
}

impl Default for ArchiveSection {
    fn default() -> Self {
        Self {
            on_collision: "rename".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Log file output (`[logging]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write a daily JSON log file in addition to console output.
    pub file: bool,
    /// Directory for log files; defaults to `<config_dir>/logs`.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: true,
            dir: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
