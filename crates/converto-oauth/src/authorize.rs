//! Provider settings and authorization URL construction.

use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;

/// Default wait for the browser redirect.
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(120);

/// Google OAuth client settings.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub authorize_url: String,
    pub token_url: String,
    pub jwks_url: String,
    pub scope: String,
    /// Loopback port; `0` picks a free port.
    pub redirect_port: u16,
    pub redirect_path: String,
}

impl GoogleConfig {
    pub fn new(client_id: impl Into<String>, client_secret: Option<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            jwks_url: "https://www.googleapis.com/oauth2/v3/certs".to_string(),
            scope: "openid email profile".to_string(),
            redirect_port: 0,
            redirect_path: "/".to_string(),
        }
    }
}

/// GitHub OAuth client settings.
///
/// The code is exchanged by the backend, so no client secret lives here.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub client_id: String,
    pub authorize_url: String,
    pub scope: String,
    /// Loopback port; `0` picks a free port.
    pub redirect_port: u16,
    pub redirect_path: String,
}

impl GitHubConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            authorize_url: "https://github.com/login/oauth/authorize".to_string(),
            scope: "user:email".to_string(),
            redirect_port: 0,
            redirect_path: "/callback".to_string(),
        }
    }
}

/// Generate a random state string for CSRF protection.
pub fn generate_state() -> String {
    let mut state_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut state_bytes);
    URL_SAFE_NO_PAD.encode(state_bytes)
}

/// Authorization URL for the Google code flow.
///
/// Requests offline access so the token response carries a refresh token.
pub fn google_authorization_url(config: &GoogleConfig, redirect_uri: &str) -> String {
    let params = [
        ("client_id", config.client_id.as_str()),
        ("redirect_uri", redirect_uri),
        ("response_type", "code"),
        ("scope", config.scope.as_str()),
        ("access_type", "offline"),
        ("prompt", "consent"),
    ];
    with_query(&config.authorize_url, &params)
}

/// Authorization URL for the GitHub code flow.
pub fn github_authorization_url(config: &GitHubConfig, redirect_uri: &str, state: &str) -> String {
    let params = [
        ("client_id", config.client_id.as_str()),
        ("redirect_uri", redirect_uri),
        ("scope", config.scope.as_str()),
        ("state", state),
    ];
    with_query(&config.authorize_url, &params)
}

fn with_query(base: &str, params: &[(&str, &str)]) -> String {
    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", base, query)
}
