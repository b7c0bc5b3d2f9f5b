//! Error types for sign-in and token storage.

use std::time::Duration;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, OAuthError>;

/// Errors that can occur during sign-in.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// The provider returned no code, an `error=` redirect, or a mismatched state.
    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    /// No redirect arrived within the allowed wait.
    #[error("Timed out after {}s waiting for the browser redirect", .0.as_secs())]
    Timeout(Duration),

    /// The pending authorization was cancelled by the caller.
    #[error("Sign-in cancelled")]
    Cancelled,

    /// Another sign-in already owns the loopback listener.
    #[error("Another sign-in is already in progress")]
    AuthorizationInProgress,

    /// The loopback listener could not be bound or served.
    #[error("Loopback listener error: {0}")]
    Listener(String),

    /// The token endpoint rejected the code or returned a malformed body.
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// The ID token signature or claims were rejected.
    #[error("Invalid ID token: {0}")]
    InvalidIdToken(String),

    /// The application backend rejected the identity.
    #[error("Backend authentication failed: {0}")]
    BackendAuthFailed(String),

    /// The refresh token could not be encrypted or written.
    #[error("Failed to persist refresh token: {0}")]
    TokenPersistenceFailed(String),

    /// The stored refresh token could not be read or decrypted.
    #[error("Failed to load refresh token: {0}")]
    TokenLoadFailed(String),

    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for OAuthError {
    fn from(e: reqwest::Error) -> Self {
        OAuthError::Network(e.to_string())
    }
}
