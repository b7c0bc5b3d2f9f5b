//! Client error types.

use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// `detail` from the backend, or a status line.
        message: String,
    },

    /// Missing or rejected session token.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Merging downloaded results failed.
    #[error("Archive error: {0}")]
    Archive(#[from] converto_archive::ArchiveError),
}

impl Error {
    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_)) || matches!(self, Error::Api { status: 404, .. })
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth(_)) || matches!(self, Error::Api { status: 401 | 403, .. })
    }

    /// Check if this is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Api { status, .. } if *status >= 500)
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error body returned by the backend: `{"detail": ...}`.
///
/// `detail` is a string for handled errors and a list of objects for
/// request validation failures.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ErrorResponse {
    pub detail: serde_json::Value,
}

impl ErrorResponse {
    pub(crate) fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.get("msg")
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| item.to_string())
                })
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_string() {
        let body: ErrorResponse =
            serde_json::from_str(r#"{"detail": "Incorrect email or password"}"#).unwrap();
        assert_eq!(body.message(), "Incorrect email or password");
    }

    #[test]
    fn test_detail_validation_list() {
        let body: ErrorResponse = serde_json::from_str(
            r#"{"detail": [{"loc": ["body", "Email"], "msg": "field required"},
                           {"loc": ["body", "Password"], "msg": "too short"}]}"#,
        )
        .unwrap();
        assert_eq!(body.message(), "field required; too short");
    }

    #[test]
    fn test_classification() {
        assert!(Error::Auth("x".into()).is_auth_error());
        assert!(
            Error::Api {
                status: 403,
                message: String::new()
            }
            .is_auth_error()
        );
        assert!(
            Error::Api {
                status: 404,
                message: String::new()
            }
            .is_not_found()
        );
        assert!(
            Error::Api {
                status: 502,
                message: String::new()
            }
            .is_server_error()
        );
        assert!(!Error::Config("x".into()).is_server_error());
    }
}
