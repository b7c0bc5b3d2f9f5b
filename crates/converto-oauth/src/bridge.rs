//! Trading a verified identity for an application session.

use serde::Serialize;

use crate::error::{OAuthError, Result};
use crate::types::{GoogleIdentity, SessionToken};

/// Backend route accepting a verified Google identity.
pub const GOOGLE_LOGIN_PATH: &str = "auth/google_login";

/// Backend route performing the GitHub code exchange.
pub const GITHUB_LOGIN_PATH: &str = "auth/github_login";

/// Posts identities to the application backend and returns its session.
#[derive(Debug, Clone)]
pub struct BackendSessionBridge {
    http: reqwest::Client,
    backend_url: String,
}

impl BackendSessionBridge {
    pub fn new(http: reqwest::Client, backend_url: impl Into<String>) -> Self {
        Self {
            http,
            backend_url: backend_url.into(),
        }
    }

    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    /// Exchange a Google identity for a backend session.
    pub async fn login(&self, identity: &GoogleIdentity) -> Result<SessionToken> {
        let url = backend_endpoint(&self.backend_url, GOOGLE_LOGIN_PATH);
        tracing::debug!(url = %url, email = %identity.email, "Posting identity to backend");

        post_for_session(&self.http, &url, identity, OAuthError::BackendAuthFailed).await
    }
}

/// Join a backend base URL and a relative route.
pub(crate) fn backend_endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// POST `body` as JSON and decode a session; any failure goes through `fail`.
pub(crate) async fn post_for_session<B: Serialize + ?Sized>(
    http: &reqwest::Client,
    url: &str,
    body: &B,
    fail: fn(String) -> OAuthError,
) -> Result<SessionToken> {
    let response = http
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| OAuthError::Network(format!("Backend request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(fail(format!("HTTP {}: {}", status.as_u16(), error_text)));
    }

    let session: SessionToken = response
        .json()
        .await
        .map_err(|e| fail(format!("Failed to parse session response: {}", e)))?;

    if session.access_token.is_empty() {
        return Err(fail("session response has an empty access token".to_string()));
    }

    Ok(session)
}
