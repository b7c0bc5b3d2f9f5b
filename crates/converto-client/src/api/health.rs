//! Health API.

use crate::client::ConvertoClient;
use crate::error::{Error, Result};
use crate::types::HealthResponse;

/// Health API client.
///
/// The health endpoint sits at the server root, outside the API prefix, and
/// needs no session.
pub struct HealthApi {
    client: ConvertoClient,
}

impl HealthApi {
    pub(crate) fn new(client: ConvertoClient) -> Self {
        Self { client }
    }

    /// Check backend health.
    pub async fn check(&self) -> Result<HealthResponse> {
        let inner = self.client.inner();
        let url = inner.base_url.join("/health").map_err(Error::from)?;

        let response = inner.http.get(url).timeout(inner.timeout).send().await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Error::Api {
                status: response.status().as_u16(),
                message: "Health check failed".to_string(),
            })
        }
    }

    /// Simple connectivity check.
    pub async fn is_healthy(&self) -> bool {
        self.check().await.is_ok_and(|h| h.is_healthy())
    }
}
