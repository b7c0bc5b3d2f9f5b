//! Google ID token verification against the published signing keys.

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::authorize::GoogleConfig;
use crate::error::{OAuthError, Result};
use crate::types::IdentityClaims;

/// Issuers Google puts in the `iss` claim.
pub const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

#[derive(Debug, Deserialize)]
struct GoogleClaims {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

/// Verifies RS256 ID tokens and extracts the profile claims.
///
/// Signing keys are fetched lazily and cached. A token signed with an
/// unknown key id triggers one refetch before it is rejected.
pub struct IdTokenVerifier {
    http: reqwest::Client,
    jwks_url: String,
    audience: String,
    issuers: Vec<String>,
    keys: RwLock<Option<JwkSet>>,
}

impl IdTokenVerifier {
    pub fn new(
        http: reqwest::Client,
        jwks_url: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            http,
            jwks_url: jwks_url.into(),
            audience: audience.into(),
            issuers: GOOGLE_ISSUERS.iter().map(|s| s.to_string()).collect(),
            keys: RwLock::new(None),
        }
    }

    /// Verifier for tokens issued to the configured Google client.
    pub fn google(http: reqwest::Client, config: &GoogleConfig) -> Self {
        Self::new(http, &config.jwks_url, &config.client_id)
    }

    /// Seed the key cache, skipping the first fetch.
    pub fn with_key_set(mut self, keys: JwkSet) -> Self {
        self.keys = RwLock::new(Some(keys));
        self
    }

    /// Check signature, audience, issuer and expiry, then return the claims.
    pub async fn verify(&self, id_token: &str) -> Result<IdentityClaims> {
        let header = decode_header(id_token)
            .map_err(|e| invalid(format!("malformed token header: {}", e)))?;
        if header.alg != Algorithm::RS256 {
            return Err(invalid(format!("unexpected algorithm {:?}", header.alg)));
        }
        let kid = header
            .kid
            .ok_or_else(|| invalid("token header has no key id"))?;

        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&self.issuers);

        let claims = decode::<GoogleClaims>(id_token, &key, &validation)
            .map_err(|e| invalid(e.to_string()))?
            .claims;

        if claims.email_verified == Some(false) {
            return Err(invalid("email address is not verified"));
        }
        let email = claims
            .email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| invalid("token carries no email claim"))?;

        tracing::debug!(email = %email, "ID token verified");

        Ok(IdentityClaims {
            email,
            given_name: claims.given_name,
            family_name: claims.family_name,
            picture: claims.picture,
        })
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey> {
        if let Some(key) = self.cached_key(kid).await? {
            return Ok(key);
        }
        self.fetch_keys().await?;
        self.cached_key(kid)
            .await?
            .ok_or_else(|| invalid(format!("unknown signing key {}", kid)))
    }

    async fn cached_key(&self, kid: &str) -> Result<Option<DecodingKey>> {
        let keys = self.keys.read().await;
        match keys.as_ref().and_then(|set| set.find(kid)) {
            Some(jwk) => DecodingKey::from_jwk(jwk)
                .map(Some)
                .map_err(|e| invalid(format!("unusable signing key {}: {}", kid, e))),
            None => Ok(None),
        }
    }

    async fn fetch_keys(&self) -> Result<()> {
        tracing::debug!(url = %self.jwks_url, "Fetching ID token signing keys");

        let response = self.http.get(&self.jwks_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(invalid(format!("signing key fetch failed: HTTP {}", status)));
        }
        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| invalid(format!("malformed signing key set: {}", e)))?;

        *self.keys.write().await = Some(set);
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> OAuthError {
    OAuthError::InvalidIdToken(message.into())
}
