//! Authorization code exchange.
//!
//! Google codes are redeemed at Google's token endpoint and the returned
//! ID token is verified locally. GitHub codes are handed to the backend,
//! which redeems them and answers with a finished session.

use serde::Serialize;

use crate::authorize::GoogleConfig;
use crate::bridge::{GITHUB_LOGIN_PATH, backend_endpoint, post_for_session};
use crate::error::{OAuthError, Result};
use crate::id_token::IdTokenVerifier;
use crate::token_store::SharedTokenStore;
use crate::types::{GoogleIdentity, Provider, SessionToken, TokenSet};

/// What a redeemed code yields, per provider.
#[derive(Debug)]
pub enum ExchangeOutcome {
    /// Verified identity; still has to be posted to the backend.
    Google {
        tokens: TokenSet,
        identity: GoogleIdentity,
    },
    /// The backend already issued the session.
    GitHub(SessionToken),
}

#[derive(Serialize)]
struct GitHubCodeRequest<'a> {
    code: &'a str,
}

/// Redeems authorization codes and hands refresh tokens to the store.
pub struct AuthorizationCodeExchanger {
    http: reqwest::Client,
    backend_url: String,
    google: Option<GoogleConfig>,
    verifier: Option<IdTokenVerifier>,
    store: SharedTokenStore,
}

impl AuthorizationCodeExchanger {
    pub fn new(
        http: reqwest::Client,
        backend_url: impl Into<String>,
        store: SharedTokenStore,
    ) -> Self {
        Self {
            http,
            backend_url: backend_url.into(),
            google: None,
            verifier: None,
            store,
        }
    }

    /// Enable Google; ID tokens are verified against `config.jwks_url`.
    pub fn with_google(mut self, config: GoogleConfig) -> Self {
        if self.verifier.is_none() {
            self.verifier = Some(IdTokenVerifier::google(self.http.clone(), &config));
        }
        self.google = Some(config);
        self
    }

    /// Replace the ID token verifier.
    pub fn with_id_token_verifier(mut self, verifier: IdTokenVerifier) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn google_config(&self) -> Option<&GoogleConfig> {
        self.google.as_ref()
    }

    pub fn token_store(&self) -> &SharedTokenStore {
        &self.store
    }

    /// Redeem `code` obtained through `redirect_uri` with `provider`.
    pub async fn exchange(
        &self,
        code: &str,
        redirect_uri: &str,
        provider: Provider,
    ) -> Result<ExchangeOutcome> {
        match provider {
            Provider::Google => {
                let (tokens, identity) = self.exchange_google(code, redirect_uri).await?;
                Ok(ExchangeOutcome::Google { tokens, identity })
            }
            Provider::GitHub => self.exchange_github(code).await.map(ExchangeOutcome::GitHub),
        }
    }

    /// Redeem a Google code, persist the refresh token, verify the ID token.
    pub async fn exchange_google(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<(TokenSet, GoogleIdentity)> {
        let config = self.google_settings()?;
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", redirect_uri),
        ];
        if let Some(secret) = config.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let tokens = self.request_tokens(&config.token_url, &form).await?;

        // The refresh token is the only thing that survives a restart.
        if let Some(refresh_token) = tokens.refresh_token.as_deref() {
            self.store.save(refresh_token).await?;
        } else {
            tracing::warn!("Google returned no refresh token; silent sign-in will be unavailable");
        }

        let identity = self.verify_identity(&tokens).await?;
        Ok((tokens, identity))
    }

    /// Redeem a stored refresh token for fresh tokens and a verified identity.
    ///
    /// A rotated refresh token replaces the stored one.
    pub async fn refresh_google(&self, refresh_token: &str) -> Result<(TokenSet, GoogleIdentity)> {
        let config = self.google_settings()?;
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", config.client_id.as_str()),
        ];
        if let Some(secret) = config.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let tokens = self.request_tokens(&config.token_url, &form).await?;

        if let Some(rotated) = tokens.refresh_token.as_deref()
            && rotated != refresh_token
        {
            self.store.save(rotated).await?;
        }

        let identity = self.verify_identity(&tokens).await?;
        Ok((tokens, identity))
    }

    /// Hand a GitHub code to the backend and return its session.
    pub async fn exchange_github(&self, code: &str) -> Result<SessionToken> {
        let url = backend_endpoint(&self.backend_url, GITHUB_LOGIN_PATH);
        tracing::debug!(url = %url, "Posting GitHub code to backend");

        post_for_session(
            &self.http,
            &url,
            &GitHubCodeRequest { code },
            OAuthError::TokenExchangeFailed,
        )
        .await
    }

    fn google_settings(&self) -> Result<&GoogleConfig> {
        self.google
            .as_ref()
            .ok_or_else(|| OAuthError::Config("Google sign-in is not configured".to_string()))
    }

    async fn request_tokens(&self, token_url: &str, form: &[(&str, &str)]) -> Result<TokenSet> {
        let response = self
            .http
            .post(token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| OAuthError::Network(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(OAuthError::TokenExchangeFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        let tokens: TokenSet = response.json().await.map_err(|e| {
            OAuthError::TokenExchangeFailed(format!("Failed to parse token response: {}", e))
        })?;

        if tokens.access_token.is_empty() {
            return Err(OAuthError::TokenExchangeFailed(
                "token response has an empty access token".to_string(),
            ));
        }

        Ok(tokens)
    }

    async fn verify_identity(&self, tokens: &TokenSet) -> Result<GoogleIdentity> {
        let id_token = tokens
            .id_token
            .as_deref()
            .ok_or_else(|| OAuthError::InvalidIdToken("token response has no id_token".to_string()))?;
        let verifier = self
            .verifier
            .as_ref()
            .ok_or_else(|| OAuthError::Config("Google sign-in is not configured".to_string()))?;

        let claims = verifier.verify(id_token).await?;
        Ok(GoogleIdentity::new(claims, id_token))
    }
}
