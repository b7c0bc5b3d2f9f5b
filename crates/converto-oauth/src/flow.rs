//! End-to-end sign-in: browser, loopback redirect, code exchange, backend session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::authorize::{
    DEFAULT_CALLBACK_TIMEOUT, GitHubConfig, generate_state, github_authorization_url,
    google_authorization_url,
};
use crate::bridge::BackendSessionBridge;
use crate::browser::{BrowserLauncher, SystemBrowser};
use crate::error::{OAuthError, Result};
use crate::exchange::AuthorizationCodeExchanger;
use crate::listener::LoopbackListener;
use crate::session::SessionStore;
use crate::types::{CallbackParams, PendingAuthorization, Provider, SessionToken};

/// Runs sign-ins one at a time and publishes the resulting session.
pub struct SignInCoordinator {
    exchanger: AuthorizationCodeExchanger,
    bridge: BackendSessionBridge,
    github: Option<GitHubConfig>,
    browser: Arc<dyn BrowserLauncher>,
    session: SessionStore,
    callback_timeout: Duration,
    in_flight: Mutex<()>,
}

impl SignInCoordinator {
    pub fn new(exchanger: AuthorizationCodeExchanger, bridge: BackendSessionBridge) -> Self {
        Self {
            exchanger,
            bridge,
            github: None,
            browser: Arc::new(SystemBrowser),
            session: SessionStore::new(),
            callback_timeout: DEFAULT_CALLBACK_TIMEOUT,
            in_flight: Mutex::new(()),
        }
    }

    pub fn with_github(mut self, config: GitHubConfig) -> Self {
        self.github = Some(config);
        self
    }

    pub fn with_browser(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = browser;
        self
    }

    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = timeout;
        self
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Sign in with `provider`. Fails fast if another sign-in is running.
    pub async fn sign_in(
        &self,
        provider: Provider,
        cancel: &CancellationToken,
    ) -> Result<SessionToken> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| OAuthError::AuthorizationInProgress)?;

        tracing::info!(provider = %provider, "Starting sign-in");
        let result = match provider {
            Provider::Google => self.run_google(cancel).await,
            Provider::GitHub => self.run_github(cancel).await,
        };

        match &result {
            Ok(session) => {
                tracing::info!(provider = %provider, email = %session.user.email, "Signed in");
                self.session.set(session.clone());
            }
            Err(e) => tracing::warn!(provider = %provider, error = %e, "Sign-in failed"),
        }
        result
    }

    pub async fn sign_in_google(&self, cancel: &CancellationToken) -> Result<SessionToken> {
        self.sign_in(Provider::Google, cancel).await
    }

    pub async fn sign_in_github(&self, cancel: &CancellationToken) -> Result<SessionToken> {
        self.sign_in(Provider::GitHub, cancel).await
    }

    /// Restore a Google session from the stored refresh token.
    ///
    /// Returns `Ok(None)` when nothing is stored or Google no longer accepts
    /// the stored token; the latter also clears it.
    pub async fn resume_google(&self) -> Result<Option<SessionToken>> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| OAuthError::AuthorizationInProgress)?;

        let store = self.exchanger.token_store();
        let Some(refresh_token) = store.load().await else {
            tracing::debug!("No stored refresh token");
            return Ok(None);
        };

        let identity = match self.exchanger.refresh_google(&refresh_token).await {
            Ok((_, identity)) => identity,
            Err(OAuthError::TokenExchangeFailed(reason)) => {
                tracing::warn!(reason = %reason, "Stored refresh token rejected, clearing it");
                store.clear().await?;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let session = self.bridge.login(&identity).await?;
        tracing::info!(email = %session.user.email, "Session restored");
        self.session.set(session.clone());
        Ok(Some(session))
    }

    /// Forget the session and the stored refresh token.
    pub async fn sign_out(&self) -> Result<()> {
        self.exchanger.token_store().clear().await?;
        self.session.clear();
        tracing::info!("Signed out");
        Ok(())
    }

    async fn run_google(&self, cancel: &CancellationToken) -> Result<SessionToken> {
        let config = self
            .exchanger
            .google_config()
            .ok_or_else(|| OAuthError::Config("Google sign-in is not configured".to_string()))?;

        let listener =
            LoopbackListener::bind_localhost(config.redirect_port, &config.redirect_path).await?;
        let pending = PendingAuthorization {
            provider: Provider::Google,
            redirect_uri: listener.redirect_uri(),
            state: None,
        };
        let url = google_authorization_url(config, &pending.redirect_uri);

        let params = self.await_redirect(listener, &url, cancel).await?;
        pending.verify_state(params.state.as_deref())?;

        let (_, identity) = self
            .exchanger
            .exchange_google(&params.code, &pending.redirect_uri)
            .await?;
        self.bridge.login(&identity).await
    }

    async fn run_github(&self, cancel: &CancellationToken) -> Result<SessionToken> {
        let config = self
            .github
            .as_ref()
            .ok_or_else(|| OAuthError::Config("GitHub sign-in is not configured".to_string()))?;

        let listener =
            LoopbackListener::bind_localhost(config.redirect_port, &config.redirect_path).await?;
        let pending = PendingAuthorization {
            provider: Provider::GitHub,
            redirect_uri: listener.redirect_uri(),
            state: Some(generate_state()),
        };
        let state = pending.state.as_deref().unwrap_or_default();
        let url = github_authorization_url(config, &pending.redirect_uri, state);

        let params = self.await_redirect(listener, &url, cancel).await?;
        pending.verify_state(params.state.as_deref())?;

        self.exchanger.exchange_github(&params.code).await
    }

    /// Open the browser and wait for the redirect; the listener is stopped on return.
    async fn await_redirect(
        &self,
        listener: LoopbackListener,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<CallbackParams> {
        tracing::debug!(redirect_uri = %listener.redirect_uri(), "Waiting for browser redirect");
        if let Err(e) = self.browser.open(url) {
            tracing::warn!(error = %e, "Could not open browser");
        }
        listener.wait(self.callback_timeout, cancel).await
    }
}
