//! Single-shot loopback HTTP listener for OAuth redirects.
//!
//! Binds `127.0.0.1:<port>` (port `0` picks a free one), answers the first
//! request on the registered path with a fixed page and shuts itself down.
//! The port is released on every exit path: redirect received, timeout,
//! cancellation, or drop.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Router,
    extract::{Query, State},
    response::Html,
    routing::get,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{OAuthError, Result};
use crate::types::CallbackParams;

/// Page shown in the browser once the redirect has been captured.
const CALLBACK_PAGE: &str = "<!DOCTYPE html><html><body style='font-family:sans-serif; text-align:center; margin-top:50px;'><h3>Login Successful!</h3><p>You can close this window and return to the application.</p><script>window.close();</script></body></html>";

/// How long the server task may take to wind down before it is aborted.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

type RawQuery = HashMap<String, String>;

/// Shared state for the callback route.
struct CallbackState {
    sender: Mutex<Option<oneshot::Sender<RawQuery>>>,
}

/// A bound loopback endpoint waiting for exactly one redirect.
pub struct LoopbackListener {
    local_addr: SocketAddr,
    path: String,
    callback_rx: oneshot::Receiver<RawQuery>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<()>>,
}

impl LoopbackListener {
    /// Bind to `addr` and start serving `path`.
    pub async fn bind(addr: SocketAddr, path: &str) -> Result<Self> {
        let path = normalize_path(path);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| OAuthError::Listener(format!("Failed to bind {}: {}", addr, e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| OAuthError::Listener(format!("Failed to read bound address: {}", e)))?;

        let (callback_tx, callback_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let state = Arc::new(CallbackState {
            sender: Mutex::new(Some(callback_tx)),
        });
        let router = Router::new()
            .route(&path, get(handle_callback))
            .with_state(state);

        let server = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                tracing::warn!(error = %e, "Loopback listener stopped with error");
            }
        });

        tracing::debug!(addr = %local_addr, path = %path, "Loopback listener bound");

        Ok(Self {
            local_addr,
            path,
            callback_rx,
            shutdown_tx: Some(shutdown_tx),
            server: Some(server),
        })
    }

    /// Bind on `127.0.0.1:<port>`.
    pub async fn bind_localhost(port: u16, path: &str) -> Result<Self> {
        Self::bind(SocketAddr::from(([127, 0, 0, 1], port)), path).await
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// The URL to register as the OAuth redirect target.
    pub fn redirect_uri(&self) -> String {
        format!("http://{}{}", self.local_addr, self.path)
    }

    /// Wait for the redirect, then stop the listener.
    ///
    /// Fails with [`OAuthError::Timeout`] after `timeout`, with
    /// [`OAuthError::Cancelled`] when `cancel` fires, and with
    /// [`OAuthError::AuthorizationDenied`] when the redirect carries no code.
    /// The listener is stopped before any of these errors is returned.
    pub async fn wait(
        mut self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<CallbackParams> {
        let outcome = tokio::select! {
            received = &mut self.callback_rx => received.map_err(|_| {
                OAuthError::Listener("listener stopped before a redirect arrived".to_string())
            }),
            _ = tokio::time::sleep(timeout) => Err(OAuthError::Timeout(timeout)),
            _ = cancel.cancelled() => Err(OAuthError::Cancelled),
        };

        self.shutdown().await;

        parse_callback(outcome?)
    }

    /// Stop serving and wait until the socket is closed.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(mut server) = self.server.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await.is_err() {
                tracing::warn!(addr = %self.local_addr, "Loopback listener did not stop in time, aborting");
                server.abort();
                let _ = server.await;
            }
            tracing::debug!(addr = %self.local_addr, "Loopback listener stopped");
        }
    }
}

impl Drop for LoopbackListener {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(server) = self.server.take() {
            server.abort();
        }
    }
}

/// Handle the redirect: hand the query to the waiter once, always answer with the page.
async fn handle_callback(
    State(state): State<Arc<CallbackState>>,
    Query(query): Query<RawQuery>,
) -> Html<&'static str> {
    let sender = state.sender.lock().ok().and_then(|mut slot| slot.take());
    match sender {
        Some(tx) => {
            let _ = tx.send(query);
        }
        None => tracing::debug!("Ignoring repeated loopback callback"),
    }
    Html(CALLBACK_PAGE)
}

fn parse_callback(mut query: RawQuery) -> Result<CallbackParams> {
    if let Some(error) = query.remove("error") {
        let detail = match query.remove("error_description") {
            Some(description) => format!("{}: {}", error, description),
            None => error,
        };
        return Err(OAuthError::AuthorizationDenied(detail));
    }

    let code = query
        .remove("code")
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            OAuthError::AuthorizationDenied("authorization code not received".to_string())
        })?;

    Ok(CallbackParams {
        code,
        state: query.remove("state"),
    })
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn hit(url: String) -> String {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .unwrap();
        client.get(url).send().await.unwrap().text().await.unwrap()
    }

    async fn assert_port_free(addr: SocketAddr) {
        TcpListener::bind(addr)
            .await
            .expect("port should be released after the listener stops");
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let listener = LoopbackListener::bind_localhost(0, "/callback").await.unwrap();
        assert_ne!(listener.port(), 0);
        assert_eq!(
            listener.redirect_uri(),
            format!("http://127.0.0.1:{}/callback", listener.port())
        );
    }

    #[tokio::test]
    async fn test_path_is_normalized() {
        let listener = LoopbackListener::bind_localhost(0, "callback").await.unwrap();
        assert!(listener.redirect_uri().ends_with("/callback"));
    }

    #[tokio::test]
    async fn test_receives_code_and_state() {
        let listener = LoopbackListener::bind_localhost(0, "/callback").await.unwrap();
        let addr = listener.local_addr();
        let browser = tokio::spawn(hit(format!(
            "{}?code=abc123&state=xyz",
            listener.redirect_uri()
        )));

        let params = listener
            .wait(Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(params.code, "abc123");
        assert_eq!(params.state.as_deref(), Some("xyz"));

        let page = browser.await.unwrap();
        assert!(page.contains("Login Successful"));
        assert_port_free(addr).await;
    }

    #[tokio::test]
    async fn test_missing_code_is_denied() {
        let listener = LoopbackListener::bind_localhost(0, "/").await.unwrap();
        let addr = listener.local_addr();
        let browser = tokio::spawn(hit(format!("{}?state=only", listener.redirect_uri())));

        let result = listener
            .wait(Duration::from_secs(5), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(OAuthError::AuthorizationDenied(_))));

        browser.await.unwrap();
        assert_port_free(addr).await;
    }

    #[tokio::test]
    async fn test_provider_error_is_denied() {
        let listener = LoopbackListener::bind_localhost(0, "/").await.unwrap();
        let browser = tokio::spawn(hit(format!(
            "{}?error=access_denied&error_description=User%20cancelled",
            listener.redirect_uri()
        )));

        let err = listener
            .wait(Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("access_denied: User cancelled"));
        browser.await.unwrap();
    }

    #[tokio::test]
    async fn test_timeout_releases_port() {
        let listener = LoopbackListener::bind_localhost(0, "/").await.unwrap();
        let addr = listener.local_addr();

        let result = listener
            .wait(Duration::from_millis(50), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(OAuthError::Timeout(_))));
        assert_port_free(addr).await;
    }

    #[tokio::test]
    async fn test_cancel_releases_port() {
        let listener = LoopbackListener::bind_localhost(0, "/").await.unwrap();
        let addr = listener.local_addr();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = listener.wait(Duration::from_secs(30), &cancel).await;
        assert!(matches!(result, Err(OAuthError::Cancelled)));
        assert_port_free(addr).await;
    }

    #[tokio::test]
    async fn test_other_paths_are_not_captured() {
        let listener = LoopbackListener::bind_localhost(0, "/callback").await.unwrap();
        let base = format!("http://{}", listener.local_addr());

        let client = reqwest::Client::new();
        let status = client
            .get(format!("{}/favicon.ico", base))
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status, reqwest::StatusCode::NOT_FOUND);

        let browser = tokio::spawn(hit(format!("{}/callback?code=later", base)));
        let params = listener
            .wait(Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(params.code, "later");
        browser.await.unwrap();
    }

    #[test]
    fn test_parse_callback() {
        let mut query = RawQuery::new();
        query.insert("code".to_string(), "c".to_string());
        let params = parse_callback(query).unwrap();
        assert_eq!(params.code, "c");
        assert!(params.state.is_none());

        let mut empty_code = RawQuery::new();
        empty_code.insert("code".to_string(), String::new());
        assert!(parse_callback(empty_code).is_err());
    }
}
