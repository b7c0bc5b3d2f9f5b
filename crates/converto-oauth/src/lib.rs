//! Browser-based sign-in for Converto.
//!
//! Runs the OAuth authorization-code flow through a loopback redirect,
//! trades the result for an application session, and keeps the Google
//! refresh token encrypted on disk for silent sign-in.
//!
//! # Components
//!
//! - [`authorize`]: provider settings, authorization URLs, state generation
//! - [`listener`]: single-shot loopback HTTP listener (axum)
//! - [`exchange`]: code redemption at Google or through the backend for GitHub
//! - [`id_token`]: Google ID token verification against the published keys
//! - [`bridge`]: posting a verified identity to the backend for a session
//! - [`token_store`]: age-encrypted refresh token persistence
//! - [`flow`]: the coordinator tying the steps together

pub mod authorize;
pub mod bridge;
pub mod browser;
pub mod error;
pub mod exchange;
pub mod flow;
pub mod id_token;
pub mod listener;
pub mod session;
pub mod token_store;
pub mod types;

#[cfg(test)]
mod test_support;

pub use authorize::{DEFAULT_CALLBACK_TIMEOUT, GitHubConfig, GoogleConfig};
pub use bridge::BackendSessionBridge;
pub use browser::{BrowserLauncher, SystemBrowser};
pub use error::{OAuthError, Result};
pub use exchange::{AuthorizationCodeExchanger, ExchangeOutcome};
pub use flow::SignInCoordinator;
pub use id_token::IdTokenVerifier;
pub use listener::LoopbackListener;
pub use session::SessionStore;
pub use token_store::{
    EncryptedFileTokenStore, InMemoryTokenStore, RefreshTokenStore, SharedTokenStore,
};
pub use types::{
    CallbackParams, GoogleIdentity, IdentityClaims, PendingAuthorization, Provider, SessionToken,
    TokenSet, UserProfile,
};

// Re-exported so callers can cancel a pending sign-in without a direct dependency.
pub use tokio_util::sync::CancellationToken;
