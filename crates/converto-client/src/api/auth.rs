//! Email/password auth API.

use converto_oauth::SessionToken;

use crate::client::ConvertoClient;
use crate::error::Result;
use crate::types::{CheckEmailResponse, LoginRequest, RegisteredUser, SignUpRequest};

/// Auth API client.
pub struct AuthApi {
    client: ConvertoClient,
}

impl AuthApi {
    pub(crate) fn new(client: ConvertoClient) -> Self {
        Self { client }
    }

    /// Sign in with email and password.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionToken> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let session: SessionToken = self.client.post("auth/login", &body).await?;
        tracing::info!(user = %session.user.display_name(), "Signed in with password");
        Ok(session)
    }

    /// Whether an account exists for this email.
    pub async fn check_email(&self, email: &str) -> Result<bool> {
        let path = format!("auth/check-email/{}", urlencoding::encode(email));
        let response: CheckEmailResponse = self.client.get(&path).await?;
        Ok(response.exists)
    }

    /// Create an account.
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<RegisteredUser> {
        self.client.post("auth/signup", request).await
    }
}
