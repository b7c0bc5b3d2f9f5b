//! User account API.

use crate::client::ConvertoClient;
use crate::error::Result;
use crate::types::UserPreferences;

/// User API client.
pub struct UserApi {
    client: ConvertoClient,
}

impl UserApi {
    pub(crate) fn new(client: ConvertoClient) -> Self {
        Self { client }
    }

    /// Preferences of the signed-in user.
    pub async fn preferences(&self) -> Result<UserPreferences> {
        self.client.get("user/get_user_preference").await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::{ConvertoClient, Error, UserPreferences};

    fn client(server: &MockServer) -> ConvertoClient {
        ConvertoClient::builder()
            .base_url(format!("{}/api", server.uri()))
            .auth_token("session")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_preferences() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/user/get_user_preference"))
            .and(header("authorization", "Bearer session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "DefaultOutputFolder": "C:/Downloads",
                "Language": "en",
                "Theme": null
            })))
            .mount(&server)
            .await;

        let prefs = client(&server).user().preferences().await.unwrap();
        assert_eq!(
            prefs,
            UserPreferences {
                default_output_folder: Some("C:/Downloads".to_string()),
                language: Some("en".to_string()),
                theme: None,
            }
        );
    }

    #[tokio::test]
    async fn test_preferences_requires_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/user/get_user_preference"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"detail": "Not authenticated"})),
            )
            .mount(&server)
            .await;

        let err = client(&server).user().preferences().await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }
}
