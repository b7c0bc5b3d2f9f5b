//! Background removal API.

use super::compress::ensure_inputs;
use crate::client::ConvertoClient;
use crate::error::Result;
use crate::types::{Download, PathsRequest};

/// Background removal API client.
pub struct BackgroundApi {
    client: ConvertoClient,
}

impl BackgroundApi {
    pub(crate) fn new(client: ConvertoClient) -> Self {
        Self { client }
    }

    /// Remove the background from each image; returns a PNG or a zip of PNGs.
    pub async fn remove(&self, input_paths: &[String]) -> Result<Download> {
        ensure_inputs(input_paths)?;
        self.client
            .post_for_download("remove_background", &PathsRequest { input_paths })
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::ConvertoClient;

    #[tokio::test]
    async fn test_remove() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/remove_background"))
            .and(body_json(json!({"input_paths": ["/img/cat.jpg"]})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-disposition", r#"attachment; filename="cat.png""#)
                    .set_body_bytes(b"\x89PNG".to_vec()),
            )
            .mount(&server)
            .await;

        let client = ConvertoClient::builder()
            .base_url(format!("{}/api", server.uri()))
            .build()
            .unwrap();
        let download = client
            .background()
            .remove(&["/img/cat.jpg".to_string()])
            .await
            .unwrap();
        assert_eq!(download.file_name.as_deref(), Some("cat.png"));
        assert_eq!(download.data, b"\x89PNG");
    }
}
