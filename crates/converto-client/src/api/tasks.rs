//! Task history API.

use crate::client::ConvertoClient;
use crate::error::Result;
use crate::types::{TaskOverview, TaskRecord};

/// Tasks API client.
pub struct TasksApi {
    client: ConvertoClient,
}

impl TasksApi {
    pub(crate) fn new(client: ConvertoClient) -> Self {
        Self { client }
    }

    /// Every task the signed-in user has run.
    pub async fn by_user(&self) -> Result<Vec<TaskRecord>> {
        self.client.get("task/task_by_user").await
    }

    /// Dashboard figures computed from [`Self::by_user`].
    pub async fn overview(&self) -> Result<TaskOverview> {
        let records = self.by_user().await?;
        Ok(TaskOverview::from_records(&records))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::{ConvertoClient, ServiceType};

    #[tokio::test]
    async fn test_by_user_and_overview() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/task/task_by_user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "ServiceTypeID": 1,
                    "OriginalFileSize": 2048,
                    "OriginalFilePath": "/in/a.docx",
                    "OutputFileSize": 1024,
                    "OutputFilePath": "/out/a.pdf",
                    "TaskStatus": true,
                    "TaskTime": 0.5,
                    "CreatedAt": "2025-10-01T08:00:00"
                },
                {
                    "ServiceTypeID": 3,
                    "OriginalFileSize": 500,
                    "OriginalFilePath": null,
                    "OutputFileSize": null,
                    "OutputFilePath": null,
                    "TaskStatus": false,
                    "TaskTime": 1.5,
                    "CreatedAt": "2025-10-02T09:30:00.123456"
                }
            ])))
            .mount(&server)
            .await;

        let client = ConvertoClient::builder()
            .base_url(format!("{}/api", server.uri()))
            .auth_token("session")
            .build()
            .unwrap();

        let records = client.tasks().by_user().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].service(), ServiceType::BackgroundRemoval);

        let overview = client.tasks().overview().await.unwrap();
        assert_eq!(overview.total_tasks, 2);
        assert_eq!(overview.success_rate(), 50.0);
        assert_eq!(overview.bytes_saved, 1024);
        assert_eq!(overview.avg_processing_secs, 1.0);
    }
}
