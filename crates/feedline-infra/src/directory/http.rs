//! HTTP clients for the user and project services.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use feedline_core::domain::{DirectoryUser, Page, PageRequest, Project};
use feedline_core::ports::{DirectoryError, ProjectDirectory, UserDirectory};

/// Directory service endpoints and retry settings.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Base URL of the user service (e.g., http://localhost:8081)
    pub user_service_url: String,
    /// Base URL of the project service
    pub project_service_url: String,
    /// Attempts per lookup, including the first one
    pub retries: u32,
    /// Fixed delay between attempts
    pub retry_delay: Duration,
    /// Per-request timeout
    pub timeout: Duration,
}

impl DirectoryConfig {
    /// Load from environment. `None` when `USER_SERVICE_URL` is not set.
    pub fn from_env() -> Option<Self> {
        let user_service_url = std::env::var("USER_SERVICE_URL").ok()?;
        Some(Self {
            project_service_url: std::env::var("PROJECT_SERVICE_URL")
                .unwrap_or_else(|_| user_service_url.clone()),
            user_service_url,
            retries: std::env::var("DIRECTORY_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            retry_delay: Duration::from_millis(
                std::env::var("DIRECTORY_RETRY_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(200),
            ),
            timeout: Duration::from_secs(
                std::env::var("DIRECTORY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
        })
    }
}

/// Directory client backed by the remote user and project services.
pub struct HttpDirectory {
    client: reqwest::Client,
    config: DirectoryConfig,
}

impl HttpDirectory {
    pub fn new(config: DirectoryConfig) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DirectoryError::Unavailable(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn users_url(&self) -> String {
        format!("{}/api/v1/users", self.config.user_service_url.trim_end_matches('/'))
    }

    fn projects_url(&self) -> String {
        format!(
            "{}/api/v1/projects",
            self.config.project_service_url.trim_end_matches('/')
        )
    }

    /// Send an idempotent request, retrying transport failures and 5xx
    /// responses with a fixed delay.
    async fn send(&self, request: impl Fn() -> RequestBuilder) -> Result<Response, DirectoryError> {
        let attempts = self.config.retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match request().send().await {
                Ok(response) if response.status().is_server_error() => {
                    last_error = format!("upstream returned {}", response.status());
                }
                Ok(response) => return Ok(response),
                Err(e) => last_error = e.to_string(),
            }

            tracing::warn!(attempt, max_attempts = attempts, error = %last_error, "Directory request failed");
            if attempt < attempts {
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }

        Err(DirectoryError::Unavailable(last_error))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        entity: &'static str,
        id: i64,
        request: impl Fn() -> RequestBuilder,
    ) -> Result<T, DirectoryError> {
        let response = self.send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(DirectoryError::NotFound { entity, id });
        }
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, DirectoryError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(DirectoryError::Unavailable(format!("upstream returned {status}: {body}")));
    }
    response
        .json()
        .await
        .map_err(|e| DirectoryError::Decode(e.to_string()))
}

#[async_trait]
impl UserDirectory for HttpDirectory {
    async fn get_user(&self, id: i64) -> Result<DirectoryUser, DirectoryError> {
        let url = format!("{}/{id}", self.users_url());
        self.fetch("User", id, || self.client.get(&url)).await
    }

    async fn get_users_by_ids(&self, ids: &[i64]) -> Result<Vec<DirectoryUser>, DirectoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.users_url();
        let response = self.send(|| self.client.post(&url).json(ids)).await?;
        decode(response).await
    }

    async fn list_users(&self, page: PageRequest) -> Result<Page<DirectoryUser>, DirectoryError> {
        let url = self.users_url();
        let response = self
            .send(|| {
                self.client
                    .get(&url)
                    .query(&[("page", page.page), ("size", page.size)])
            })
            .await?;
        decode(response).await
    }
}

#[async_trait]
impl ProjectDirectory for HttpDirectory {
    async fn get_project(&self, id: i64) -> Result<Project, DirectoryError> {
        let url = format!("{}/{id}", self.projects_url());
        self.fetch("Project", id, || self.client.get(&url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve canned responses, one per connection, in order.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let reply = format!(
                    "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}"), hits)
    }

    fn client(base: &str) -> HttpDirectory {
        HttpDirectory::new(DirectoryConfig {
            user_service_url: base.to_string(),
            project_service_url: base.to_string(),
            retries: 3,
            retry_delay: Duration::from_millis(10),
            timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_user_decodes_camel_case() {
        let (base, _) = serve(vec![(
            200,
            r#"{"id":7,"username":"ann","followerIds":[1,2],"followeeIds":[3]}"#,
        )])
        .await;

        let user = client(&base).get_user(7).await.unwrap();
        assert_eq!(user.follower_ids, vec![1, 2]);
        assert_eq!(user.followee_ids, vec![3]);
        assert!(user.active);
    }

    #[tokio::test]
    async fn test_not_found_maps_to_directory_not_found() {
        let (base, _) = serve(vec![(404, "{}")]).await;

        let result = client(&base).get_project(9).await;
        assert!(matches!(
            result,
            Err(DirectoryError::NotFound { entity: "Project", id: 9 })
        ));
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let (base, hits) = serve(vec![
            (503, "{}"),
            (200, r#"{"id":1,"title":"Feedline","ownerId":5}"#),
        ])
        .await;

        let project = client(&base).get_project(1).await.unwrap();
        assert_eq!(project.owner_id, 5);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_configured_attempts() {
        let (base, hits) = serve(vec![(500, "{}"), (500, "{}"), (500, "{}")]).await;

        let result = client(&base).get_user(1).await;
        assert!(matches!(result, Err(DirectoryError::Unavailable(_))));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }
}
