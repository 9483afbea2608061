use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, Url};
use tracing::{debug, warn};

use super::models::Task;
use crate::errors::StoreError;

/// Abstraction over the remote task store for testability.
/// Real implementation: `HttpTaskStore`. Test double: `MockTaskStore`.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError>;

    /// `task` carries no id; the store assigns one.
    async fn create_task(&self, task: &Task) -> Result<Task, StoreError>;

    async fn update_task(&self, id: &str, task: &Task) -> Result<Task, StoreError>;

    async fn delete_task(&self, id: &str) -> Result<(), StoreError>;
}

/// REST client for `GET/POST /tasks` and `PUT/DELETE /tasks/{id}`.
#[derive(Debug, Clone)]
pub struct HttpTaskStore {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTaskStore {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, StoreError> {
        let invalid = |message: String| StoreError::InvalidUrl {
            url: base_url.to_string(),
            message,
        };
        let url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        if url.cannot_be_a_base() {
            return Err(invalid("not a base URL".to_string()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(StoreError::Transport)?;

        Ok(Self {
            client,
            base_url: url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append path segments to the base URL. Ids are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| StoreError::InvalidUrl {
                url: self.base_url.to_string(),
                message: "not a base URL".to_string(),
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }
}

/// Turn any non-2xx response into `StoreError::Status`.
async fn check_status(resp: Response) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body: body.trim().to_string(),
    })
}

async fn read_task(resp: Response) -> Result<Task, StoreError> {
    let bytes = resp.bytes().await.map_err(StoreError::Transport)?;
    serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode(e.to_string()))
}

#[async_trait]
impl TaskStore for HttpTaskStore {
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let url = self.endpoint(&["tasks"])?;
        debug!(%url, "GET tasks");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(StoreError::Transport)?;
        let resp = check_status(resp).await.inspect_err(|e| {
            warn!(error = %e, "task list request rejected");
        })?;
        let bytes = resp.bytes().await.map_err(StoreError::Transport)?;
        // A `null` body means no tasks.
        let tasks: Option<Vec<Task>> =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(tasks.unwrap_or_default())
    }

    async fn create_task(&self, task: &Task) -> Result<Task, StoreError> {
        let url = self.endpoint(&["tasks"])?;
        debug!(%url, title = %task.title, "POST task");
        let resp = self
            .client
            .post(url)
            .json(task)
            .send()
            .await
            .map_err(StoreError::Transport)?;
        let resp = check_status(resp).await.inspect_err(|e| {
            warn!(error = %e, "create request rejected");
        })?;
        read_task(resp).await
    }

    async fn update_task(&self, id: &str, task: &Task) -> Result<Task, StoreError> {
        let url = self.endpoint(&["tasks", id])?;
        debug!(%url, status = %task.status, "PUT task");
        let resp = self
            .client
            .put(url)
            .json(task)
            .send()
            .await
            .map_err(StoreError::Transport)?;
        let resp = check_status(resp).await.inspect_err(|e| {
            warn!(id, error = %e, "update request rejected");
        })?;
        read_task(resp).await
    }

    async fn delete_task(&self, id: &str) -> Result<(), StoreError> {
        let url = self.endpoint(&["tasks", id])?;
        debug!(%url, "DELETE task");
        let resp = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(StoreError::Transport)?;
        check_status(resp).await.inspect_err(|e| {
            warn!(id, error = %e, "delete request rejected");
        })?;
        Ok(())
    }
}
