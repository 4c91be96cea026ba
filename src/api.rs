use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{ListFilter, NewTask, TaskRecord, TaskRef, TaskUpdate};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Operations offered by the remote todo collection. Every mutation is
/// acknowledged only after the store has applied it.
#[async_trait]
pub trait RemoteTasks: Send + Sync {
    async fn list(&self, filter: &ListFilter) -> Result<Vec<TaskRecord>>;

    async fn create(&self, task: &NewTask) -> Result<TaskRecord>;

    async fn update(&self, task: &TaskUpdate) -> Result<TaskRecord>;

    async fn delete(&self, id: u64) -> Result<()>;

    async fn finish(&self, id: u64) -> Result<()>;
}

/// Upload side channel. Independent of the task list: nothing is reloaded.
#[async_trait]
pub trait FileUploader: Send + Sync {
    async fn upload_file(&self, path: &Path) -> Result<UploadReceipt>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadReceipt {
    pub file_name: String,
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    instance_url: String,
    api_key: Option<String>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(ApiClient {
            client,
            instance_url: config.instance_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.instance_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }

    async fn post_target(&self, path: &str, id: u64) -> Result<()> {
        debug!(path, id, "POST");
        let res = self
            .authorize(self.client.post(self.url(path)))
            .json(&TaskRef { id })
            .send()
            .await?;
        check_status(res, Some(id)).await?;
        Ok(())
    }
}

async fn check_status(res: Response, target: Option<u64>) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    if let (StatusCode::NOT_FOUND, Some(id)) = (status, target) {
        warn!(id, "target no longer exists");
        return Err(AppError::StaleReference { id });
    }
    let body = res.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), body = %body, "remote call failed");
    Err(AppError::Remote {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl RemoteTasks for ApiClient {
    async fn list(&self, filter: &ListFilter) -> Result<Vec<TaskRecord>> {
        debug!(?filter, "GET list");
        let res = self
            .authorize(self.client.get(self.url("list")))
            .query(&filter.query())
            .send()
            .await?;
        let res = check_status(res, None).await?;
        Ok(res.json::<Vec<TaskRecord>>().await?)
    }

    async fn create(&self, task: &NewTask) -> Result<TaskRecord> {
        debug!(
            summary = task.summary(),
            has_details = task.details().is_some(),
            is_finished = task.is_finished(),
            is_deleted = task.is_deleted(),
            "POST create"
        );
        let res = self
            .authorize(self.client.post(self.url("create")))
            .json(task)
            .send()
            .await?;
        let res = check_status(res, None).await?;
        Ok(res.json::<TaskRecord>().await?)
    }

    async fn update(&self, task: &TaskUpdate) -> Result<TaskRecord> {
        debug!(id = task.id, "POST update");
        let res = self
            .authorize(self.client.post(self.url("update")))
            .json(task)
            .send()
            .await?;
        let res = check_status(res, Some(task.id)).await?;
        Ok(res.json::<TaskRecord>().await?)
    }

    async fn delete(&self, id: u64) -> Result<()> {
        self.post_target("delete", id).await
    }

    async fn finish(&self, id: u64) -> Result<()> {
        self.post_target("finish", id).await
    }
}

#[async_trait]
impl FileUploader for ApiClient {
    async fn upload_file(&self, path: &Path) -> Result<UploadReceipt> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AppError::Config(format!("not a file: {}", path.display())))?;
        let bytes = tokio::fs::read(path).await?;
        debug!(file = %file_name, size = bytes.len(), "POST upload");

        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name.clone()));
        let res = self
            .authorize(self.client.post(self.url("upload")))
            .multipart(form)
            .send()
            .await?;
        check_status(res, None).await?;

        Ok(UploadReceipt { file_name })
    }
}
