//! HttpExtractor - generic page fetcher
//!
//! Fetches the task URL with the task's headers and reports what came back.
//! Site-specific parsing is not done here; callers that need structured
//! fields plug in their own `Extractor`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use tokio_util::sync::CancellationToken;

use crate::domain::{Record, Task};
use crate::ports::{ExtractError, Extractor};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpExtractor {
    client: Client,
}

impl HttpExtractor {
    pub fn new(timeout: Duration) -> Result<Self, ExtractError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("trawl/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Extractor for HttpExtractor {
    async fn extract(
        &self,
        cancel: &CancellationToken,
        task: &Task,
    ) -> Result<Vec<Record>, ExtractError> {
        let url = Url::parse(task.url()).map_err(|e| ExtractError::InvalidUrl {
            url: task.url().to_string(),
            reason: e.to_string(),
        })?;

        let mut request = self.client.get(url);
        for (key, value) in task.headers() {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(ExtractError::Cancelled),
            response = request.send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::Status(status.as_u16()));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(ExtractError::Cancelled),
            body = response.bytes() => body?,
        };

        tracing::debug!(task = task.name(), url = %final_url, bytes = body.len(), "fetched page");

        let record = Record::new(Utc::now())
            .with_field("name", task.name())
            .with_field("url", final_url)
            .with_field("status", status.as_u16())
            .with_field("content_type", content_type)
            .with_field("content_length", body.len());
        Ok(vec![record])
    }
}
