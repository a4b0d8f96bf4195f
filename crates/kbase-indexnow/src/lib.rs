//! IndexNow notification client for freshly published documents.

use std::time::Duration;

use async_trait::async_trait;
use kbase_types::{
    config::IndexNowConfig,
    indexnow::{IndexNowRequest, SubmissionOutcome},
    KbaseError, Result,
};
use reqwest::Client;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Anything able to push one batch of urls to a search engine.
#[async_trait]
pub trait UrlSubmitter: Send + Sync {
    /// Never fails: transport and status errors are reported in the outcome.
    async fn submit_batch(&self, urls: Vec<String>) -> SubmissionOutcome;
}

pub struct IndexNowClient {
    http: Client,
    config: IndexNowConfig,
}

impl IndexNowClient {
    pub fn new(config: IndexNowConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| indexnow_error(format!("failed to build http client: {err}")))?;
        Ok(Self { http, config })
    }

    pub async fn submit_url(&self, url: impl Into<String>) -> SubmissionOutcome {
        self.submit_batch(vec![url.into()]).await
    }

    pub async fn submit_urls(&self, urls: &[String]) -> Vec<SubmissionOutcome> {
        submit_in_batches(
            self,
            urls,
            self.config.batch_size,
            Duration::from_millis(self.config.batch_delay_ms),
        )
        .await
    }

    pub fn build_document_url(&self, node_id: &str) -> String {
        format!(
            "{}/node/{}",
            self.config.document_base_url.trim_end_matches('/'),
            node_id
        )
    }

    pub fn build_document_urls<S: AsRef<str>>(&self, node_ids: &[S]) -> Vec<String> {
        node_ids
            .iter()
            .map(|id| self.build_document_url(id.as_ref()))
            .collect()
    }

    fn request_body(&self, urls: Vec<String>) -> IndexNowRequest {
        IndexNowRequest {
            host: self.config.host.clone(),
            key: self.config.key.clone(),
            key_location: self.config.key_location.clone(),
            url_list: urls,
        }
    }
}

#[async_trait]
impl UrlSubmitter for IndexNowClient {
    async fn submit_batch(&self, urls: Vec<String>) -> SubmissionOutcome {
        let body = self.request_body(urls.clone());
        let response = match self.http.post(&self.config.api_url).json(&body).send().await {
            Ok(response) => response,
            Err(err) => {
                error!("IndexNow submission failed: {err}");
                return SubmissionOutcome {
                    success: false,
                    status: err.status().map(|s| s.as_u16()),
                    data: None,
                    error: Some(err.to_string()),
                    urls,
                };
            }
        };

        let status = response.status();
        if status.is_success() {
            info!("IndexNow accepted {} url(s) with status {}", urls.len(), status);
            let data = match response.text().await {
                Ok(text) => Some(text),
                Err(err) => {
                    warn!("IndexNow response body unreadable: {err}");
                    None
                }
            };
            SubmissionOutcome {
                success: true,
                status: Some(status.as_u16()),
                data,
                error: None,
                urls,
            }
        } else {
            let message = format!("request failed with status code {}", status.as_u16());
            error!("IndexNow submission failed: {message}");
            SubmissionOutcome {
                success: false,
                status: Some(status.as_u16()),
                data: None,
                error: Some(message),
                urls,
            }
        }
    }
}

/// Submits `urls` in order, `batch_size` at a time, pausing between batches.
pub async fn submit_in_batches<S>(
    submitter: &S,
    urls: &[String],
    batch_size: usize,
    delay: Duration,
) -> Vec<SubmissionOutcome>
where
    S: UrlSubmitter + ?Sized,
{
    let mut results = Vec::new();
    for (index, batch) in urls.chunks(batch_size.max(1)).enumerate() {
        if index > 0 && !delay.is_zero() {
            sleep(delay).await;
        }
        results.push(submitter.submit_batch(batch.to_vec()).await);
    }
    results
}

pub fn indexnow_error(message: impl Into<String>) -> KbaseError {
    KbaseError::IndexNow(message.into())
}
