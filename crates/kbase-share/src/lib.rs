//! Client for the public share API backing document and layout pages.
//!
//! Every outbound call goes through a [`RequestTimer`] so slow or failing
//! endpoints show up in the timing statistics.

use std::{sync::Arc, time::Duration};

use kbase_ops::RequestTimer;
use kbase_types::{
    config::ShareConfig,
    share::{ApiEnvelope, AuthInfo, DocumentPage, LayoutData, NodeDetail, PageError, WebInfo},
    KbaseError, Result,
};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client,
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

pub const NODE_DETAIL_PATH: &str = "/share/v1/node/detail";
pub const WEB_INFO_PATH: &str = "/share/v1/app/web/info";
pub const AUTH_INFO_PATH: &str = "/share/pro/v1/auth/info";

const FORBIDDEN: u16 = 403;

pub struct ShareClient {
    http: Client,
    base_url: String,
    timer: Arc<RequestTimer>,
}

impl ShareClient {
    pub fn new(config: &ShareConfig, timer: Arc<RequestTimer>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.forwarded_headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                KbaseError::Configuration(format!("invalid forwarded header '{name}': {err}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|err| {
                KbaseError::Configuration(format!("invalid value for header '{name}': {err}"))
            })?;
            headers.insert(name, value);
        }

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .default_headers(headers)
            .build()
            .map_err(|err| share_error(None, format!("failed to build http client: {err}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timer,
        })
    }

    pub fn timer(&self) -> &RequestTimer {
        &self.timer
    }

    pub async fn node_detail(&self, id: &str) -> Result<NodeDetail> {
        self.timer
            .time(format!("node_detail:{id}"), || async move {
                self.get_json(NODE_DETAIL_PATH, &[("id", id)]).await
            })
            .await
    }

    pub async fn app_web_info(&self) -> Result<WebInfo> {
        self.timer
            .time("app_web_info", || self.get_json(WEB_INFO_PATH, &[]))
            .await
    }

    pub async fn auth_info(&self) -> Result<AuthInfo> {
        self.timer
            .time("auth_info", || self.get_json(AUTH_INFO_PATH, &[]))
            .await
    }

    /// Loads a document page; a failed fetch is kept on the page, not returned.
    pub async fn load_document(&self, id: &str) -> DocumentPage {
        match self.node_detail(id).await {
            Ok(node) => DocumentPage {
                node: Some(node),
                error: None,
            },
            Err(err) => {
                warn!("Failed to load node {id}: {err}");
                DocumentPage {
                    node: None,
                    error: Some(PageError::from(&err)),
                }
            }
        }
    }

    /// Loads site chrome data; both calls settle independently.
    ///
    /// Only a forbidden auth response turns into a layout error, every other
    /// failure just leaves the corresponding part empty.
    pub async fn load_layout(&self) -> LayoutData {
        let (web_info, auth_info) = tokio::join!(self.app_web_info(), self.auth_info());

        let error = match &auth_info {
            Err(err) if err.status() == Some(FORBIDDEN) => Some(PageError::from(err)),
            _ => None,
        };
        if let Err(err) = &web_info {
            warn!("Failed to load web info: {err}");
        }

        LayoutData {
            web_info: web_info.ok(),
            auth_info: auth_info.ok(),
            error,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {url}");
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|err| share_error(err.status().map(|s| s.as_u16()), err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.is_empty() {
                format!("{path} returned {status}")
            } else {
                body
            };
            return Err(share_error(Some(status.as_u16()), message));
        }

        let envelope: ApiEnvelope<T> = response.json().await.map_err(|err| {
            share_error(Some(status.as_u16()), format!("invalid response from {path}: {err}"))
        })?;
        if !envelope.success {
            let code = u16::try_from(envelope.code).ok().filter(|c| (100..600).contains(c));
            return Err(share_error(code, envelope.message));
        }
        envelope
            .data
            .ok_or_else(|| share_error(Some(status.as_u16()), format!("{path} returned no data")))
    }
}

pub fn share_error(status: Option<u16>, message: impl Into<String>) -> KbaseError {
    KbaseError::Share {
        status,
        message: message.into(),
    }
}
