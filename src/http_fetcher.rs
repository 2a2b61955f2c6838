//! Conditional HTTP GET with ETag revalidation.
//!
//! A `304 Not Modified` is not an error: it comes back as a response without a
//! body carrying the etag the caller already had. Gzip bodies are decoded by the
//! client before they reach the caller.

use async_trait::async_trait;
use log::debug;
use reqwest::header::{ETAG, IF_NONE_MATCH};
use reqwest::StatusCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::errors::FetchError;

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// `None` when the server answered 304.
    pub body: Option<Vec<u8>>,
    pub etag: String,
}

impl FetchResponse {
    pub fn is_not_modified(&self) -> bool {
        self.body.is_none()
    }
}

/// Seam between the engine and the network.
#[async_trait]
pub trait ConditionalFetcher: Send + Sync {
    /// GET `url`, sending `If-None-Match: etag` when `etag` is non-empty.
    async fn fetch(
        &self,
        url: &str,
        etag: &str,
        cancel: &CancellationToken,
    ) -> Result<FetchResponse, FetchError>;
}

/// reqwest-backed fetcher with pooled connections and a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .gzip(true)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn do_fetch(&self, url: &str, etag: &str) -> Result<FetchResponse, FetchError> {
        let mut request = self.client.get(url);
        if !etag.is_empty() {
            request = request.header(IF_NONE_MATCH, etag);
        }

        let response = request.send().await.map_err(|e| request_error(url, e))?;

        match response.status() {
            StatusCode::NOT_MODIFIED => {
                debug!("HttpFetcher: {} not modified (etag {})", url, etag);
                Ok(FetchResponse {
                    body: None,
                    etag: etag.to_string(),
                })
            }
            StatusCode::OK => {
                let new_etag = response
                    .headers()
                    .get(ETAG)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let body = response.bytes().await.map_err(|e| request_error(url, e))?;
                debug!(
                    "HttpFetcher: fetched {} ({} bytes, etag {:?})",
                    url,
                    body.len(),
                    new_etag
                );
                Ok(FetchResponse {
                    body: Some(body.to_vec()),
                    etag: new_etag,
                })
            }
            status => Err(FetchError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}

fn request_error(url: &str, source: reqwest::Error) -> FetchError {
    if source.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else {
        FetchError::Request {
            url: url.to_string(),
            source,
        }
    }
}

#[async_trait]
impl ConditionalFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        etag: &str,
        cancel: &CancellationToken,
    ) -> Result<FetchResponse, FetchError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled(url.to_string())),
            result = self.do_fetch(url, etag) => result,
        }
    }
}
