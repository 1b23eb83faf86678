//! Upstream forwarding.
//!
//! Admitted requests are replayed against the upstream API with the tenant's
//! bearer swapped for a pool key.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use mockall::automock;
use reqwest::{Client, Method, header};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::pool_keys::{PoolKeysService, PoolKeysServiceError};

/// Timeout used when none is configured.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(150);

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("no active pool key is available")]
    NoPoolKey,

    #[error("unsupported method {0:?}")]
    Method(String),

    #[error("failed to build upstream client")]
    Client(#[source] reqwest::Error),

    #[error("upstream request failed")]
    Transport(#[source] reqwest::Error),

    #[error(transparent)]
    PoolKeys(#[from] PoolKeysServiceError),
}

/// The parts of an inbound request that are replayed upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub method: String,

    /// Path plus query string, always starting with `/`.
    pub path_and_query: String,

    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[automock]
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Send `request` upstream authenticated as `api_key`.
    async fn send(
        &self,
        request: UpstreamRequest,
        api_key: &str,
    ) -> Result<UpstreamResponse, UpstreamError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestUpstream {
    client: Client,
    base_url: String,
}

impl ReqwestUpstream {
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let timeout = if timeout.is_zero() {
            DEFAULT_UPSTREAM_TIMEOUT
        } else {
            timeout
        };

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(UpstreamError::Client)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path_and_query: &str) -> String {
        if path_and_query.starts_with('/') {
            format!("{}{path_and_query}", self.base_url)
        } else {
            format!("{}/{path_and_query}", self.base_url)
        }
    }
}

#[async_trait]
impl Upstream for ReqwestUpstream {
    async fn send(
        &self,
        request: UpstreamRequest,
        api_key: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let Ok(method) = Method::from_bytes(request.method.as_bytes()) else {
            return Err(UpstreamError::Method(request.method));
        };

        let url = self.url(&request.path_and_query);

        debug!(%method, %url, "forwarding upstream");

        let mut builder = self.client.request(method, &url).bearer_auth(api_key);

        if let Some(content_type) = &request.content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }

        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let response = builder.send().await.map_err(UpstreamError::Transport)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let body = response
            .bytes()
            .await
            .map_err(UpstreamError::Transport)?
            .to_vec();

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Picks a pool key and hands the request to an [`Upstream`].
#[derive(Clone)]
pub struct Forwarder {
    pool_keys: Arc<dyn PoolKeysService>,
    upstream: Arc<dyn Upstream>,
}

impl fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Forwarder").finish_non_exhaustive()
    }
}

impl Forwarder {
    #[must_use]
    pub fn new(pool_keys: Arc<dyn PoolKeysService>, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            pool_keys,
            upstream,
        }
    }

    /// # Errors
    ///
    /// Returns [`UpstreamError::NoPoolKey`] when the pool is empty, or the
    /// transport failure.
    pub async fn forward(
        &self,
        request: UpstreamRequest,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let Some(key) = self.pool_keys.select_key().await? else {
            warn!("no active pool key to forward with");
            return Err(UpstreamError::NoPoolKey);
        };

        self.upstream.send(request, &key.key).await
    }
}
