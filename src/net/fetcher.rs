//! Network Fetcher
//!
//! The single seam between the caching core and the network.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::{InterceptedRequest, StoredResponse};
use crate::error::FetchError;

/// Headers that describe the hop to this proxy rather than the request itself.
const HOP_HEADERS: &[&str] = &[
    "host",
    "connection",
    "content-length",
    "transfer-encoding",
    "upgrade",
    "keep-alive",
];

/// Hop headers a pass-through keeps so the origin can answer a protocol upgrade.
const UPGRADE_HEADERS: &[&str] = &["connection", "upgrade"];

/// Performs network calls on behalf of strategies, install seeding and replay.
///
/// A fetch resolves with any HTTP response (including 4xx/5xx); it only fails
/// when no response was obtained at all.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<StoredResponse, FetchError>;

    /// Relays a request the caching core declined to handle.
    async fn forward(&self, request: &InterceptedRequest) -> Result<StoredResponse, FetchError> {
        self.fetch(request).await
    }
}

// == HTTP Fetcher ==
/// `Fetcher` backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Client with a connect timeout; per-request deadlines are the strategies' concern.
    pub fn with_connect_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()?;
        Ok(Self::new(client))
    }

    async fn send(
        &self,
        request: &InterceptedRequest,
        url: Url,
        keep: &[&str],
    ) -> Result<StoredResponse, FetchError> {
        let dropped = |name: &str| HOP_HEADERS.contains(&name) && !keep.contains(&name);

        let mut builder = self.client.request(request.method.clone(), url.clone());
        for (name, value) in &request.headers {
            if !dropped(name.as_str()) {
                builder = builder.header(name, value);
            }
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| !dropped(name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        debug!("Fetched {} {} -> {}", request.method, url, status);

        Ok(StoredResponse {
            status,
            headers,
            body,
        })
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<StoredResponse, FetchError> {
        self.send(request, request.url.clone(), &[]).await
    }

    /// Sends WebSocket handshakes to their HTTP URL with `Upgrade` intact.
    async fn forward(&self, request: &InterceptedRequest) -> Result<StoredResponse, FetchError> {
        self.send(request, request.wire_url(), UPGRADE_HEADERS).await
    }
}
