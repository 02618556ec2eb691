//! Intercepted Request Module
//!
//! Defines the request snapshot flowing through classification and strategies.

use std::collections::BTreeMap;
use std::fmt;

use axum::http::Method;
use url::Url;

use crate::error::FetchError;

/// What the requester intends to do with the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destination {
    /// Top-level page navigation
    Document,
    /// Subresource, XHR, or anything else
    #[default]
    Other,
}

// == Intercepted Request ==
/// An outgoing request observed at the interception boundary.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    pub method: Method,
    pub url: Url,
    /// Header names are stored lowercase
    pub headers: BTreeMap<String, String>,
    pub body: Option<Vec<u8>>,
    pub destination: Destination,
}

impl InterceptedRequest {
    /// Creates a bodyless request.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: BTreeMap::new(),
            body: None,
            destination: Destination::Other,
        }
    }

    /// Parses `url` and creates a GET request for it.
    pub fn get(url: &str) -> Result<Self, FetchError> {
        let url = Url::parse(url).map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
        Ok(Self::new(Method::GET, url))
    }

    /// Marks the request as a page navigation.
    pub fn navigation(mut self) -> Self {
        self.destination = Destination::Document;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// True for http and https URLs; everything else bypasses the caching core.
    pub fn is_http(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    pub fn is_navigation(&self) -> bool {
        self.destination == Destination::Document
    }

    /// URL to put on the wire. `ws`/`wss` map back to `http`/`https`, since a
    /// WebSocket handshake starts as a plain HTTP request.
    pub fn wire_url(&self) -> Url {
        let scheme = match self.url.scheme() {
            "ws" => "http",
            "wss" => "https",
            _ => return self.url.clone(),
        };
        let mut url = self.url.clone();
        // ws, wss, http and https are all special schemes, so this cannot fail
        let _ = url.set_scheme(scheme);
        url
    }

    /// Cache identity of this request.
    pub fn key(&self) -> RequestKey {
        RequestKey::new(self.method.as_str(), self.url.as_str())
    }
}

// == Request Key ==
/// Canonical request identity (method + URL) used to key cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey {
    method: String,
    url: String,
}

impl RequestKey {
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
        }
    }

    /// Key for a reserved state slot such as `/sync-queue`.
    ///
    /// Reserved keys are origin-relative paths, so they never collide with
    /// intercepted requests, whose URLs are always absolute.
    pub fn reserved(path: &str) -> Self {
        Self::new("GET", path)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}
