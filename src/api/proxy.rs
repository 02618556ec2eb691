//! Interception Proxy
//!
//! Turns every non-control HTTP request into an intercepted request, runs it
//! through the strategy engine and relays the answer.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::debug;
use url::Url;

use super::handlers::AppState;
use crate::error::{CacheError, Result};
use crate::net::{InterceptedRequest, StoredResponse};
use crate::strategy::{Interception, ResponseSource};

/// Response header naming where the body came from.
pub const SOURCE_HEADER: &str = "x-offline-sync-source";

/// Largest request body buffered for forwarding or replay.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Fallback handler for everything outside `/_sw`.
pub async fn proxy_handler(State(state): State<AppState>, request: Request) -> Response {
    let intercepted = match intercepted_request(&state.origin, request).await {
        Ok(intercepted) => intercepted,
        Err(err) => return err.into_response(),
    };

    match state.engine.intercept(intercepted).await {
        Interception::Respond(served) => into_http_response(served.response, Some(served.source)),
        Interception::PassThrough(request) => {
            debug!("Passing {} {} through", request.method, request.url);
            match state.fetcher.forward(&request).await {
                Ok(response) => into_http_response(response, None),
                Err(err) => CacheError::Upstream(err).into_response(),
            }
        }
    }
}

// == Request Conversion ==
/// Builds the intercepted request for an inbound proxy request.
///
/// Absolute-form targets are taken as-is; origin-form targets resolve against
/// `origin`. WebSocket upgrades are re-schemed to `ws`/`wss`.
pub async fn intercepted_request(origin: &Url, request: Request) -> Result<InterceptedRequest> {
    let (parts, body) = request.into_parts();

    let mut url = if parts.uri.scheme().is_some() {
        Url::parse(&parts.uri.to_string())
    } else {
        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        origin.join(target)
    }
    .map_err(|e| CacheError::InvalidRequest(format!("Invalid request target: {}", e)))?;

    if is_websocket_upgrade(&parts.headers) {
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| CacheError::InvalidRequest(format!("Cannot upgrade {}", url)))?;
    }

    let mut intercepted = InterceptedRequest::new(parts.method, url);
    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            intercepted = intercepted.with_header(name.as_str(), value);
        }
    }
    if is_navigation(&parts.headers) {
        intercepted = intercepted.navigation();
    }

    let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| CacheError::InvalidRequest(format!("Unreadable request body: {}", e)))?;
    if !body.is_empty() {
        intercepted = intercepted.with_body(body.to_vec());
    }
    Ok(intercepted)
}

fn header_eq(headers: &HeaderMap, name: &str, expected: &str) -> bool {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}

fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    header_eq(headers, header::UPGRADE.as_str(), "websocket")
}

fn is_navigation(headers: &HeaderMap) -> bool {
    header_eq(headers, "sec-fetch-dest", "document") || header_eq(headers, "sec-fetch-mode", "navigate")
}

// == Response Conversion ==
/// Relays a stored response. Headers that are not valid HTTP are dropped.
pub fn into_http_response(response: StoredResponse, source: Option<ResponseSource>) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);

    let mut headers = HeaderMap::new();
    for (name, value) in &response.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.insert(name, value);
        }
    }
    if let Some(source) = source {
        headers.insert(SOURCE_HEADER, HeaderValue::from_static(source.as_str()));
    }

    (status, headers, Body::from(response.body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::Destination;

    fn origin() -> Url {
        Url::parse("http://app.test").unwrap()
    }

    fn request(uri: &str) -> axum::http::request::Builder {
        axum::http::Request::builder().uri(uri)
    }

    #[tokio::test]
    async fn test_origin_form_resolves_against_origin() {
        let req = request("/adhkar?x=1").body(Body::empty()).unwrap();
        let intercepted = intercepted_request(&origin(), req).await.unwrap();

        assert_eq!(intercepted.url.as_str(), "http://app.test/adhkar?x=1");
        assert_eq!(intercepted.destination, Destination::Other);
        assert!(intercepted.body.is_none());
    }

    #[tokio::test]
    async fn test_absolute_form_kept() {
        let req = request("https://api.aladhan.com/v1/timings")
            .body(Body::empty())
            .unwrap();
        let intercepted = intercepted_request(&origin(), req).await.unwrap();
        assert_eq!(intercepted.url.as_str(), "https://api.aladhan.com/v1/timings");
    }

    #[tokio::test]
    async fn test_navigation_headers() {
        let req = request("/quran")
            .header("Sec-Fetch-Mode", "navigate")
            .body(Body::empty())
            .unwrap();
        assert!(intercepted_request(&origin(), req).await.unwrap().is_navigation());

        let req = request("/quran")
            .header("sec-fetch-dest", "document")
            .body(Body::empty())
            .unwrap();
        assert!(intercepted_request(&origin(), req).await.unwrap().is_navigation());
    }

    #[tokio::test]
    async fn test_websocket_upgrade_is_not_http() {
        let req = request("/live")
            .header("Upgrade", "websocket")
            .body(Body::empty())
            .unwrap();
        let intercepted = intercepted_request(&origin(), req).await.unwrap();

        assert_eq!(intercepted.url.scheme(), "ws");
        assert!(!intercepted.is_http());
    }

    #[tokio::test]
    async fn test_body_and_headers_captured() {
        let req = request("/api/tasbih")
            .method("POST")
            .header("Content-Type", "application/json")
            .body(Body::from(r#"{"count":33}"#))
            .unwrap();
        let intercepted = intercepted_request(&origin(), req).await.unwrap();

        assert_eq!(intercepted.method, axum::http::Method::POST);
        assert_eq!(
            intercepted.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(intercepted.body.as_deref(), Some(&br#"{"count":33}"#[..]));
    }

    #[test]
    fn test_response_carries_source_header() {
        let stored = StoredResponse::new(203, "cached").with_header("x-custom", "1");
        let response = into_http_response(stored, Some(ResponseSource::Cache));

        assert_eq!(response.status(), StatusCode::NON_AUTHORITATIVE_INFORMATION);
        assert_eq!(response.headers()[SOURCE_HEADER], "cache");
        assert_eq!(response.headers()["x-custom"], "1");
    }
}
