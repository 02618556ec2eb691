//! Offline Fallback Module
//!
//! Synthetic responses for when neither cache nor network can answer.

use serde_json::json;

use crate::net::StoredResponse;

/// Self-contained offline document; renders without any network access.
const OFFLINE_PAGE: &str = include_str!("offline.html");

/// Status used for the JSON fallback.
pub const FALLBACK_STATUS: u16 = 503;

/// HTTP 503 with `{error, message, cached: true}`.
pub fn json_fallback() -> StoredResponse {
    StoredResponse::json(
        FALLBACK_STATUS,
        &json!({
            "error": "Offline",
            "message": "المحتوى غير متوفر حالياً",
            "cached": true
        }),
    )
}

/// The localized offline page with a connectivity indicator and retry controls.
pub fn html_fallback() -> StoredResponse {
    StoredResponse::html(200, OFFLINE_PAGE)
}
