//! API Routes
//!
//! Configures the Axum router: the `/_sw` control surface plus the
//! interception proxy for everything else.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    connectivity_handler, events_handler, health_handler, messages_handler,
    notification_click_handler, push_handler, stats_handler, status_handler, AppState,
};
use super::proxy::proxy_handler;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /_sw/health` - Liveness
/// - `GET /_sw/stats` - Strategy and partition statistics
/// - `GET /_sw/status` - Cache status snapshot
/// - `GET /_sw/events` - Consumer message stream (SSE)
/// - `POST /_sw/messages` - Control commands
/// - `POST /_sw/connectivity` - Platform online/offline events
/// - `POST /_sw/push` - Push delivery
/// - `POST /_sw/notification-click` - Notification click routing
/// - anything else - intercepted and served by the strategy engine
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/_sw/health", get(health_handler))
        .route("/_sw/stats", get(stats_handler))
        .route("/_sw/status", get(status_handler))
        .route("/_sw/events", get(events_handler))
        .route("/_sw/messages", post(messages_handler))
        .route("/_sw/connectivity", post(connectivity_handler))
        .route("/_sw/push", post(push_handler))
        .route("/_sw/notification-click", post(notification_click_handler))
        .fallback(proxy_handler)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
