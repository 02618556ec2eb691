//! API Handlers
//!
//! HTTP handlers for the `/_sw` control surface.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use url::Url;

use crate::broadcast::Broadcaster;
use crate::cache::PartitionManager;
use crate::control::{ControlReply, Controller};
use crate::models::{
    Accepted, CacheStatusReply, ClickResponse, ConnectivityEvent, HealthResponse,
    LocalNotification, NotificationClick, PartitionSummary, StatsResponse,
};
use crate::net::Fetcher;
use crate::strategy::StrategyEngine;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<StrategyEngine>,
    pub controller: Arc<Controller>,
    pub manager: Arc<PartitionManager>,
    pub broadcaster: Broadcaster,
    /// Network client used for pass-through requests
    pub fetcher: Arc<dyn Fetcher>,
    /// Origin that origin-form targets resolve against
    pub origin: Url,
}

/// Handler for GET /_sw/health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /_sw/stats
///
/// Strategy counters plus per-partition entry counts and sync state.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let strategies = state.engine.stats().await;
    let partitions = state
        .manager
        .entry_counts()
        .await
        .into_iter()
        .map(|(name, entries)| PartitionSummary { name, entries })
        .collect();
    let context = state.engine.context();

    Json(StatsResponse::new(
        strategies,
        partitions,
        context.queue().len().await,
        context.is_online(),
    ))
}

/// Handler for GET /_sw/status
pub async fn status_handler(State(state): State<AppState>) -> Json<CacheStatusReply> {
    Json(state.controller.status_reply().await)
}

/// Handler for POST /_sw/messages
///
/// Always answers 200; rejected commands carry `{accepted: false}`.
pub async fn messages_handler(State(state): State<AppState>, body: Bytes) -> Json<ControlReply> {
    Json(state.controller.dispatch(&body).await)
}

/// Handler for POST /_sw/connectivity
pub async fn connectivity_handler(
    State(state): State<AppState>,
    Json(event): Json<ConnectivityEvent>,
) -> Json<Accepted> {
    if state.controller.set_online(event.online) {
        debug!("Platform event restored connectivity");
    }
    Json(Accepted { accepted: true })
}

/// Handler for POST /_sw/push
///
/// Unparsable payloads still produce the default notification.
pub async fn push_handler(State(state): State<AppState>, body: Bytes) -> Json<LocalNotification> {
    Json(state.controller.deliver_push(&body))
}

/// Handler for POST /_sw/notification-click
pub async fn notification_click_handler(Json(click): Json<NotificationClick>) -> Json<ClickResponse> {
    Json(ClickResponse {
        open: click.target(),
    })
}

/// Handler for GET /_sw/events
///
/// Streams every consumer message as an SSE event named after its type.
/// A lagging subscriber skips what it missed and keeps streaming.
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let receiver = state.broadcaster.subscribe();

    let events = stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(message) => match Event::default().event(message.kind()).json_data(&message) {
                    Ok(event) => return Some((Ok(event), receiver)),
                    Err(err) => warn!("Dropping unencodable {} message: {}", message.kind(), err),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, skipped {} message(s)", skipped)
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
