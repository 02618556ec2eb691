//! Sync Queue
//!
//! Failed requests awaiting replay. The in-memory list mirrors a snapshot
//! persisted in the data partition so it survives restarts.
//!
//! Every mutation is read-modify-persist without isolation: concurrent
//! enqueue, remove and drain calls can interleave and lose updates.

use std::collections::BTreeMap;

use axum::http::Method;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use url::Url;

use super::SnapshotLog;
use crate::cache::current_timestamp_ms;
use crate::error::FetchError;
use crate::net::{Fetcher, InterceptedRequest};

/// Reserved data-partition key holding the queue snapshot.
pub const SYNC_QUEUE_KEY: &str = "/sync-queue";

// == Sync Queue Item ==
/// A failed request recorded for replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncQueueItem {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Enqueue time (Unix milliseconds)
    pub timestamp: u64,
}

impl SyncQueueItem {
    pub fn from_request(request: &InterceptedRequest) -> Self {
        Self {
            url: request.url.to_string(),
            method: request.method.to_string(),
            headers: request.headers.clone(),
            timestamp: current_timestamp_ms(),
        }
    }

    /// Rebuilds the request to replay, with the recorded method and headers.
    pub fn to_request(&self) -> Result<InterceptedRequest, FetchError> {
        let url = Url::parse(&self.url).map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
        let method = Method::from_bytes(self.method.as_bytes())
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
        let mut request = InterceptedRequest::new(method, url);
        request.headers = self.headers.clone();
        Ok(request)
    }
}

// == Drain Report ==
/// Outcome of one drain pass. Every attempted item is dropped afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub attempted: usize,
    /// Items that got an HTTP response back (any status)
    pub replayed: usize,
    /// Items whose replay produced no response
    pub failed: usize,
}

// == Sync Queue ==
#[derive(Debug)]
pub struct SyncQueue {
    items: Mutex<Vec<SyncQueueItem>>,
    log: SnapshotLog<SyncQueueItem>,
}

impl SyncQueue {
    pub fn new(log: SnapshotLog<SyncQueueItem>) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            log,
        }
    }

    // == Enqueue ==
    /// Appends the request and persists the full snapshot.
    ///
    /// Duplicates are allowed; each item is replayed independently.
    pub async fn enqueue(&self, request: &InterceptedRequest) {
        let item = SyncQueueItem::from_request(request);
        debug!("Queueing {} {} for sync", item.method, item.url);

        let snapshot = {
            let mut items = self.items.lock().await;
            items.push(item);
            items.clone()
        };
        self.persist(&snapshot).await;
    }

    // == Remove ==
    /// Drops every item for `url` and persists. Returns how many were dropped.
    pub async fn remove(&self, url: &str) -> usize {
        let (removed, snapshot) = {
            let mut items = self.items.lock().await;
            let before = items.len();
            items.retain(|item| item.url != url);
            (before - items.len(), items.clone())
        };
        self.persist(&snapshot).await;
        removed
    }

    // == Restore ==
    /// Rebuilds the in-memory list from the persisted snapshot.
    pub async fn restore(&self) -> usize {
        match self.log.read_all().await {
            Ok(persisted) => {
                let count = persisted.len();
                *self.items.lock().await = persisted;
                if count > 0 {
                    info!("Restored {} pending sync items", count);
                }
                count
            }
            Err(err) => {
                error!("Failed to load sync queue snapshot: {}", err);
                self.len().await
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    pub async fn items(&self) -> Vec<SyncQueueItem> {
        self.items.lock().await.clone()
    }

    // == Drain ==
    /// Replays every persisted item once, then clears the queue.
    ///
    /// Per-item failures are logged and never abort the pass. Items that
    /// fail are dropped with the rest: one attempt per drain, no carry-over.
    pub async fn drain(&self, fetcher: &dyn Fetcher) -> DrainReport {
        self.restore().await;
        let pending = self.items().await;

        let mut report = DrainReport {
            attempted: pending.len(),
            ..DrainReport::default()
        };

        for item in &pending {
            let outcome = match item.to_request() {
                Ok(request) => fetcher.fetch(&request).await.map(|r| r.status),
                Err(err) => Err(err),
            };
            match outcome {
                Ok(status) => {
                    info!("Synced pending request {} ({})", item.url, status);
                    report.replayed += 1;
                }
                Err(err) => {
                    warn!("Failed to sync pending request {}: {}", item.url, err);
                    report.failed += 1;
                }
            }
        }

        self.items.lock().await.clear();
        self.persist(&[]).await;

        if report.attempted > 0 {
            info!(
                "Sync queue drained: {} replayed, {} dropped after failure",
                report.replayed, report.failed
            );
        }
        report
    }

    async fn persist(&self, snapshot: &[SyncQueueItem]) {
        if let Err(err) = self.log.write_all(snapshot).await {
            error!("Failed to persist sync queue: {}", err);
        }
    }
}
