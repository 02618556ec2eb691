//! Response DTOs for the control surface
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::StrategyStats;

/// Snapshot of caches and sync state, as returned by GET_CACHE_STATUS.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    /// Names of all live partitions
    pub caches: Vec<String>,
    pub is_online: bool,
    pub sync_queue_length: usize,
    /// Time the snapshot was taken (ISO 8601)
    pub last_update: String,
}

/// Reply envelope for GET_CACHE_STATUS: `{type: "CACHE_STATUS", data | error}`.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatusReply {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<CacheStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CacheStatusReply {
    pub fn data(status: CacheStatus) -> Self {
        Self {
            kind: "CACHE_STATUS",
            data: Some(status),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "CACHE_STATUS",
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Acknowledgement for fire-and-forget control commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Accepted {
    pub accepted: bool,
}

/// Where a notification click should navigate, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClickResponse {
    pub open: Option<String>,
}

/// Per-partition entry count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionSummary {
    pub name: String,
    pub entries: usize,
}

/// Response body for GET /_sw/stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub strategies: StrategyStats,
    /// Share of answered requests served from cache
    pub hit_rate: f64,
    pub partitions: Vec<PartitionSummary>,
    pub sync_queue_length: usize,
    pub is_online: bool,
}

impl StatsResponse {
    pub fn new(
        strategies: StrategyStats,
        partitions: Vec<PartitionSummary>,
        sync_queue_length: usize,
        is_online: bool,
    ) -> Self {
        Self {
            hit_rate: strategies.hit_rate(),
            strategies,
            partitions,
            sync_queue_length,
            is_online,
        }
    }
}

/// Response body for the health endpoint (GET /_sw/health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
