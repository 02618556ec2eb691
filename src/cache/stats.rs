//! Strategy Statistics Module
//!
//! Tracks how intercepted requests were answered.

use serde::Serialize;

use crate::strategy::ResponseSource;

// == Strategy Stats ==
/// Counters over every response the strategy engine produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StrategyStats {
    /// Responses served from a partition
    pub cache_hits: u64,
    /// Responses served straight from the network
    pub network_responses: u64,
    /// Synthetic offline responses
    pub fallbacks: u64,
    /// Requests pushed onto the sync queue
    pub sync_enqueued: u64,
    /// Requests that bypassed the caching core
    pub pass_through: u64,
}

impl StrategyStats {
    // == Constructor ==
    /// Creates a new StrategyStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Share of answered requests served from cache.
    ///
    /// Returns 0.0 if nothing has been served yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.network_responses + self.fallbacks;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    // == Record Served ==
    /// Counts one served response by where it came from.
    pub fn record_served(&mut self, source: ResponseSource) {
        match source {
            ResponseSource::Cache => self.cache_hits += 1,
            ResponseSource::Network => self.network_responses += 1,
            ResponseSource::Fallback => self.fallbacks += 1,
        }
    }

    pub fn record_enqueue(&mut self) {
        self.sync_enqueued += 1;
    }

    pub fn record_pass_through(&mut self) {
        self.pass_through += 1;
    }
}
