//! Cache Entry Module
//!
//! Defines the structure for individual partition entries.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::net::StoredResponse;

// == Cache Entry ==
/// A stored response snapshot plus its insertion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The stored response
    pub response: StoredResponse,
    /// Insertion timestamp (Unix milliseconds)
    pub inserted_at: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Wraps a response, stamping it with the current time.
    pub fn new(response: StoredResponse) -> Self {
        Self {
            response,
            inserted_at: current_timestamp_ms(),
        }
    }

    // == Age ==
    /// Milliseconds since the entry was stored.
    pub fn age_ms(&self) -> u64 {
        current_timestamp_ms().saturating_sub(self.inserted_at)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}
