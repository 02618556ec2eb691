//! Outbound consumer messages
//!
//! Broadcast to every live consumer over the event stream.

use serde::Serialize;
use serde_json::Value;

use super::push::LocalNotification;

/// Source tag on prayer-time updates produced by the scheduler.
pub const BACKGROUND_SYNC_SOURCE: &str = "background-sync";

/// A message pushed to all live consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsumerMessage {
    /// A full reconciliation pass settled
    BackgroundSyncComplete {
        /// Completion time (Unix milliseconds)
        timestamp: u64,
    },
    /// Fresh prayer times, carried inline so consumers need no re-fetch
    PrayerTimesUpdated { data: Value, source: String },
    /// A local notification to display
    Notification(LocalNotification),
}

impl ConsumerMessage {
    pub fn prayer_times(timings: Value) -> Self {
        ConsumerMessage::PrayerTimesUpdated {
            data: timings,
            source: BACKGROUND_SYNC_SOURCE.to_string(),
        }
    }

    /// Event name used on the server-sent event stream.
    pub fn kind(&self) -> &'static str {
        match self {
            ConsumerMessage::BackgroundSyncComplete { .. } => "BACKGROUND_SYNC_COMPLETE",
            ConsumerMessage::PrayerTimesUpdated { .. } => "PRAYER_TIMES_UPDATED",
            ConsumerMessage::Notification(_) => "NOTIFICATION",
        }
    }
}
