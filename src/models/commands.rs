//! Inbound control commands
//!
//! Commands arrive as `{type, data}` envelopes from the hosting application.

use serde::de::Error as _;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Platform online/offline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ConnectivityEvent {
    pub online: bool,
}

/// Request to fire a local notification at a given time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScheduleNotification {
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Fire time (Unix milliseconds)
    pub timestamp: u64,
    #[serde(default)]
    pub options: Map<String, Value>,
}

/// A control command from a consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    ScheduleNotification(ScheduleNotification),
    RegisterSync {
        tag: String,
    },
    ManualSync,
    CacheContent {
        urls: Vec<String>,
        /// Target partition; the dynamic partition when absent
        cache_name: Option<String>,
    },
    GetCacheStatus,
}

/// Wire shape shared by every command; `data` is decoded per type.
#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct RegisterSyncData {
    tag: String,
}

#[derive(Deserialize)]
struct CacheContentData {
    urls: Vec<String>,
    #[serde(default, rename = "cacheName")]
    cache_name: Option<String>,
}

impl ControlCommand {
    /// Decodes a `{type, data}` envelope.
    ///
    /// Commands without a payload ignore whatever `data` carries.
    pub fn parse(payload: &[u8]) -> serde_json::Result<Self> {
        let Envelope { kind, data } = serde_json::from_slice(payload)?;
        match kind.as_str() {
            "SCHEDULE_NOTIFICATION" => Ok(Self::ScheduleNotification(serde_json::from_value(data)?)),
            "REGISTER_SYNC" => {
                let RegisterSyncData { tag } = serde_json::from_value(data)?;
                Ok(Self::RegisterSync { tag })
            }
            "MANUAL_SYNC" => Ok(Self::ManualSync),
            "CACHE_CONTENT" => {
                let CacheContentData { urls, cache_name } = serde_json::from_value(data)?;
                Ok(Self::CacheContent { urls, cache_name })
            }
            "GET_CACHE_STATUS" => Ok(Self::GetCacheStatus),
            other => Err(serde_json::Error::custom(format!(
                "unknown command type {}",
                other
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ControlCommand::ScheduleNotification(_) => "SCHEDULE_NOTIFICATION",
            ControlCommand::RegisterSync { .. } => "REGISTER_SYNC",
            ControlCommand::ManualSync => "MANUAL_SYNC",
            ControlCommand::CacheContent { .. } => "CACHE_CONTENT",
            ControlCommand::GetCacheStatus => "GET_CACHE_STATUS",
        }
    }
}
