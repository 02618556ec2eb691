//! Message and DTO models
//!
//! Outbound consumer messages, inbound control commands, notification
//! payloads and the JSON bodies of the control surface.

pub mod commands;
pub mod messages;
pub mod push;
pub mod responses;

// Re-export commonly used types
pub use commands::{ConnectivityEvent, ControlCommand, ScheduleNotification};
pub use messages::ConsumerMessage;
pub use push::{LocalNotification, NotificationAction, NotificationClick};
pub use responses::{
    Accepted, CacheStatus, CacheStatusReply, ClickResponse, HealthResponse, PartitionSummary,
    StatsResponse,
};
