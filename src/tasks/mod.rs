//! Background Tasks Module
//!
//! Contains the work that runs independently of any in-flight request.
//!
//! # Tasks
//! - Reconciliation: prayer times, preferences, offline content, cache
//!   cleanup and sync-queue replay, on manual, tagged, periodic and
//!   connectivity triggers
//! - Scheduled notifications: one-shot timers broadcasting a local alert

mod jobs;
mod notifications;
mod scheduler;

pub use jobs::{
    Job, JobRunner, UserLocation, OFFLINE_CONTENT_STATUS_KEY, PRAYER_TIMES_KEY,
    PRAYER_TIMES_LAST_UPDATE_KEY, USER_LOCATION_KEY, USER_PREFERENCES_KEY,
};
pub use notifications::schedule_notification;
pub use scheduler::{
    trigger_channel, JobOutcome, JobState, PassReport, Scheduler, Trigger, TriggerReceiver,
    TriggerSender, PERIODIC_TAG,
};
