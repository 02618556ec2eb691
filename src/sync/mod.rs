//! Sync Module
//!
//! Process-wide offline state made explicit: connectivity, and the durable
//! queue of failed requests awaiting replay.

mod connectivity;
mod context;
mod log;
mod queue;

#[cfg(test)]
mod property_tests;

pub use connectivity::Connectivity;
pub use context::SyncContext;
pub use log::SnapshotLog;
pub use queue::{DrainReport, SyncQueue, SyncQueueItem, SYNC_QUEUE_KEY};
