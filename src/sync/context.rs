//! Sync Context
//!
//! The shared mutable offline state, owned explicitly instead of living in
//! ambient globals.

use super::{Connectivity, SnapshotLog, SyncQueue, SYNC_QUEUE_KEY};
use crate::cache::PartitionHandle;

/// Connectivity flag plus sync queue, shared by the strategy engine and the
/// reconciliation scheduler.
#[derive(Debug)]
pub struct SyncContext {
    connectivity: Connectivity,
    queue: SyncQueue,
}

impl SyncContext {
    pub fn new(connectivity: Connectivity, queue: SyncQueue) -> Self {
        Self {
            connectivity,
            queue,
        }
    }

    /// Context whose queue is persisted in `data_partition`, starting online.
    pub fn with_data_partition(data_partition: PartitionHandle) -> Self {
        let log = SnapshotLog::new(data_partition, SYNC_QUEUE_KEY);
        Self::new(Connectivity::default(), SyncQueue::new(log))
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    pub fn queue(&self) -> &SyncQueue {
        &self.queue
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }
}
