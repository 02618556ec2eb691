//! Snapshot Log
//!
//! A durable list persisted as one JSON snapshot under a reserved key:
//! read everything, write everything.

use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::cache::PartitionHandle;
use crate::error::{CacheError, Result};

/// Read-all / write-all log of `T` stored in one partition slot.
#[derive(Debug, Clone)]
pub struct SnapshotLog<T> {
    partition: PartitionHandle,
    key: String,
    _items: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> SnapshotLog<T> {
    pub fn new(partition: PartitionHandle, key: impl Into<String>) -> Self {
        Self {
            partition,
            key: key.into(),
            _items: PhantomData,
        }
    }

    /// Every persisted item. A missing snapshot reads as empty; a corrupt one
    /// is logged and also reads as empty.
    pub async fn read_all(&self) -> Result<Vec<T>> {
        match self.partition.read_json::<Vec<T>>(&self.key).await {
            Ok(items) => Ok(items.unwrap_or_default()),
            Err(CacheError::Serialization(err)) => {
                warn!("Discarding corrupt snapshot {}: {}", self.key, err);
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    /// Replaces the persisted snapshot with `items`.
    pub async fn write_all(&self, items: &[T]) -> Result<()> {
        self.partition.write_json(&self.key, &items).await
    }
}
