//! Cache Module
//!
//! Named, versioned partitions of request-keyed response snapshots.

mod entry;
mod manager;
mod stats;
mod storage;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use manager::{PartitionHandle, PartitionManager, PartitionNames, PartitionSet, SeedReport};
pub use stats::StrategyStats;
pub use storage::{validate_partition_name, CacheStorage, Partition};
