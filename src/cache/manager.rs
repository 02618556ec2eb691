//! Partition Manager Module
//!
//! Owns partition lifecycle: creation at install, stale purge at activation,
//! seeding, and cleanup. Everything else reaches partitions through a
//! `PartitionHandle`, which can read and write entries but never create or
//! delete a partition.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::cache::{CacheEntry, CacheStorage};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::net::{Fetcher, InterceptedRequest, RequestKey, StoredResponse};

// == Partition Names ==
/// Names of the four partitions live for the deployed version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionNames {
    pub static_assets: String,
    pub dynamic: String,
    pub data: String,
    pub offline: String,
}

impl PartitionNames {
    pub fn from_config(config: &Config) -> Self {
        Self {
            static_assets: config.static_partition(),
            dynamic: config.dynamic_partition(),
            data: config.data_partition(),
            offline: config.offline_partition(),
        }
    }

    /// In lookup priority order.
    pub fn all(&self) -> [&str; 4] {
        [
            &self.static_assets,
            &self.dynamic,
            &self.data,
            &self.offline,
        ]
    }

    pub fn to_set(&self) -> HashSet<String> {
        self.all().iter().map(|s| s.to_string()).collect()
    }
}

// == Partition Handle ==
/// Entry-level access to one named partition.
#[derive(Debug, Clone)]
pub struct PartitionHandle {
    name: String,
    storage: Arc<CacheStorage>,
}

impl PartitionHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cached response for `key`; storage failures are logged and read as a miss.
    pub async fn lookup(&self, key: &RequestKey) -> Option<StoredResponse> {
        match self.storage.get(&self.name, key).await {
            Ok(entry) => entry.map(|e| e.response),
            Err(err) => {
                error!("Lookup of {} in {} failed: {}", key, self.name, err);
                None
            }
        }
    }

    /// Stores a network response for `request`.
    ///
    /// Only GET responses are stored. Returns false when nothing was written
    /// or the write-through failed (logged).
    pub async fn store(&self, request: &InterceptedRequest, response: &StoredResponse) -> bool {
        if request.method != axum::http::Method::GET {
            debug!("Not caching {} {}", request.method, request.url);
            return false;
        }
        match self.put(&request.key(), response.clone()).await {
            Ok(()) => true,
            Err(err) => {
                error!("Storing {} in {} failed: {}", request.url, self.name, err);
                false
            }
        }
    }

    pub async fn put(&self, key: &RequestKey, response: StoredResponse) -> Result<()> {
        self.storage
            .put(&self.name, key, CacheEntry::new(response))
            .await
    }

    pub async fn remove(&self, key: &RequestKey) -> Result<bool> {
        self.storage.remove(&self.name, key).await
    }

    pub async fn len(&self) -> Result<usize> {
        self.storage.len(&self.name).await
    }

    /// Reads a reserved JSON record such as `/user-location`.
    pub async fn read_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        match self.storage.get(&self.name, &RequestKey::reserved(path)).await? {
            Some(entry) => Ok(Some(entry.response.json_body()?)),
            None => Ok(None),
        }
    }

    /// Writes a reserved JSON record.
    pub async fn write_json<T: Serialize>(&self, path: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.put(&RequestKey::reserved(path), StoredResponse::json(200, &value))
            .await
    }
}

/// Handles for the four live partitions.
#[derive(Debug, Clone)]
pub struct PartitionSet {
    pub static_assets: PartitionHandle,
    pub dynamic: PartitionHandle,
    pub data: PartitionHandle,
    pub offline: PartitionHandle,
}

/// Outcome of a best-effort bulk add.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub cached: usize,
    pub failed: Vec<String>,
}

// == Partition Manager ==
pub struct PartitionManager {
    storage: Arc<CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    names: PartitionNames,
}

impl PartitionManager {
    pub fn new(storage: Arc<CacheStorage>, fetcher: Arc<dyn Fetcher>, names: PartitionNames) -> Self {
        Self {
            storage,
            fetcher,
            names,
        }
    }

    pub fn names(&self) -> &PartitionNames {
        &self.names
    }

    // == Ensure Partition ==
    /// Opens the named partition, creating it if absent. Idempotent.
    pub async fn ensure_partition(&self, name: &str) -> Result<PartitionHandle> {
        if self.storage.open(name).await? {
            debug!("Created partition {}", name);
        }
        Ok(PartitionHandle {
            name: name.to_string(),
            storage: self.storage.clone(),
        })
    }

    /// Opens all four live partitions.
    pub async fn ensure_all(&self) -> Result<PartitionSet> {
        Ok(PartitionSet {
            static_assets: self.ensure_partition(&self.names.static_assets).await?,
            dynamic: self.ensure_partition(&self.names.dynamic).await?,
            data: self.ensure_partition(&self.names.data).await?,
            offline: self.ensure_partition(&self.names.offline).await?,
        })
    }

    // == Purge Stale ==
    /// Deletes every partition not named in `current`.
    ///
    /// Deletions are best-effort: a failed delete is logged and the purge
    /// continues. Returns the names actually deleted.
    pub async fn purge_stale(&self, current: &HashSet<String>) -> Vec<String> {
        let mut deleted = Vec::new();
        for name in self.storage.keys().await {
            if current.contains(&name) {
                continue;
            }
            match self.storage.delete(&name).await {
                Ok(true) => {
                    info!("Deleted stale partition {}", name);
                    deleted.push(name);
                }
                Ok(false) => {}
                Err(err) => warn!("Failed to delete stale partition {}: {}", name, err),
            }
        }
        deleted
    }

    // == Seed Core ==
    /// Populates the static partition with `resources`. Individual failures
    /// are logged and swallowed.
    pub async fn seed_core(&self, resources: &[Url]) -> SeedReport {
        match self.ensure_partition(&self.names.static_assets).await {
            Ok(handle) => self.add_all(&handle, resources).await,
            Err(err) => {
                error!("Cannot open static partition for seeding: {}", err);
                SeedReport {
                    cached: 0,
                    failed: resources.iter().map(Url::to_string).collect(),
                }
            }
        }
    }

    /// Fetches each URL and stores ok responses into `handle`, concurrently.
    pub async fn add_all(&self, handle: &PartitionHandle, urls: &[Url]) -> SeedReport {
        let results = join_all(urls.iter().map(|url| self.add(handle, url))).await;

        let mut report = SeedReport::default();
        for (url, result) in urls.iter().zip(results) {
            match result {
                Ok(()) => report.cached += 1,
                Err(reason) => {
                    warn!("Failed to cache {} into {}: {}", url, handle.name(), reason);
                    report.failed.push(url.to_string());
                }
            }
        }
        report
    }

    async fn add(&self, handle: &PartitionHandle, url: &Url) -> std::result::Result<(), String> {
        let request = InterceptedRequest::new(axum::http::Method::GET, url.clone());
        let response = self
            .fetcher
            .fetch(&request)
            .await
            .map_err(|e| e.to_string())?;
        if !response.is_ok() {
            return Err(format!("status {}", response.status));
        }
        handle
            .put(&request.key(), response)
            .await
            .map_err(|e| e.to_string())
    }

    // == Cleanup ==
    /// Deletes partitions explicitly marked as old or deprecated.
    pub async fn cleanup_deprecated(&self) -> Vec<String> {
        let marked: HashSet<String> = self
            .storage
            .keys()
            .await
            .into_iter()
            .filter(|name| !(name.contains("old") || name.contains("deprecated")))
            .collect();
        self.purge_stale(&marked).await
    }

    // == Lookup ==
    /// First cached response for `key` across all partitions, live ones first.
    pub async fn match_any(&self, key: &RequestKey) -> Option<StoredResponse> {
        let mut order: Vec<String> = self.names.all().iter().map(|s| s.to_string()).collect();
        for name in self.storage.keys().await {
            if !order.contains(&name) {
                order.push(name);
            }
        }

        for name in order {
            match self.storage.get(&name, key).await {
                Ok(Some(entry)) => return Some(entry.response),
                Ok(None) | Err(CacheError::PartitionMissing(_)) => {}
                Err(err) => error!("Lookup of {} in {} failed: {}", key, name, err),
            }
        }
        None
    }

    /// Names of all live partitions.
    pub async fn partition_names(&self) -> Vec<String> {
        self.storage.keys().await
    }

    /// Entry count of every live partition.
    pub async fn entry_counts(&self) -> Vec<(String, usize)> {
        let mut counts = Vec::new();
        for name in self.storage.keys().await {
            match self.storage.len(&name).await {
                Ok(len) => counts.push((name, len)),
                Err(err) => debug!("Skipping {} in entry counts: {}", name, err),
            }
        }
        counts
    }
}
