//! Cache Storage Module
//!
//! Named partitions of request-keyed entries, held in memory and optionally
//! written through to a directory (one JSON file per partition).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::CacheEntry;
use crate::error::{CacheError, Result};
use crate::net::RequestKey;

const PARTITION_FILE_EXT: &str = "json";

// == Partition ==
/// One named store of entries keyed by `RequestKey`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Partition {
    entries: BTreeMap<String, CacheEntry>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Cache Storage ==
/// Backing store for every partition.
///
/// Reads and writes are not coordinated per key: two writers of the same key
/// race and the last one wins.
#[derive(Debug)]
pub struct CacheStorage {
    partitions: RwLock<BTreeMap<String, Partition>>,
    /// Write-through directory, None = memory only
    root: Option<PathBuf>,
}

impl CacheStorage {
    // == Constructors ==
    /// Storage that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            partitions: RwLock::new(BTreeMap::new()),
            root: None,
        }
    }

    /// Storage written through to `dir`, loading any partitions already there.
    ///
    /// Unreadable partition files are logged and skipped.
    pub async fn open_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        let mut partitions = BTreeMap::new();
        let mut read_dir = tokio::fs::read_dir(&dir).await?;
        while let Some(file) = read_dir.next_entry().await? {
            let path = file.path();
            if path.extension().and_then(|e| e.to_str()) != Some(PARTITION_FILE_EXT) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match load_partition(&path).await {
                Ok(partition) => {
                    debug!("Loaded partition {} ({} entries)", name, partition.len());
                    partitions.insert(name.to_string(), partition);
                }
                Err(err) => warn!("Skipping unreadable partition file {:?}: {}", path, err),
            }
        }

        info!(
            "Opened cache storage at {:?} with {} partitions",
            dir,
            partitions.len()
        );

        Ok(Self {
            partitions: RwLock::new(partitions),
            root: Some(dir),
        })
    }

    // == Partition Lifecycle ==
    /// Opens a partition, creating it if absent. Returns true if it was created.
    pub async fn open(&self, name: &str) -> Result<bool> {
        validate_partition_name(name)?;

        let created = {
            let mut partitions = self.partitions.write().await;
            if partitions.contains_key(name) {
                false
            } else {
                partitions.insert(name.to_string(), Partition::default());
                true
            }
        };

        if created {
            self.persist(name).await?;
        }
        Ok(created)
    }

    /// Deletes a partition and its file. Returns true if it existed.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        let existed = self.partitions.write().await.remove(name).is_some();
        if existed {
            if let Some(path) = self.partition_path(name) {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => {}
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                    Err(err) => return Err(err.into()),
                }
            }
        }
        Ok(existed)
    }

    /// Names of all live partitions.
    pub async fn keys(&self) -> Vec<String> {
        self.partitions.read().await.keys().cloned().collect()
    }

    // == Entry Operations ==
    pub async fn get(&self, name: &str, key: &RequestKey) -> Result<Option<CacheEntry>> {
        let partitions = self.partitions.read().await;
        let partition = partitions
            .get(name)
            .ok_or_else(|| CacheError::PartitionMissing(name.to_string()))?;
        Ok(partition.entries.get(&key.to_string()).cloned())
    }

    /// Stores an entry, overwriting any previous entry for the key.
    ///
    /// The in-memory write always lands; a failed write-through is reported
    /// as `CacheError::Storage`.
    pub async fn put(&self, name: &str, key: &RequestKey, entry: CacheEntry) -> Result<()> {
        {
            let mut partitions = self.partitions.write().await;
            let partition = partitions
                .get_mut(name)
                .ok_or_else(|| CacheError::PartitionMissing(name.to_string()))?;
            partition.entries.insert(key.to_string(), entry);
        }
        self.persist(name).await
    }

    /// Removes an entry. Returns true if it existed.
    pub async fn remove(&self, name: &str, key: &RequestKey) -> Result<bool> {
        let removed = {
            let mut partitions = self.partitions.write().await;
            let partition = partitions
                .get_mut(name)
                .ok_or_else(|| CacheError::PartitionMissing(name.to_string()))?;
            partition.entries.remove(&key.to_string()).is_some()
        };
        if removed {
            self.persist(name).await?;
        }
        Ok(removed)
    }

    pub async fn len(&self, name: &str) -> Result<usize> {
        self.partitions
            .read()
            .await
            .get(name)
            .map(Partition::len)
            .ok_or_else(|| CacheError::PartitionMissing(name.to_string()))
    }

    // == Write-through ==
    fn partition_path(&self, name: &str) -> Option<PathBuf> {
        self.root
            .as_ref()
            .map(|root| root.join(format!("{}.{}", name, PARTITION_FILE_EXT)))
    }

    /// Writes the partition snapshot to disk (temp file + rename).
    async fn persist(&self, name: &str) -> Result<()> {
        let Some(path) = self.partition_path(name) else {
            return Ok(());
        };

        let bytes = {
            let partitions = self.partitions.read().await;
            match partitions.get(name) {
                Some(partition) => serde_json::to_vec(partition)?,
                // Deleted concurrently, nothing to write
                None => return Ok(()),
            }
        };

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

async fn load_partition(path: &Path) -> Result<Partition> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Partition names double as file names, so they must be a single path segment.
pub fn validate_partition_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(CacheError::InvalidRequest(format!(
            "Invalid partition name: {:?}",
            name
        )));
    }
    Ok(())
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::StoredResponse;

    fn key(url: &str) -> RequestKey {
        RequestKey::new("GET", url)
    }

    fn entry(body: &str) -> CacheEntry {
        CacheEntry::new(StoredResponse::new(200, body))
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let storage = CacheStorage::in_memory();

        assert!(storage.open("static-cache-v1").await.unwrap());
        assert!(!storage.open("static-cache-v1").await.unwrap());
        assert_eq!(storage.keys().await, vec!["static-cache-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_put_get_remove() {
        let storage = CacheStorage::in_memory();
        storage.open("data").await.unwrap();

        storage
            .put("data", &key("https://a.test/x"), entry("one"))
            .await
            .unwrap();
        let found = storage.get("data", &key("https://a.test/x")).await.unwrap();
        assert_eq!(found.unwrap().response.text(), "one");

        assert!(storage.remove("data", &key("https://a.test/x")).await.unwrap());
        assert!(!storage.remove("data", &key("https://a.test/x")).await.unwrap());
        assert_eq!(storage.len("data").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_overwrite_last_writer_wins() {
        let storage = CacheStorage::in_memory();
        storage.open("data").await.unwrap();

        storage.put("data", &key("k"), entry("first")).await.unwrap();
        storage.put("data", &key("k"), entry("second")).await.unwrap();

        let found = storage.get("data", &key("k")).await.unwrap().unwrap();
        assert_eq!(found.response.text(), "second");
        assert_eq!(storage.len("data").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_partition_errors() {
        let storage = CacheStorage::in_memory();

        assert!(matches!(
            storage.get("nope", &key("k")).await,
            Err(CacheError::PartitionMissing(_))
        ));
        assert!(matches!(
            storage.put("nope", &key("k"), entry("x")).await,
            Err(CacheError::PartitionMissing(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_names_rejected() {
        let storage = CacheStorage::in_memory();
        for name in ["", "../escape", "a/b", "a\\b"] {
            assert!(matches!(
                storage.open(name).await,
                Err(CacheError::InvalidRequest(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_write_through_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = CacheStorage::open_dir(dir.path()).await.unwrap();
            storage.open("data-cache-v1").await.unwrap();
            storage
                .put("data-cache-v1", &key("/sync-queue"), entry("[]"))
                .await
                .unwrap();
        }

        let reopened = CacheStorage::open_dir(dir.path()).await.unwrap();
        let found = reopened
            .get("data-cache-v1", &key("/sync-queue"))
            .await
            .unwrap();
        assert_eq!(found.unwrap().response.text(), "[]");
    }

    #[tokio::test]
    async fn test_delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CacheStorage::open_dir(dir.path()).await.unwrap();
        storage.open("old-cache").await.unwrap();
        assert!(dir.path().join("old-cache.json").exists());

        assert!(storage.delete("old-cache").await.unwrap());
        assert!(!dir.path().join("old-cache.json").exists());
        assert!(!storage.delete("old-cache").await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_write_through_keeps_memory_state() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CacheStorage::open_dir(dir.path()).await.unwrap();
        storage.open("data").await.unwrap();

        // Pull the directory out from under the storage
        std::fs::remove_dir_all(dir.path()).unwrap();

        let result = storage.put("data", &key("k"), entry("v")).await;
        assert!(matches!(result, Err(CacheError::Storage(_))));
        assert!(storage.get("data", &key("k")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_corrupt_partition_file_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), b"{not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let storage = CacheStorage::open_dir(dir.path()).await.unwrap();
        assert!(storage.keys().await.is_empty());
    }
}
