//! In-memory storage implementation for registry entities.
//!
//! A thread-safe implementation of [`StorageProvider`] backed by an ordered
//! map behind tokio's `RwLock`. It is meant for tests, development and
//! registries that do not need persistence.
//!
//! # Performance Characteristics
//!
//! * PUT/GET/DELETE: O(log n)
//! * LIST and COUNT: O(n) over all records
//! * COMMIT: O(n), the batch is applied to a copy and swapped in
//!
//! # Example Usage
//!
//! ```rust
//! use xregistry_server::entity::ResourceKey;
//! use xregistry_server::storage::{InMemoryStorage, StorageKey, StorageOp, StorageProvider};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = InMemoryStorage::new();
//! let file = StorageKey::resource(&ResourceKey::new("dirs", "d1", "files", "f1"));
//!
//! storage
//!     .commit(vec![StorageOp::Put(file.clone(), json!({"id": "f1"}))])
//!     .await?;
//! assert!(storage.exists(file).await?);
//! # Ok(())
//! # }
//! ```

use crate::storage::{StorageError, StorageKey, StorageOp, StoragePrefix, StorageProvider};
use log::{debug, trace};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe in-memory storage.
#[derive(Clone)]
pub struct InMemoryStorage {
    data: Arc<RwLock<BTreeMap<StorageKey, Value>>>,
}

impl InMemoryStorage {
    /// Create a new empty in-memory storage instance.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Get storage statistics for debugging and monitoring.
    pub async fn stats(&self) -> InMemoryStorageStats {
        let data_guard = self.data.read().await;
        let mut stats = InMemoryStorageStats {
            registry_records: 0,
            group_count: 0,
            resource_count: 0,
            total_records: data_guard.len(),
        };
        for key in data_guard.keys() {
            match key.depth() {
                0 => stats.registry_records += 1,
                2 => stats.group_count += 1,
                4 => stats.resource_count += 1,
                _ => {}
            }
        }
        stats
    }

    fn apply(data: &mut BTreeMap<StorageKey, Value>, op: StorageOp) -> Result<(), StorageError> {
        match op {
            StorageOp::Put(key, value) => {
                data.insert(key, value);
            }
            StorageOp::Delete(key) => {
                if data.remove(&key).is_none() {
                    return Err(StorageError::key_not_found(key.to_string()));
                }
            }
            StorageOp::DeleteTree(key) => {
                data.retain(|existing, _| !existing.starts_with(&key));
            }
        }
        Ok(())
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageProvider for InMemoryStorage {
    type Error = StorageError;

    async fn put(&self, key: StorageKey, data: Value) -> Result<Value, Self::Error> {
        trace!("put {}", key);
        let mut data_guard = self.data.write().await;
        data_guard.insert(key, data.clone());
        Ok(data)
    }

    async fn get(&self, key: StorageKey) -> Result<Option<Value>, Self::Error> {
        let data_guard = self.data.read().await;
        Ok(data_guard.get(&key).cloned())
    }

    async fn delete(&self, key: StorageKey) -> Result<bool, Self::Error> {
        let mut data_guard = self.data.write().await;
        Ok(data_guard.remove(&key).is_some())
    }

    async fn delete_tree(&self, key: StorageKey) -> Result<usize, Self::Error> {
        let mut data_guard = self.data.write().await;
        let before = data_guard.len();
        data_guard.retain(|existing, _| !existing.starts_with(&key));
        let removed = before - data_guard.len();
        debug!("Deleted {} record(s) under {}", removed, key);
        Ok(removed)
    }

    async fn list(
        &self,
        prefix: StoragePrefix,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<(StorageKey, Value)>, Self::Error> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let data_guard = self.data.read().await;
        let results = data_guard
            .iter()
            .filter(|(key, _)| prefix.matches(key))
            .skip(offset)
            .take(limit)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Ok(results)
    }

    async fn exists(&self, key: StorageKey) -> Result<bool, Self::Error> {
        let data_guard = self.data.read().await;
        Ok(data_guard.contains_key(&key))
    }

    async fn count(&self, prefix: StoragePrefix) -> Result<usize, Self::Error> {
        let data_guard = self.data.read().await;
        Ok(data_guard.keys().filter(|key| prefix.matches(key)).count())
    }

    async fn commit(&self, batch: Vec<StorageOp>) -> Result<(), Self::Error> {
        let mut data_guard = self.data.write().await;
        let mut staged = data_guard.clone();
        let size = batch.len();
        for op in batch {
            Self::apply(&mut staged, op)?;
        }
        *data_guard = staged;
        debug!("Committed batch of {} operation(s)", size);
        Ok(())
    }

    async fn clear(&self) -> Result<(), Self::Error> {
        let mut data_guard = self.data.write().await;
        data_guard.clear();
        Ok(())
    }
}

/// Statistics about the current state of in-memory storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryStorageStats {
    /// 1 once the Registry record exists
    pub registry_records: usize,
    /// Number of Group records
    pub group_count: usize,
    /// Number of Resource records
    pub resource_count: usize,
    /// Total number of records
    pub total_records: usize,
}
