//! Storage abstraction layer for registry entities.
//!
//! The `StorageProvider` trait defines pure data storage operations over
//! hierarchical keys. It knows nothing about models, validation or default
//! versions; those live in the registry service.
//!
//! # Architecture
//!
//! The storage layer is responsible for:
//! - PUT/GET/DELETE of JSON records at entity paths
//! - Listing the direct children of a path
//! - Applying a batch of writes atomically
//!
//! The storage layer is NOT responsible for:
//! - Epochs and timestamps
//! - Attribute validation
//! - Default-version selection and eviction
//!
//! Records live at `/` (the Registry), `/<groups>/<gid>` (a Group) and
//! `/<groups>/<gid>/<resources>/<rid>` (a Resource with its Versions and
//! Meta).
//!
//! # Example Usage
//!
//! ```rust
//! use xregistry_server::entity::GroupKey;
//! use xregistry_server::storage::{InMemoryStorage, StorageKey, StoragePrefix, StorageProvider};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = InMemoryStorage::new();
//!
//! let key = StorageKey::group(&GroupKey::new("dirs", "d1"));
//! storage.put(key.clone(), json!({"dirid": "d1"})).await?;
//!
//! assert!(storage.get(key.clone()).await?.is_some());
//! assert_eq!(storage.count(StoragePrefix::groups("dirs")).await?, 1);
//!
//! assert!(storage.delete(key).await?);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod in_memory;


pub use errors::StorageError;
pub use in_memory::{InMemoryStorage, InMemoryStorageStats};

use crate::entity::{GroupKey, ResourceKey};
use serde_json::Value;
use std::fmt;
use std::future::Future;

/// A hierarchical key identifying one stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey {
    segments: Vec<String>,
}

impl StorageKey {
    /// Key of the Registry record, `/`.
    pub fn registry() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Key of a Group record.
    pub fn group(key: &GroupKey) -> Self {
        Self {
            segments: vec![key.group_type.clone(), key.group_id.clone()],
        }
    }

    /// Key of a Resource record.
    pub fn resource(key: &ResourceKey) -> Self {
        Self {
            segments: vec![
                key.group.group_type.clone(),
                key.group.group_id.clone(),
                key.resource_type.clone(),
                key.resource_id.clone(),
            ],
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of path segments; 0 for the Registry.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The last segment, i.e. the entity id.
    pub fn id(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Whether `self` equals `ancestor` or lies below it.
    pub fn starts_with(&self, ancestor: &StorageKey) -> bool {
        self.segments.starts_with(&ancestor.segments)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

/// A prefix selecting the direct children of one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePrefix {
    segments: Vec<String>,
}

impl StoragePrefix {
    /// All Groups of `group_type`.
    pub fn groups(group_type: impl Into<String>) -> Self {
        Self {
            segments: vec![group_type.into()],
        }
    }

    /// All Resources of `resource_type` inside `group`.
    pub fn resources(group: &GroupKey, resource_type: impl Into<String>) -> Self {
        Self {
            segments: vec![
                group.group_type.clone(),
                group.group_id.clone(),
                resource_type.into(),
            ],
        }
    }

    /// Whether `key` is a direct child of this collection.
    pub fn matches(&self, key: &StorageKey) -> bool {
        key.segments.len() == self.segments.len() + 1 && key.segments.starts_with(&self.segments)
    }
}

impl fmt::Display for StoragePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.segments.join("/"))
    }
}

/// One write inside a [`StorageProvider::commit`] batch.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageOp {
    Put(StorageKey, Value),
    Delete(StorageKey),
    /// Remove a key and everything below it
    DeleteTree(StorageKey),
}

/// Core trait for storage providers that handle pure data persistence.
///
/// # Design Principles
///
/// - **PUT/GET/DELETE Model**: create and update are both PUT
/// - **PUT Returns Data**: the stored record is returned
/// - **DELETE Returns Boolean**: whether the record existed
/// - **Atomic batches**: `commit` applies all of its operations or none
/// - **Async First**: all operations return futures
pub trait StorageProvider: Send + Sync {
    /// The error type returned by storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Store data at the specified key and return the stored data.
    fn put(
        &self,
        key: StorageKey,
        data: Value,
    ) -> impl Future<Output = Result<Value, Self::Error>> + Send;

    /// Retrieve data by key; `None` if absent.
    fn get(
        &self,
        key: StorageKey,
    ) -> impl Future<Output = Result<Option<Value>, Self::Error>> + Send;

    /// Delete one record. Returns whether it existed.
    fn delete(&self, key: StorageKey) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Delete a record and all records below it. Returns how many were removed.
    fn delete_tree(
        &self,
        key: StorageKey,
    ) -> impl Future<Output = Result<usize, Self::Error>> + Send;

    /// List the direct children of `prefix`, ordered by key.
    ///
    /// If `offset` exceeds the total count, or `limit` is 0, the result is
    /// empty.
    fn list(
        &self,
        prefix: StoragePrefix,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<(StorageKey, Value)>, Self::Error>> + Send;

    /// Check if a record exists.
    fn exists(&self, key: StorageKey) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Count the direct children of `prefix`.
    fn count(
        &self,
        prefix: StoragePrefix,
    ) -> impl Future<Output = Result<usize, Self::Error>> + Send;

    /// Apply a batch of writes atomically, in order.
    ///
    /// `Delete` of a missing key fails the whole batch; `DeleteTree` of a
    /// missing key is a no-op.
    fn commit(&self, batch: Vec<StorageOp>) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Remove every record.
    fn clear(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
