//! xRegistry-style metadata registry library for Rust.
//!
//! Provides a model-driven registry of Groups, Resources and Versions with
//! schema validation, default-version resolution and pluggable storage
//! backends.
//!
//! # Core Components
//!
//! - [`Registry`] - Service orchestrating validation, resolution and storage
//! - [`Validator`] - Attribute validation against a [`Model`]
//! - [`DefaultVersionResolver`] - Default-version selection and eviction
//! - [`storage::StorageProvider`] - Trait for implementing storage backends
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use xregistry_server::RegistryBuilder;
//! use xregistry_server::storage::InMemoryStorage;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = RegistryBuilder::new(InMemoryStorage::new())
//!     .with_base_url("https://registry.example.com")
//!     .with_model(json!({"groups": {}}))
//!     .build()
//!     .await?;
//! let root = registry.get_registry().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod registry;
pub mod schema;
pub mod storage;
pub mod topology;
pub mod validation;
pub mod versioning;

// Re-export commonly used types for convenience
pub use config::{RegistryBuilder, RegistryConfig};
pub use error::{ErrorKind, RegistryError, RegistryResult};
pub use registry::{LevelPath, Registry, WriteMode, WriteOptions, WriteOutcome};
pub use schema::{Attribute, AttributeType, EntityLevel, Model};
pub use topology::{Topology, TopologySnapshot};
pub use validation::{EntityContext, Validator, XidValidator};
pub use versioning::{
    Ancestor, DefaultHint, DefaultPointer, DefaultVersionResolver, Resolution, VersionChange,
    VersionStamp,
};
