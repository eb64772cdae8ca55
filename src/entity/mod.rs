//! Entity addresses and persisted records.

pub mod path;
pub mod types;

pub use path::{GroupKey, ResourceKey};
pub use types::{AttributeMap, Group, Meta, RegistryRecord, Resource, Version};
