//! Request options and outcomes for registry writes.

use crate::versioning::DefaultHint;
use serde_json::Value;

/// How request data combines with the stored entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// PUT: the request replaces all client attributes
    #[default]
    Replace,
    /// PATCH: top-level keys are merged and `null` deletes
    Merge,
}

/// Options shared by every mutating operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub mode: WriteMode,
    /// Move the Resource's default pointer as part of the write
    pub set_default_version: Option<DefaultHint>,
    /// Skip the epoch check when the registry allows it
    pub force: bool,
}

impl WriteOptions {
    pub fn replace() -> Self {
        Self::default()
    }

    pub fn merge() -> Self {
        Self {
            mode: WriteMode::Merge,
            ..Self::default()
        }
    }

    pub fn with_default_version(mut self, hint: DefaultHint) -> Self {
        self.set_default_version = Some(hint);
        self
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

/// Result of a successful write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    /// The entity as a client would read it back
    pub entity: Value,
    /// Whether the write created the entity
    pub is_new: bool,
}

/// Addresses an entity level by type names, for standalone validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelPath {
    Registry,
    Group(String),
    Version(String, String),
    Meta(String, String),
}

impl LevelPath {
    pub fn group(group_type: impl Into<String>) -> Self {
        LevelPath::Group(group_type.into())
    }

    pub fn version(group_type: impl Into<String>, resource_type: impl Into<String>) -> Self {
        LevelPath::Version(group_type.into(), resource_type.into())
    }

    pub fn meta(group_type: impl Into<String>, resource_type: impl Into<String>) -> Self {
        LevelPath::Meta(group_type.into(), resource_type.into())
    }
}
