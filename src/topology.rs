//! Read-only view of which Groups, Resources and Versions exist.
//!
//! The reference validator consults a [`Topology`] to confirm that `xid`
//! values point at live entities. For each write the registry service
//! builds a [`TopologySnapshot`] holding just the entities the request
//! references, so one validation pass always sees a consistent picture.

use crate::entity::{GroupKey, ResourceKey};
use std::collections::{BTreeMap, BTreeSet};

/// Existence lookups over the entity hierarchy.
pub trait Topology: Send + Sync {
    /// Whether Group `group_id` of type `group_type` exists.
    fn find_group(&self, group_type: &str, group_id: &str) -> bool;

    /// Whether Resource `resource_id` of type `resource_type` exists in `group`.
    fn find_resource(&self, group: &GroupKey, resource_type: &str, resource_id: &str) -> bool;

    /// Whether `resource` has a Version `version_id`.
    fn find_version(&self, resource: &ResourceKey, version_id: &str) -> bool;
}

/// In-memory topology index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologySnapshot {
    groups: BTreeSet<GroupKey>,
    resources: BTreeMap<ResourceKey, BTreeSet<String>>,
}

impl TopologySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_group(&mut self, group_type: impl Into<String>, group_id: impl Into<String>) {
        self.groups.insert(GroupKey::new(group_type, group_id));
    }

    /// Record a Resource and its Versions; the owning Group is recorded too.
    pub fn add_resource<I, S>(&mut self, key: ResourceKey, versions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.insert(key.group.clone());
        self.resources
            .entry(key)
            .or_default()
            .extend(versions.into_iter().map(Into::into));
    }

    pub fn add_version(&mut self, key: &ResourceKey, version_id: impl Into<String>) {
        self.groups.insert(key.group.clone());
        self.resources
            .entry(key.clone())
            .or_default()
            .insert(version_id.into());
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }
}

impl Topology for TopologySnapshot {
    fn find_group(&self, group_type: &str, group_id: &str) -> bool {
        self.groups.contains(&GroupKey::new(group_type, group_id))
    }

    fn find_resource(&self, group: &GroupKey, resource_type: &str, resource_id: &str) -> bool {
        self.resources
            .contains_key(&group.resource(resource_type, resource_id))
    }

    fn find_version(&self, resource: &ResourceKey, version_id: &str) -> bool {
        self.resources
            .get(resource)
            .is_some_and(|versions| versions.contains(version_id))
    }
}
