//! Hierarchical addresses of Groups and Resources.
//!
//! Entities are addressed the same way their `xid` is spelled:
//! `/<groups>/<gid>` and `/<groups>/<gid>/<resources>/<rid>`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of a Group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub group_type: String,
    pub group_id: String,
}

impl GroupKey {
    pub fn new(group_type: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            group_type: group_type.into(),
            group_id: group_id.into(),
        }
    }

    pub fn xid(&self) -> String {
        format!("/{}/{}", self.group_type, self.group_id)
    }

    /// Address of a Resource inside this Group.
    pub fn resource(
        &self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> ResourceKey {
        ResourceKey {
            group: self.clone(),
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.group_type, self.group_id)
    }
}

/// Address of a Resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    pub group: GroupKey,
    pub resource_type: String,
    pub resource_id: String,
}

impl ResourceKey {
    pub fn new(
        group_type: impl Into<String>,
        group_id: impl Into<String>,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        GroupKey::new(group_type, group_id).resource(resource_type, resource_id)
    }

    pub fn group_type(&self) -> &str {
        &self.group.group_type
    }

    pub fn group_id(&self) -> &str {
        &self.group.group_id
    }

    pub fn xid(&self) -> String {
        format!("{}/{}/{}", self.group.xid(), self.resource_type, self.resource_id)
    }

    pub fn meta_xid(&self) -> String {
        format!("{}/meta", self.xid())
    }

    pub fn versions_xid(&self) -> String {
        format!("{}/versions", self.xid())
    }

    pub fn version_xid(&self, version_id: &str) -> String {
        format!("{}/versions/{}", self.xid(), version_id)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.xid())
    }
}
