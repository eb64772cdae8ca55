//! Version lineage.
//!
//! Every Version records the Version it was derived from. A root Version is
//! [`Ancestor::Root`]; on the wire it is spelled as the Version's own id.

use crate::error::{RegistryError, RegistryResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// What a Version derives from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Ancestor {
    #[default]
    Root,
    Derived(String),
}

impl Ancestor {
    /// Interpret the `ancestor` attribute of Version `own_id`.
    pub fn from_attribute(own_id: &str, value: &str) -> Self {
        if value == own_id {
            Ancestor::Root
        } else {
            Ancestor::Derived(value.to_string())
        }
    }

    /// Wire form of the `ancestor` attribute for Version `own_id`.
    pub fn to_attribute(&self, own_id: &str) -> String {
        match self {
            Ancestor::Root => own_id.to_string(),
            Ancestor::Derived(parent) => parent.clone(),
        }
    }

    pub fn parent(&self) -> Option<&str> {
        match self {
            Ancestor::Root => None,
            Ancestor::Derived(parent) => Some(parent),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Ancestor::Root)
    }
}

/// Walk from `version_id` towards its root. The result starts with
/// `version_id`; a missing parent or a cycle ends the walk.
pub fn lineage(ancestors: &BTreeMap<String, Ancestor>, version_id: &str) -> Vec<String> {
    let mut chain = Vec::new();
    let mut seen = BTreeSet::new();
    let mut current = Some(version_id);
    while let Some(id) = current {
        if !ancestors.contains_key(id) || !seen.insert(id) {
            break;
        }
        chain.push(id.to_string());
        current = ancestors.get(id).and_then(Ancestor::parent);
    }
    chain
}

/// Every `Derived` parent must exist and the chains must not loop.
pub fn check_ancestors(ancestors: &BTreeMap<String, Ancestor>, subject: &str) -> RegistryResult<()> {
    for (id, ancestor) in ancestors {
        if let Some(parent) = ancestor.parent() {
            if !ancestors.contains_key(parent) {
                return Err(RegistryError::bad_request(
                    subject,
                    format!(
                        "Version \"{}\" has an \"ancestor\" (\"{}\") that cannot be found",
                        id, parent
                    ),
                ));
            }
        }
    }

    for id in ancestors.keys() {
        let chain = lineage(ancestors, id);
        let last = chain.last().map(String::as_str).unwrap_or(id.as_str());
        if !ancestors.get(last).is_some_and(Ancestor::is_root) {
            return Err(RegistryError::bad_request(
                subject,
                format!(
                    "Versions \"{}\" form an \"ancestor\" cycle",
                    chain.join(",")
                ),
            ));
        }
    }
    Ok(())
}

/// Re-root Versions whose parent is in `deleted`. Returns the re-rooted ids.
pub fn reroot_orphans(ancestors: &mut BTreeMap<String, Ancestor>, deleted: &[String]) -> Vec<String> {
    let mut rerooted = Vec::new();
    for (id, ancestor) in ancestors.iter_mut() {
        if ancestor
            .parent()
            .is_some_and(|parent| deleted.iter().any(|gone| gone == parent))
        {
            *ancestor = Ancestor::Root;
            rerooted.push(id.clone());
        }
    }
    rerooted
}
