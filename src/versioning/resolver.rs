//! Default-version selection and retention.
//!
//! A Resource's default pointer is either [`DefaultPointer::Floating`],
//! tracking the newest Version, or [`DefaultPointer::Pinned`] to an explicit
//! Version id. [`DefaultVersionResolver::resolve`] applies one
//! [`VersionChange`] to the pointer and computes which Versions to evict
//! under `maxversions`. It never mutates anything: callers commit the
//! returned [`Resolution`] or nothing at all.

use crate::error::{ErrorKind, RegistryError, RegistryResult};
use crate::schema::VersioningPolicy;
use crate::validation::cmp_ignore_case;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Which Version a Resource treats as its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DefaultPointer {
    /// The newest Version, recomputed on every change
    #[default]
    Floating,
    /// An explicit Version, until unstuck or deleted
    Pinned(String),
}

impl DefaultPointer {
    pub fn is_sticky(&self) -> bool {
        matches!(self, DefaultPointer::Pinned(_))
    }
}

/// The ordering keys of one Version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionStamp {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

impl VersionStamp {
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at,
        }
    }
}

/// `createdat` ascending, then version id compared case-insensitively.
pub fn version_order(a: &VersionStamp, b: &VersionStamp) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| cmp_ignore_case(&a.id, &b.id))
}

/// The maximum of `versions` under [`version_order`].
pub fn newest<'v, I>(versions: I) -> Option<&'v VersionStamp>
where
    I: IntoIterator<Item = &'v VersionStamp>,
{
    versions.into_iter().max_by(|a, b| version_order(a, b))
}

/// Client request to move the default pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultHint {
    /// Pin to this Version id
    Set(String),
    /// Pin to the last Version processed by this request
    Request,
    /// Return to floating
    Unstick,
}

impl DefaultHint {
    /// Parse the value of a `flag` such as `setdefaultversionid`.
    pub fn parse(flag: &str, raw: &str) -> RegistryResult<Self> {
        match raw {
            "" | "null" => Err(RegistryError::bad_request(
                "",
                format!("\"{}\" must not be empty", flag),
            )),
            "request" => Ok(DefaultHint::Request),
            id => Ok(DefaultHint::Set(id.to_string())),
        }
    }
}

/// What happened to a Resource's Version set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionChange {
    /// Versions were created or updated, in request order
    Upserted {
        processed: Vec<String>,
        hint: Option<DefaultHint>,
    },
    /// Versions are being deleted
    Deleted {
        deleted: Vec<String>,
        next_default: Option<String>,
    },
    /// Only the default pointer changes
    Hint(DefaultHint),
}

/// Outcome of one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub pointer: DefaultPointer,
    /// `None` when no Versions remain and the Resource must be deleted
    pub default_version_id: Option<String>,
    /// Versions to remove, oldest first
    pub evicted: Vec<String>,
}

impl Resolution {
    pub fn sticky(&self) -> bool {
        self.pointer.is_sticky()
    }

    pub fn resource_deleted(&self) -> bool {
        self.default_version_id.is_none()
    }
}

/// Applies [`VersionChange`]s under one Resource type's policy.
#[derive(Debug, Clone, Copy)]
pub struct DefaultVersionResolver<'a> {
    policy: VersioningPolicy,
    subject: &'a str,
}

impl<'a> DefaultVersionResolver<'a> {
    /// `subject` is the Resource path used in error messages.
    pub fn new(policy: VersioningPolicy, subject: &'a str) -> Self {
        Self { policy, subject }
    }

    /// Resolve `change` against the Resource's Versions.
    ///
    /// For [`VersionChange::Upserted`] and [`VersionChange::Hint`],
    /// `versions` is the set after the write; for
    /// [`VersionChange::Deleted`] it is the set before the deletion.
    pub fn resolve(
        &self,
        current: &DefaultPointer,
        versions: &[VersionStamp],
        change: &VersionChange,
    ) -> RegistryResult<Resolution> {
        self.check_unique(versions)?;

        match change {
            VersionChange::Upserted { processed, hint } => {
                let pointer = self.apply_hint(current, versions, processed, hint.as_ref())?;
                self.settle(pointer, versions.iter().collect(), true)
            }
            VersionChange::Hint(hint) => {
                let pointer = self.apply_hint(current, versions, &[], Some(hint))?;
                self.settle(pointer, versions.iter().collect(), false)
            }
            VersionChange::Deleted {
                deleted,
                next_default,
            } => {
                if let Some(missing) = deleted
                    .iter()
                    .find(|id| !versions.iter().any(|v| &v.id == *id))
                {
                    return Err(RegistryError::unknown_id(self.subject, "version", missing));
                }
                let remaining: Vec<&VersionStamp> = versions
                    .iter()
                    .filter(|v| !deleted.contains(&v.id))
                    .collect();

                let pointer = match next_default {
                    Some(next) if deleted.contains(next) => {
                        return Err(RegistryError::bad_request(
                            self.subject,
                            "Can't set \"defaultversionid\" to a Version that is being deleted",
                        ));
                    }
                    Some(next) if !remaining.iter().any(|v| &v.id == next) => {
                        return Err(RegistryError::unknown_id(self.subject, "version", next));
                    }
                    Some(next) => self.pin(next)?,
                    None => match current {
                        DefaultPointer::Pinned(id) if deleted.contains(id) => {
                            DefaultPointer::Floating
                        }
                        other => other.clone(),
                    },
                };
                self.settle(pointer, remaining, false)
            }
        }
    }

    fn apply_hint(
        &self,
        current: &DefaultPointer,
        versions: &[VersionStamp],
        processed: &[String],
        hint: Option<&DefaultHint>,
    ) -> RegistryResult<DefaultPointer> {
        match hint {
            None => Ok(current.clone()),
            Some(DefaultHint::Unstick) => Ok(DefaultPointer::Floating),
            Some(DefaultHint::Request) => {
                let id = processed.last().ok_or_else(|| {
                    RegistryError::bad_request(
                        self.subject,
                        "Can't use 'request' if a version wasn't processed",
                    )
                })?;
                self.pin(id)
            }
            Some(DefaultHint::Set(id)) => {
                if id.is_empty() {
                    return Err(RegistryError::bad_request(
                        self.subject,
                        "\"setdefaultversionid\" must not be empty",
                    ));
                }
                if !versions.iter().any(|v| &v.id == id) {
                    return Err(RegistryError::new(
                        ErrorKind::UnknownId,
                        format!("Version \"{}\" not found", id),
                        self.subject,
                    )
                    .with_arg("id", id.as_str()));
                }
                self.pin(id)
            }
        }
    }

    fn pin(&self, id: &str) -> RegistryResult<DefaultPointer> {
        if !self.policy.sticky_allowed {
            return Err(RegistryError::bad_request(
                self.subject,
                format!(
                    "Resource \"{}\" doesn't allow \"defaultversionsticky\" to be set",
                    self.subject
                ),
            ));
        }
        Ok(DefaultPointer::Pinned(id.to_string()))
    }

    /// Compute the default and, on insert, the evictions.
    fn settle(
        &self,
        pointer: DefaultPointer,
        remaining: Vec<&VersionStamp>,
        evict: bool,
    ) -> RegistryResult<Resolution> {
        let default_id = match &pointer {
            _ if remaining.is_empty() => {
                return Ok(Resolution {
                    pointer: DefaultPointer::Floating,
                    default_version_id: None,
                    evicted: Vec::new(),
                });
            }
            DefaultPointer::Pinned(id) => {
                if !remaining.iter().any(|v| &v.id == id) {
                    return Err(RegistryError::server_error(
                        self.subject,
                        format!("default version \"{}\" is missing", id),
                    ));
                }
                id.clone()
            }
            DefaultPointer::Floating => match newest(remaining.iter().copied()) {
                Some(stamp) => stamp.id.clone(),
                None => return Err(RegistryError::server_error(self.subject, "no versions")),
            },
        };

        let max = self.policy.max_versions;
        let mut evicted = Vec::new();
        if evict && max > 0 && remaining.len() > max {
            let mut ordered = remaining.clone();
            ordered.sort_by(|a, b| version_order(a, b));
            evicted = ordered
                .iter()
                .filter(|v| v.id != default_id)
                .take(remaining.len() - max)
                .map(|v| v.id.clone())
                .collect();
        }

        Ok(Resolution {
            pointer,
            default_version_id: Some(default_id),
            evicted,
        })
    }

    /// Ids that differ only by case would make the ordering partial.
    fn check_unique(&self, versions: &[VersionStamp]) -> RegistryResult<()> {
        let mut seen: HashMap<String, &str> = HashMap::new();
        for version in versions {
            if let Some(other) = seen.insert(version.id.to_ascii_lowercase(), &version.id) {
                return Err(RegistryError::server_error(
                    self.subject,
                    format!(
                        "version ids \"{}\" and \"{}\" differ only by case",
                        other, version.id
                    ),
                ));
            }
        }
        Ok(())
    }
}
