//! Reference validation for `xid` and `xidtype` attributes.
//!
//! An `xid` names a concrete entity (`/dirs/d1/files/f1/versions/v1`) and
//! must resolve against the live [`Topology`]. An `xidtype` names an entity
//! type (`/dirs/files/versions`) and is checked against the model only.
//! Pointer attributes may narrow an `xid` with a `target` such as
//! `/dirs/files[/versions]`.

use super::names::id_problem;
use crate::entity::GroupKey;
use crate::error::{RegistryError, RegistryResult};
use crate::schema::{GroupModel, Model, ResourceModel};
use crate::topology::Topology;

/// Whether a targeted xid may, must or must not name a Version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetVersions {
    Excluded,
    Required,
    Optional,
}

/// Parsed `target` of a pointer attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XidTarget {
    pub group: String,
    pub resource: Option<String>,
    pub versions: TargetVersions,
}

impl XidTarget {
    /// Parse `target` against the Group and Resource types of `model`.
    pub fn parse(target: &str, model: &Model) -> Result<Self, String> {
        let shape_error = || {
            format!(
                "\"target\" must be of the form \"/GROUPS[/RESOURCES[/versions | [/versions]]]\", not \"{}\"",
                target
            )
        };

        let (body, optional) = match target.strip_suffix("[/versions]") {
            Some(body) => (body, true),
            None => (target, false),
        };
        let parts: Vec<&str> = body
            .strip_prefix('/')
            .ok_or_else(shape_error)?
            .split('/')
            .collect();
        if parts.len() > 3 || parts.iter().any(|part| part.is_empty()) {
            return Err(shape_error());
        }

        let group = model
            .group(parts[0])
            .ok_or_else(|| format!("unknown Group type \"{}\" in target \"{}\"", parts[0], target))?;

        let resource = match parts.get(1) {
            Some(plural) => {
                group.resource(plural).ok_or_else(|| {
                    format!("unknown Resource type \"{}\" in target \"{}\"", plural, target)
                })?;
                Some(plural.to_string())
            }
            None => None,
        };

        let versions = match (parts.get(2), optional) {
            (None, false) => TargetVersions::Excluded,
            (Some(&"versions"), false) => TargetVersions::Required,
            (None, true) if resource.is_some() => TargetVersions::Optional,
            _ => return Err(shape_error()),
        };

        Ok(Self {
            group: group.plural.clone(),
            resource,
            versions,
        })
    }
}

/// Validates `xid`/`xidtype` values against a model and a topology.
pub struct XidValidator<'a> {
    model: &'a Model,
    topology: &'a dyn Topology,
}

impl<'a> XidValidator<'a> {
    pub fn new(model: &'a Model, topology: &'a dyn Topology) -> Self {
        Self { model, topology }
    }

    /// Validate an `xid` value held by attribute `path`, optionally
    /// constrained by `target`.
    pub fn validate_xid(
        &self,
        path: &str,
        value: &str,
        target: Option<&str>,
        subject: &str,
    ) -> RegistryResult<()> {
        let parts = split_parts(path, value, "an xid", subject)?;
        match target {
            Some(target) => self.check_targeted(path, value, &parts, target, subject),
            None => self.check_untargeted(path, value, &parts, subject),
        }
    }

    /// Validate an `xidtype` value held by attribute `path`.
    pub fn validate_xidtype(&self, path: &str, value: &str, subject: &str) -> RegistryResult<()> {
        let parts = split_parts(path, value, "an xidtype", subject)?;
        if parts.is_empty() {
            return Ok(());
        }
        if parts.len() > 3 {
            return Err(too_long(path, subject));
        }
        let group = self.group_type(path, parts[0], subject)?;
        if let Some(plural) = parts.get(1) {
            self.resource_type(path, group, plural, subject)?;
        }
        if let Some(segment) = parts.get(2) {
            if !matches!(*segment, "versions" | "meta") {
                return Err(unknown_segment(path, segment, 3, subject));
            }
        }
        Ok(())
    }

    fn check_untargeted(
        &self,
        path: &str,
        value: &str,
        parts: &[&str],
        subject: &str,
    ) -> RegistryResult<()> {
        if parts.is_empty() {
            return Ok(());
        }
        if parts.len() > 6 {
            return Err(too_long(path, subject));
        }

        let group = self.group_type(path, parts[0], subject)?;
        let missing = |field: String| {
            RegistryError::invalid_attribute(
                subject,
                format!(
                    "Attribute \"{}\" must be an xid, \"{}\" is missing \"{}\"",
                    path, value, field
                ),
            )
        };
        let invalid = |singular: &str, problem: String| {
            RegistryError::invalid_attribute(
                subject,
                format!(
                    "Attribute \"{}\" must be an xid, the \"{}\" ID is not valid: {}",
                    path, singular, problem
                ),
            )
        };

        let group_id = parts.get(1).copied().ok_or_else(|| missing(group.id_attribute()))?;
        if let Some(problem) = id_problem(group_id) {
            return Err(invalid(&group.singular, problem));
        }

        let Some(plural) = parts.get(2) else {
            return self.check_exists(group, group_id, None, None, subject);
        };
        let resource = self.resource_type(path, group, plural, subject)?;
        let resource_id = parts.get(3).copied().ok_or_else(|| missing(resource.id_attribute()))?;
        if let Some(problem) = id_problem(resource_id) {
            return Err(invalid(&resource.singular, problem));
        }

        let version_id = match parts.get(4) {
            None => None,
            Some(&"meta") if parts.len() == 5 => None,
            Some(&"meta") => return Err(too_long(path, subject)),
            Some(&"versions") => {
                let version_id = parts.get(5).copied().ok_or_else(|| missing("versionid".to_string()))?;
                if let Some(problem) = id_problem(version_id) {
                    return Err(invalid("version", problem));
                }
                Some(version_id)
            }
            Some(segment) => return Err(unknown_segment(path, segment, 5, subject)),
        };

        self.check_exists(
            group,
            group_id,
            Some((resource, resource_id)),
            version_id,
            subject,
        )
    }

    fn check_targeted(
        &self,
        path: &str,
        value: &str,
        parts: &[&str],
        target_text: &str,
        subject: &str,
    ) -> RegistryResult<()> {
        let target = XidTarget::parse(target_text, self.model).map_err(|reason| {
            RegistryError::server_error(subject, format!("attribute \"{}\": {}", path, reason))
        })?;
        let mismatch = |detail: Option<String>| {
            let message = match detail {
                Some(detail) => format!(
                    "Attribute \"{}\" must match \"{}\" target, {}",
                    path, target_text, detail
                ),
                None => format!("Attribute \"{}\" must match \"{}\" target", path, target_text),
            };
            RegistryError::invalid_attribute(subject, message)
        };
        let missing = |field: String| mismatch(Some(format!("\"{}\" is missing \"{}\"", value, field)));
        let invalid = |singular: &str, problem: String| {
            mismatch(Some(format!("the \"{}\" ID is not valid: {}", singular, problem)))
        };
        let extra = |segment: &str| mismatch(Some(format!("extra stuff after \"{}\"", segment)));

        if parts.first() != Some(&target.group.as_str()) {
            return Err(mismatch(None));
        }
        let group = self.group_type(path, &target.group, subject)?;
        let group_id = parts.get(1).copied().ok_or_else(|| missing(group.id_attribute()))?;
        if let Some(problem) = id_problem(group_id) {
            return Err(invalid(&group.singular, problem));
        }

        let Some(resource_plural) = target.resource.as_deref() else {
            if parts.len() > 2 {
                return Err(extra(group_id));
            }
            return self.check_exists(group, group_id, None, None, subject);
        };

        if parts.get(2) != Some(&resource_plural) {
            return Err(mismatch(None));
        }
        let resource = self.resource_type(path, group, resource_plural, subject)?;
        let resource_id = parts.get(3).copied().ok_or_else(|| missing(resource.id_attribute()))?;
        if let Some(problem) = id_problem(resource_id) {
            return Err(invalid(&resource.singular, problem));
        }

        let version_id = match target.versions {
            TargetVersions::Excluded if parts.len() > 4 => return Err(extra(resource_id)),
            TargetVersions::Excluded => None,
            TargetVersions::Optional if parts.len() == 4 => None,
            TargetVersions::Required | TargetVersions::Optional => {
                if parts.get(4) != Some(&"versions") {
                    return Err(mismatch(None));
                }
                let version_id = parts.get(5).copied().ok_or_else(|| missing("versionid".to_string()))?;
                if let Some(problem) = id_problem(version_id) {
                    return Err(invalid("version", problem));
                }
                if parts.len() > 6 {
                    return Err(extra(version_id));
                }
                Some(version_id)
            }
        };

        self.check_exists(
            group,
            group_id,
            Some((resource, resource_id)),
            version_id,
            subject,
        )
    }

    /// Report the first segment of the path that does not exist.
    fn check_exists(
        &self,
        group: &GroupModel,
        group_id: &str,
        resource: Option<(&ResourceModel, &str)>,
        version_id: Option<&str>,
        subject: &str,
    ) -> RegistryResult<()> {
        if !self.topology.find_group(&group.plural, group_id) {
            return Err(RegistryError::unknown_id(subject, &group.singular, group_id));
        }
        let Some((resource, resource_id)) = resource else {
            return Ok(());
        };
        let group_key = GroupKey::new(&group.plural, group_id);
        if !self
            .topology
            .find_resource(&group_key, &resource.plural, resource_id)
        {
            return Err(RegistryError::unknown_id(subject, &resource.singular, resource_id));
        }
        if let Some(version_id) = version_id {
            let resource_key = group_key.resource(&resource.plural, resource_id);
            if !self.topology.find_version(&resource_key, version_id) {
                return Err(RegistryError::unknown_id(subject, "version", version_id));
            }
        }
        Ok(())
    }

    fn group_type(&self, path: &str, plural: &str, subject: &str) -> RegistryResult<&'a GroupModel> {
        self.model.group(plural).ok_or_else(|| {
            RegistryError::invalid_attribute(
                subject,
                format!(
                    "Attribute \"{}\" references an unknown Group type \"{}\"",
                    path, plural
                ),
            )
        })
    }

    fn resource_type(
        &self,
        path: &str,
        group: &'a GroupModel,
        plural: &str,
        subject: &str,
    ) -> RegistryResult<&'a ResourceModel> {
        group.resource(plural).ok_or_else(|| {
            RegistryError::invalid_attribute(
                subject,
                format!(
                    "Attribute \"{}\" references an unknown Resource type \"{}\"",
                    path, plural
                ),
            )
        })
    }
}

/// Generic syntax shared by both reference types. `/` yields no parts.
fn split_parts<'v>(
    path: &str,
    value: &'v str,
    kind: &str,
    subject: &str,
) -> RegistryResult<Vec<&'v str>> {
    if value.is_empty() {
        return Err(RegistryError::invalid_attribute(
            subject,
            format!("Attribute \"{}\" must be {}, not empty", path, kind),
        ));
    }
    let Some(rest) = value.strip_prefix('/') else {
        return Err(RegistryError::invalid_attribute(
            subject,
            format!(
                "Attribute \"{}\" must be {}, \"{}\" must start with \"/\"",
                path, kind, value
            ),
        ));
    };
    if rest.is_empty() {
        return Ok(Vec::new());
    }
    let parts: Vec<&str> = rest.split('/').collect();
    if let Some(position) = parts.iter().position(|part| part.is_empty()) {
        return Err(RegistryError::invalid_attribute(
            subject,
            format!(
                "Attribute \"{}\" has an empty part at position {}",
                path,
                position + 1
            ),
        ));
    }
    Ok(parts)
}

fn too_long(path: &str, subject: &str) -> RegistryError {
    RegistryError::invalid_attribute(subject, format!("Attribute \"{}\" is too long", path))
}

fn unknown_segment(path: &str, segment: &str, position: usize, subject: &str) -> RegistryError {
    RegistryError::invalid_attribute(
        subject,
        format!(
            "Attribute \"{}\" has an unexpected \"{}\" at position {}, expected \"versions\" or \"meta\"",
            path, segment, position
        ),
    )
}
