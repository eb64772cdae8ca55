//! Model documents: loading, verification and per-level attribute sets.

use super::embedded;
use super::types::{Attribute, AttributeType, Attributes, GroupModel, Model, NameCharSet, ResourceModel, TypeSpec};
use crate::error::{RegistryError, RegistryResult};
use crate::topology::TopologySnapshot;
use crate::validation::names::{invalid_name_message, is_valid_name, name_pattern};
use crate::validation::{Validator, XidTarget, value_has_shape};
use serde_json::Value;
use std::collections::HashSet;

/// The entity level a set of attributes belongs to.
#[derive(Debug, Clone, Copy)]
pub enum EntityLevel<'m> {
    Registry,
    Group(&'m GroupModel),
    Version(&'m GroupModel, &'m ResourceModel),
    Meta(&'m GroupModel, &'m ResourceModel),
}

impl<'m> EntityLevel<'m> {
    /// Level for Groups of type `group_type`.
    pub fn group(model: &'m Model, group_type: &str) -> RegistryResult<Self> {
        model
            .group(group_type)
            .map(EntityLevel::Group)
            .ok_or_else(|| RegistryError::not_found(format!("/{}", group_type)))
    }

    /// Level for Versions of `group_type`/`resource_type`.
    pub fn version(model: &'m Model, group_type: &str, resource_type: &str) -> RegistryResult<Self> {
        let (group, resource) = lookup(model, group_type, resource_type)?;
        Ok(EntityLevel::Version(group, resource))
    }

    /// Level for the Meta of `group_type`/`resource_type` Resources.
    pub fn meta(model: &'m Model, group_type: &str, resource_type: &str) -> RegistryResult<Self> {
        let (group, resource) = lookup(model, group_type, resource_type)?;
        Ok(EntityLevel::Meta(group, resource))
    }

    /// Attributes at this level whose values must satisfy the id grammar.
    pub fn id_attributes(&self) -> Vec<String> {
        match self {
            EntityLevel::Registry => vec!["registryid".to_string()],
            EntityLevel::Group(group) => vec![group.id_attribute()],
            EntityLevel::Version(_, resource) => vec![
                resource.id_attribute(),
                "versionid".to_string(),
                "ancestor".to_string(),
            ],
            EntityLevel::Meta(_, resource) => {
                vec![resource.id_attribute(), "defaultversionid".to_string()]
            }
        }
    }
}

fn lookup<'m>(
    model: &'m Model,
    group_type: &str,
    resource_type: &str,
) -> RegistryResult<(&'m GroupModel, &'m ResourceModel)> {
    let group = model
        .group(group_type)
        .ok_or_else(|| RegistryError::not_found(format!("/{}", group_type)))?;
    let resource = group
        .resource(resource_type)
        .ok_or_else(|| RegistryError::not_found(format!("/{}/{}", group_type, resource_type)))?;
    Ok((group, resource))
}

fn join(location: &str, name: &str) -> String {
    if location.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", location, name)
    }
}

impl Model {
    /// Load and verify a model document.
    ///
    /// The document is first validated against the built-in model schema,
    /// then deserialized and checked for structural consistency. Every
    /// failure is reported as `model_error`.
    pub fn from_json(doc: &Value) -> RegistryResult<Model> {
        let schema: Attributes = serde_json::from_str(embedded::model_schema()).map_err(|e| {
            RegistryError::server_error("/model", format!("built-in model schema: {}", e))
        })?;
        let obj = doc
            .as_object()
            .ok_or_else(|| RegistryError::model_error("the model must be a JSON object"))?;

        let bootstrap = Model::default();
        let topology = TopologySnapshot::new();
        let normalized = Validator::new(&bootstrap, &topology)
            .validate_object(&schema, obj, "", "/model", None, NameCharSet::Strict)
            .map_err(|err| RegistryError::model_error(err.title()))?;

        let mut model: Model = serde_json::from_value(Value::Object(normalized))
            .map_err(|e| RegistryError::model_error(e.to_string()))?;
        model.fill_names();
        model.verify()?;
        Ok(model)
    }

    /// The model as a JSON document.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// System attributes for `level` merged with the model's declarations.
    ///
    /// A model may re-declare a system attribute to document or constrain
    /// it; the system `readonly`, `immutable` and `required` flags still
    /// apply.
    pub fn entity_attributes(&self, level: &EntityLevel<'_>) -> Attributes {
        let (mut merged, declared) = match level {
            EntityLevel::Registry => (embedded::registry_attributes(), &self.attributes),
            EntityLevel::Group(group) => (embedded::group_attributes(group), &group.attributes),
            EntityLevel::Version(_, resource) => {
                (embedded::version_attributes(resource), &resource.attributes)
            }
            EntityLevel::Meta(_, resource) => {
                (embedded::meta_attributes(resource), &resource.metaattributes)
            }
        };

        for (name, attr) in declared {
            match merged.get_mut(name) {
                Some(system) => {
                    let mut combined = attr.clone();
                    combined.readonly |= system.readonly;
                    combined.immutable |= system.immutable;
                    combined.required |= system.required;
                    if combined.attributes.is_none() {
                        combined.attributes = system.attributes.take();
                    }
                    if combined.item.is_none() {
                        combined.item = system.item.take();
                    }
                    if combined.enum_values.is_empty() {
                        combined.enum_values = std::mem::take(&mut system.enum_values);
                    }
                    if combined.default.is_none() {
                        combined.default = system.default.take();
                    }
                    *system = combined;
                }
                None => {
                    merged.insert(name.clone(), attr.clone());
                }
            }
        }
        merged
    }

    pub(crate) fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    /// Copy map keys into empty `name` fields.
    fn fill_names(&mut self) {
        fill_attribute_names(&mut self.attributes);
        for group in self.groups.values_mut() {
            fill_attribute_names(&mut group.attributes);
            for resource in group.resources.values_mut() {
                fill_attribute_names(&mut resource.attributes);
                fill_attribute_names(&mut resource.metaattributes);
            }
        }
    }

    /// Structural checks applied to every model before it is installed.
    pub fn verify(&self) -> RegistryResult<()> {
        self.verify_attributes(&self.attributes, "", NameCharSet::Strict)?;
        check_system_types(&self.attributes, &embedded::registry_attributes(), "")?;

        let mut group_names = HashSet::new();
        for (key, group) in &self.groups {
            check_type_names(key, &group.plural, &group.singular, "Group", &mut group_names)?;
            self.verify_attributes(&group.attributes, &group.plural, NameCharSet::Strict)?;
            check_system_types(
                &group.attributes,
                &embedded::group_attributes(group),
                &group.plural,
            )?;

            let mut resource_names = HashSet::new();
            for (key, resource) in &group.resources {
                check_type_names(
                    key,
                    &resource.plural,
                    &resource.singular,
                    "Resource",
                    &mut resource_names,
                )?;
                let location = format!("{}.{}", group.plural, resource.plural);
                verify_policy(resource, &location)?;

                self.verify_attributes(&resource.attributes, &location, NameCharSet::Strict)?;
                check_system_types(
                    &resource.attributes,
                    &embedded::version_attributes(resource),
                    &location,
                )?;

                let meta_location = format!("{}.meta", location);
                self.verify_attributes(
                    &resource.metaattributes,
                    &meta_location,
                    NameCharSet::Strict,
                )?;
                check_system_types(
                    &resource.metaattributes,
                    &embedded::meta_attributes(resource),
                    &meta_location,
                )?;
            }
        }
        Ok(())
    }

    fn verify_attributes(
        &self,
        attrs: &Attributes,
        location: &str,
        charset: NameCharSet,
    ) -> RegistryResult<()> {
        for (key, attr) in attrs {
            if key != "*" && !is_valid_name(key, charset) {
                return Err(RegistryError::model_error(invalid_name_message(
                    key, location, charset,
                )));
            }
            if &attr.name != key {
                return Err(RegistryError::model_error(format!(
                    "attribute \"{}\" has a \"name\" of \"{}\", they must match",
                    join(location, key),
                    attr.name
                )));
            }
            self.verify_attribute(attr, &join(location, key), attrs, charset)?;
        }
        Ok(())
    }

    fn verify_attribute(
        &self,
        attr: &Attribute,
        location: &str,
        siblings: &Attributes,
        charset: NameCharSet,
    ) -> RegistryResult<()> {
        self.verify_spec(attr.spec(), location)?;

        if !attr.enum_values.is_empty() {
            if !attr.attr_type.is_scalar() {
                return Err(RegistryError::model_error(format!(
                    "\"{}\" is not a scalar, so it can't have \"enum\" values",
                    location
                )));
            }
            if let Some(bad) = attr
                .enum_values
                .iter()
                .find(|value| !value_has_shape(attr.attr_type, value))
            {
                return Err(RegistryError::model_error(format!(
                    "\"{}\" enum value \"{}\" must be {}",
                    location,
                    bad,
                    attr.attr_type.with_article()
                )));
            }
        }

        if let Some(default) = &attr.default {
            if !value_has_shape(attr.attr_type, default) {
                return Err(RegistryError::model_error(format!(
                    "\"{}\" \"default\" value must be {}",
                    location,
                    attr.attr_type.with_article()
                )));
            }
        }

        let Some(ifvalues) = &attr.ifvalues else {
            return Ok(());
        };
        if !attr.attr_type.is_scalar() {
            return Err(RegistryError::model_error(format!(
                "\"{}\" is not a scalar, so it can't have \"ifvalues\"",
                location
            )));
        }
        for (value, ifvalue) in ifvalues {
            if value.is_empty() {
                return Err(RegistryError::model_error(format!(
                    "\"{}\" has an empty \"ifvalues\" key",
                    location
                )));
            }
            let ifvalue_location = format!("{}.ifvalues.{}", location, value);
            for (name, sibling) in &ifvalue.siblingattributes {
                if name != "*" && !is_valid_name(name, charset) {
                    return Err(RegistryError::model_error(invalid_name_message(
                        name,
                        &ifvalue_location,
                        charset,
                    )));
                }
                if siblings.contains_key(name) {
                    return Err(RegistryError::model_error(format!(
                        "attribute \"{}\" under \"{}\" conflicts with an existing attribute",
                        name, ifvalue_location
                    )));
                }
                if &sibling.name != name {
                    return Err(RegistryError::model_error(format!(
                        "attribute \"{}\" has a \"name\" of \"{}\", they must match",
                        join(&ifvalue_location, name),
                        sibling.name
                    )));
                }
                self.verify_attribute(sibling, &join(&ifvalue_location, name), siblings, charset)?;
            }
        }
        Ok(())
    }

    /// Checks shared by attribute declarations and `item` declarations.
    fn verify_spec(&self, spec: TypeSpec<'_>, location: &str) -> RegistryResult<()> {
        let is_container = matches!(spec.attr_type, AttributeType::Array | AttributeType::Map);
        match (is_container, spec.item) {
            (true, None) => {
                return Err(RegistryError::model_error(format!(
                    "\"{}\" must have an \"item\" section",
                    location
                )));
            }
            (false, Some(_)) => {
                return Err(RegistryError::model_error(format!(
                    "\"{}\" must not have an \"item\" section",
                    location
                )));
            }
            (true, Some(item)) => self.verify_spec(item.spec(), location)?,
            (false, None) => {}
        }

        if let Some(attrs) = spec.attributes {
            if spec.attr_type != AttributeType::Object {
                return Err(RegistryError::model_error(format!(
                    "\"{}\" is not an object, so it can't have \"attributes\"",
                    location
                )));
            }
            self.verify_attributes(attrs, location, spec.namecharset)?;
        }

        if let Some(target) = spec.target {
            if spec.attr_type != AttributeType::Xid {
                return Err(RegistryError::model_error(format!(
                    "\"{}\" is not an xid, so it can't have a \"target\"",
                    location
                )));
            }
            XidTarget::parse(target, self).map_err(|reason| {
                RegistryError::model_error(format!("\"{}\" {}", location, reason))
            })?;
        }
        Ok(())
    }
}

fn fill_attribute_names(attrs: &mut Attributes) {
    for (key, attr) in attrs.iter_mut() {
        if attr.name.is_empty() {
            attr.name = key.clone();
        }
        if let Some(children) = attr.attributes.as_mut() {
            fill_attribute_names(children);
        }
        let mut item = attr.item.as_deref_mut();
        while let Some(current) = item {
            if let Some(children) = current.attributes.as_mut() {
                fill_attribute_names(children);
            }
            item = current.item.as_deref_mut();
        }
        if let Some(ifvalues) = attr.ifvalues.as_mut() {
            for ifvalue in ifvalues.values_mut() {
                fill_attribute_names(&mut ifvalue.siblingattributes);
            }
        }
    }
}

fn check_type_names(
    key: &str,
    plural: &str,
    singular: &str,
    kind: &str,
    seen: &mut HashSet<String>,
) -> RegistryResult<()> {
    if key != plural {
        return Err(RegistryError::model_error(format!(
            "{} plural \"{}\" must match its key \"{}\"",
            kind, plural, key
        )));
    }
    for name in [plural, singular] {
        if !is_valid_name(name, NameCharSet::Strict) {
            return Err(RegistryError::model_error(format!(
                "invalid {} name \"{}\", must match \"{}\"",
                kind,
                name,
                name_pattern(NameCharSet::Strict)
            )));
        }
        if !seen.insert(name.to_string()) {
            return Err(RegistryError::model_error(format!(
                "{} name \"{}\" is used more than once",
                kind, name
            )));
        }
    }
    Ok(())
}

fn verify_policy(resource: &ResourceModel, location: &str) -> RegistryResult<()> {
    if resource.maxversions < 0 {
        return Err(RegistryError::model_error(format!(
            "\"maxversions\"({}) for \"{}\" must be >= 0",
            resource.maxversions, location
        )));
    }
    if resource.maxversions == 1 && resource.setdefaultversionsticky {
        return Err(RegistryError::model_error(format!(
            "\"setdefaultversionsticky\" for \"{}\" must be \"false\" since \"maxversions\" is 1",
            location
        )));
    }
    Ok(())
}

fn check_system_types(declared: &Attributes, system: &Attributes, location: &str) -> RegistryResult<()> {
    for (name, attr) in declared {
        if let Some(builtin) = system.get(name) {
            if builtin.attr_type != attr.attr_type {
                return Err(RegistryError::model_error(format!(
                    "\"{}\" must have a \"type\" of \"{}\"",
                    join(location, name),
                    builtin.attr_type.as_str()
                )));
            }
        }
    }
    Ok(())
}
