//! Recursive attribute validation.
//!
//! [`Validator`] walks an arbitrary JSON value tree against the declared
//! [`Attributes`] of an entity level, normalizing values as it goes
//! (timestamps to UTC, whole-number floats to integers) and producing either
//! the normalized tree or a single [`RegistryError`].
//!
//! Checks on one object run in a fixed order: `ifvalues` expansion, unknown
//! extension names (aggregated), defaults and required attributes
//! (aggregated), then per-attribute type, mutability and enum checks.

use super::names::{id_problem, invalid_name_message, is_valid_map_key, is_valid_name};
use super::timestamp::normalize_timestamp;
use super::xid::XidValidator;
use crate::error::{RegistryError, RegistryResult};
use crate::schema::{
    Attribute, AttributeType, Attributes, EntityLevel, Model, NameCharSet, TypeSpec,
};
use crate::topology::Topology;
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Name of the wildcard attribute that matches undeclared keys.
pub const WILDCARD: &str = "*";

/// Per-call context for [`Validator::validate_entity`].
#[derive(Debug, Clone, Default)]
pub struct EntityContext<'a> {
    /// Stored, already-normalized attributes of the entity being updated
    pub existing: Option<&'a Map<String, Value>>,
    /// `(field, id)` pairs taken from the request path
    pub expected_ids: Vec<(String, String)>,
}

impl<'a> EntityContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_existing(mut self, existing: Option<&'a Map<String, Value>>) -> Self {
        self.existing = existing;
        self
    }

    /// Require body field `field`, when present, to equal `id`.
    pub fn expect_id(mut self, field: impl Into<String>, id: impl Into<String>) -> Self {
        self.expected_ids.push((field.into(), id.into()));
        self
    }
}

/// Validates entity data against a [`Model`] snapshot.
///
/// Validation is a pure function of the model, the input and the
/// [`Topology`] used to resolve `xid` references.
#[derive(Clone, Copy)]
pub struct Validator<'a> {
    model: &'a Model,
    topology: &'a dyn Topology,
    internal: bool,
}

impl<'a> Validator<'a> {
    pub fn new(model: &'a Model, topology: &'a dyn Topology) -> Self {
        Self {
            model,
            topology,
            internal: false,
        }
    }

    /// A validator for system-internal writes, which may set `readonly`
    /// and change `immutable` attributes.
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    pub fn model(&self) -> &'a Model {
        self.model
    }

    /// Validate the full attribute set of one entity.
    ///
    /// `subject` is the entity path used in error messages. Returns the
    /// normalized attributes; `null` values are dropped.
    pub fn validate_entity(
        &self,
        level: &EntityLevel<'_>,
        subject: &str,
        data: &Value,
        ctx: &EntityContext<'_>,
    ) -> RegistryResult<Map<String, Value>> {
        let obj = data.as_object().ok_or_else(|| {
            RegistryError::invalid_attribute(
                subject,
                format!("The data for \"{}\" must be an object", subject),
            )
        })?;

        for (field, expected) in &ctx.expected_ids {
            if let Some(Value::String(body)) = obj.get(field) {
                if body != expected {
                    return Err(RegistryError::mismatched_id(subject, field, expected, body));
                }
            }
        }

        for field in level.id_attributes() {
            if let Some(Value::String(id)) = obj.get(&field) {
                if let Some(problem) = id_problem(id) {
                    return Err(RegistryError::invalid_attribute(subject, problem)
                        .with_arg("attribute", field));
                }
            }
        }

        let attrs = self.model.entity_attributes(level);
        self.validate_object(&attrs, obj, "", subject, ctx.existing, NameCharSet::Strict)
    }

    /// Validate a single value against a type declaration.
    pub fn validate_value(
        &self,
        spec: TypeSpec<'_>,
        value: &Value,
        path: &str,
        subject: &str,
    ) -> RegistryResult<Value> {
        self.check_value(spec, value, path, subject, None)
    }

    /// Validate an object against named attributes plus an optional `*`.
    pub fn validate_object(
        &self,
        attrs: &Attributes,
        obj: &Map<String, Value>,
        path: &str,
        subject: &str,
        existing: Option<&Map<String, Value>>,
        charset: NameCharSet,
    ) -> RegistryResult<Map<String, Value>> {
        let effective = self.expand_ifvalues(attrs, obj, path, subject);
        let wildcard = effective.get(WILDCARD);

        if wildcard.is_none() {
            let unknown: Vec<String> = obj
                .iter()
                .filter(|(key, value)| !value.is_null() && !effective.contains_key(key.as_str()))
                .map(|(key, _)| join_path(path, key))
                .collect();
            if !unknown.is_empty() {
                return Err(RegistryError::unknown_extensions(subject, &unknown));
            }
        }

        let mut missing = Vec::new();
        let mut defaults = Vec::new();
        for (name, attr) in effective.iter().filter(|(name, _)| name.as_str() != WILDCARD) {
            if obj.get(name).is_some_and(|value| !value.is_null()) {
                continue;
            }
            match &attr.default {
                Some(default) => defaults.push((name, attr, default)),
                None if attr.required => missing.push(join_path(path, name)),
                None => {}
            }
        }
        if !missing.is_empty() {
            return Err(RegistryError::required_missing(subject, &missing));
        }

        let mut out = Map::new();
        for (key, value) in obj {
            if value.is_null() {
                continue;
            }
            let child_path = join_path(path, key);
            let attr = match (effective.get(key.as_str()), wildcard) {
                (Some(attr), _) => attr,
                (None, Some(wildcard)) => {
                    if !is_valid_name(key, charset) {
                        return Err(RegistryError::invalid_attribute(
                            subject,
                            invalid_name_message(key, path, charset),
                        ));
                    }
                    wildcard
                }
                (None, None) => continue,
            };

            let prior = existing.and_then(|existing| existing.get(key));
            let normalized = self.check_value(attr.spec(), value, &child_path, subject, prior)?;
            self.check_mutability(attr, &normalized, prior, &child_path, subject)?;
            check_enum(attr, &normalized, &child_path, subject)?;
            out.insert(key.clone(), normalized);
        }

        for (name, attr, default) in defaults {
            let child_path = join_path(path, name);
            let normalized = self.check_value(attr.spec(), default, &child_path, subject, None)?;
            out.insert(name.clone(), normalized);
        }

        Ok(out)
    }

    fn check_value(
        &self,
        spec: TypeSpec<'_>,
        value: &Value,
        path: &str,
        subject: &str,
        prior: Option<&Value>,
    ) -> RegistryResult<Value> {
        let must_be = || {
            RegistryError::invalid_attribute(
                subject,
                format!("Attribute \"{}\" must be {}", path, spec.attr_type.with_article()),
            )
        };

        match spec.attr_type {
            AttributeType::String | AttributeType::UriReference | AttributeType::UriTemplate => {
                value.as_str().map(|_| value.clone()).ok_or_else(must_be)
            }
            AttributeType::Uri | AttributeType::Url => match value.as_str() {
                Some(text) if has_scheme(text) => Ok(value.clone()),
                _ => Err(must_be()),
            },
            AttributeType::Boolean => {
                if value.is_boolean() {
                    Ok(value.clone())
                } else {
                    Err(must_be())
                }
            }
            AttributeType::Decimal => {
                if value.is_number() {
                    Ok(value.clone())
                } else {
                    Err(must_be())
                }
            }
            AttributeType::Integer => whole_i64(value).map(Value::from).ok_or_else(must_be),
            AttributeType::UInteger => whole_u64(value).map(Value::from).ok_or_else(must_be),
            AttributeType::Timestamp => {
                let text = value.as_str().ok_or_else(must_be)?;
                normalize_timestamp(text).map(Value::String).ok_or_else(|| {
                    RegistryError::invalid_attribute(
                        subject,
                        format!("Attribute \"{}\" is a malformed timestamp", path),
                    )
                })
            }
            AttributeType::Xid => {
                let text = value.as_str().ok_or_else(must_be)?;
                XidValidator::new(self.model, self.topology)
                    .validate_xid(path, text, spec.target, subject)?;
                Ok(value.clone())
            }
            AttributeType::XidType => {
                let text = value.as_str().ok_or_else(must_be)?;
                XidValidator::new(self.model, self.topology).validate_xidtype(path, text, subject)?;
                Ok(value.clone())
            }
            AttributeType::Any => Ok(value.clone()),
            AttributeType::Array => {
                let items = value.as_array().ok_or_else(must_be)?;
                let item_spec = item_spec(spec);
                let prior = prior.and_then(Value::as_array);
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| {
                        let item_path = format!("{}[{}]", path, index);
                        let item_prior = prior.and_then(|prior| prior.get(index));
                        self.check_value(item_spec, item, &item_path, subject, item_prior)
                    })
                    .collect::<RegistryResult<Vec<_>>>()
                    .map(Value::Array)
            }
            AttributeType::Map => {
                let entries = value.as_object().ok_or_else(must_be)?;
                let item_spec = item_spec(spec);
                let prior = prior.and_then(Value::as_object);
                let mut out = Map::new();
                for (key, entry) in entries {
                    if !is_valid_map_key(key) {
                        return Err(RegistryError::invalid_attribute(
                            subject,
                            format!(
                                "Invalid map key name \"{}\" in \"{}\", must match \"{}\"",
                                key,
                                path,
                                super::names::EXTENDED_NAME_PATTERN
                            ),
                        ));
                    }
                    if entry.is_null() {
                        continue;
                    }
                    let entry_path = join_path(path, key);
                    let entry_prior = prior.and_then(|prior| prior.get(key));
                    let normalized =
                        self.check_value(item_spec, entry, &entry_path, subject, entry_prior)?;
                    out.insert(key.clone(), normalized);
                }
                Ok(Value::Object(out))
            }
            AttributeType::Object => {
                let obj = value.as_object().ok_or_else(must_be)?;
                let empty = Attributes::new();
                let attrs = spec.attributes.unwrap_or(&empty);
                self.validate_object(
                    attrs,
                    obj,
                    path,
                    subject,
                    prior.and_then(Value::as_object),
                    spec.namecharset,
                )
                .map(Value::Object)
            }
        }
    }

    /// Union `ifvalues` sibling declarations into `attrs` until nothing new
    /// applies.
    ///
    /// A trigger's value is its input value, or its default when absent,
    /// after validation and normalization. Triggers that fail validation
    /// select nothing; the main pass reports their error.
    fn expand_ifvalues<'b>(
        &self,
        attrs: &'b Attributes,
        obj: &Map<String, Value>,
        path: &str,
        subject: &str,
    ) -> Cow<'b, Attributes> {
        let mut effective = Cow::Borrowed(attrs);
        loop {
            let mut additions: Vec<(String, Attribute)> = Vec::new();
            for (name, attr) in effective.iter() {
                let Some(ifvalues) = attr.ifvalues.as_ref() else {
                    continue;
                };
                let raw = match (obj.get(name), &attr.default) {
                    (Some(value), _) if !value.is_null() => value,
                    (_, Some(default)) => default,
                    _ => continue,
                };
                let child_path = join_path(path, name);
                let Ok(value) = self.check_value(attr.spec(), raw, &child_path, subject, None) else {
                    continue;
                };
                let siblings = ifvalues
                    .iter()
                    .filter(|(key, _)| ifvalue_applies(attr.attr_type, key, &value))
                    .flat_map(|(_, ifvalue)| ifvalue.siblingattributes.iter());
                for (sibling, decl) in siblings {
                    if !effective.contains_key(sibling.as_str())
                        && !additions.iter().any(|(added, _)| added == sibling)
                    {
                        additions.push((sibling.clone(), decl.clone()));
                    }
                }
            }
            if additions.is_empty() {
                return effective;
            }
            effective.to_mut().extend(additions);
        }
    }

    fn check_mutability(
        &self,
        attr: &Attribute,
        value: &Value,
        prior: Option<&Value>,
        path: &str,
        subject: &str,
    ) -> RegistryResult<()> {
        if self.internal {
            return Ok(());
        }
        if attr.readonly && prior != Some(value) {
            return Err(RegistryError::invalid_attribute(
                subject,
                format!("Attribute \"{}\" is read-only", path),
            ));
        }
        if attr.immutable && prior.is_some_and(|prior| prior != value) {
            return Err(RegistryError::invalid_attribute(
                subject,
                format!("Attribute \"{}\" is immutable and can't be changed", path),
            ));
        }
        Ok(())
    }
}

fn check_enum(attr: &Attribute, value: &Value, path: &str, subject: &str) -> RegistryResult<()> {
    if attr.enum_values.is_empty() || !attr.is_strict() || attr.enum_values.contains(value) {
        return Ok(());
    }
    let allowed: Vec<String> = attr.enum_values.iter().map(display_value).collect();
    Err(RegistryError::invalid_attribute(
        subject,
        format!(
            "Attribute \"{}\" must be one of the enum values: {}",
            path,
            allowed.join(", ")
        ),
    ))
}

/// Whether the `ifvalues` key `key` selects the validated `value`.
///
/// Numbers compare numerically and timestamps after normalization, so
/// `1.0` selects key `"1"`.
fn ifvalue_applies(attr_type: AttributeType, key: &str, value: &Value) -> bool {
    match attr_type {
        AttributeType::Integer | AttributeType::UInteger | AttributeType::Decimal => {
            match (key.trim().parse::<f64>(), value.as_f64()) {
                (Ok(key), Some(value)) => key == value,
                _ => false,
            }
        }
        AttributeType::Timestamp => value
            .as_str()
            .is_some_and(|value| normalize_timestamp(key).as_deref() == Some(value)),
        _ => match value {
            Value::String(text) => text == key,
            Value::Bool(flag) => key == if *flag { "true" } else { "false" },
            _ => false,
        },
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn item_spec(spec: TypeSpec<'_>) -> TypeSpec<'_> {
    match spec.item {
        Some(item) => item.spec(),
        None => TypeSpec {
            attr_type: AttributeType::Any,
            target: None,
            namecharset: NameCharSet::default(),
            attributes: None,
            item: None,
            enum_values: &[],
            strict: true,
        },
    }
}

pub(crate) fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn whole_i64(value: &Value) -> Option<i64> {
    if let Some(int) = value.as_i64() {
        return Some(int);
    }
    let float = value.as_f64()?;
    (float.fract() == 0.0 && float >= i64::MIN as f64 && float < i64::MAX as f64)
        .then_some(float as i64)
}

fn whole_u64(value: &Value) -> Option<u64> {
    if let Some(uint) = value.as_u64() {
        return Some(uint);
    }
    let float = value.as_f64()?;
    (float.fract() == 0.0 && float >= 0.0 && float < u64::MAX as f64).then_some(float as u64)
}

/// `scheme:` prefix per RFC3986.
fn has_scheme(text: &str) -> bool {
    let Some((scheme, _)) = text.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
}

/// Whether `value` has the JSON shape of `attr_type`, without reference or
/// format checks. Used when verifying `enum` and `default` declarations.
pub fn value_has_shape(attr_type: AttributeType, value: &Value) -> bool {
    match attr_type {
        AttributeType::Boolean => value.is_boolean(),
        AttributeType::Decimal => value.is_number(),
        AttributeType::Integer => whole_i64(value).is_some(),
        AttributeType::UInteger => whole_u64(value).is_some(),
        AttributeType::Timestamp => value.as_str().and_then(normalize_timestamp).is_some(),
        AttributeType::Uri | AttributeType::Url => value.as_str().is_some_and(has_scheme),
        AttributeType::Any => true,
        AttributeType::Array => value.is_array(),
        AttributeType::Map | AttributeType::Object => value.is_object(),
        _ => value.is_string(),
    }
}
