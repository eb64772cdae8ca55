//! Core type definitions for registry models.
//!
//! A [`Model`] declares which Group and Resource types a registry holds and,
//! for each level of the entity hierarchy, the typed [`Attribute`]s its
//! entities may carry.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Named attribute declarations, keyed by attribute name.
pub type Attributes = BTreeMap<String, Attribute>;

fn is_false(value: &bool) -> bool {
    !*value
}

fn default_true() -> bool {
    true
}

/// Registry attribute data types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    /// UTF-8 string
    #[default]
    String,
    /// `true` / `false`
    Boolean,
    /// Any JSON number
    Decimal,
    /// Signed whole number
    Integer,
    /// Non-negative whole number
    UInteger,
    /// RFC3339 timestamp, normalized to UTC
    Timestamp,
    /// Any JSON shape
    Any,
    /// Ordered list of `item` values
    Array,
    /// String-keyed map of `item` values
    Map,
    /// Named sub-attributes, optionally open via `*`
    Object,
    /// Concrete entity path, e.g. `/dirs/d1/files/f1`
    Xid,
    /// Entity type pattern, e.g. `/dirs/files/versions`
    XidType,
    /// Absolute URI
    Uri,
    /// URI or relative reference
    #[serde(rename = "uri-reference")]
    UriReference,
    /// RFC6570 URI template
    #[serde(rename = "uri-template")]
    UriTemplate,
    /// Absolute URL
    Url,
}

impl AttributeType {
    /// Model spelling of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Boolean => "boolean",
            AttributeType::Decimal => "decimal",
            AttributeType::Integer => "integer",
            AttributeType::UInteger => "uinteger",
            AttributeType::Timestamp => "timestamp",
            AttributeType::Any => "any",
            AttributeType::Array => "array",
            AttributeType::Map => "map",
            AttributeType::Object => "object",
            AttributeType::Xid => "xid",
            AttributeType::XidType => "xidtype",
            AttributeType::Uri => "uri",
            AttributeType::UriReference => "uri-reference",
            AttributeType::UriTemplate => "uri-template",
            AttributeType::Url => "url",
        }
    }

    /// Type name with its indefinite article, for "must be a ..." messages.
    pub fn with_article(&self) -> String {
        let name = self.as_str();
        match name.as_bytes().first() {
            Some(b'a' | b'e' | b'i' | b'o' | b'x') => format!("an {}", name),
            _ => format!("a {}", name),
        }
    }

    /// Scalar types hold a single JSON scalar value.
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            AttributeType::Any | AttributeType::Array | AttributeType::Map | AttributeType::Object
        )
    }

    /// Types whose JSON representation is a string.
    pub fn is_string_like(&self) -> bool {
        matches!(
            self,
            AttributeType::String
                | AttributeType::Timestamp
                | AttributeType::Xid
                | AttributeType::XidType
                | AttributeType::Uri
                | AttributeType::UriReference
                | AttributeType::UriTemplate
                | AttributeType::Url
        )
    }
}

/// Allowed character class for attribute and map key names.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum NameCharSet {
    /// `^[a-z_][a-z_0-9]{0,62}$`
    #[default]
    Strict,
    /// `^[a-z0-9][a-z0-9_.:\-]{0,62}$`
    Extended,
}

/// Conditional sibling attributes that apply when the owning attribute holds
/// a specific value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IfValue {
    #[serde(default)]
    pub siblingattributes: Attributes,
}

/// Element declaration for `array` and `map` attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Item {
    #[serde(rename = "type")]
    pub item_type: AttributeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namecharset: Option<NameCharSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Box<Item>>,
}

impl Item {
    pub fn new(item_type: AttributeType) -> Self {
        Self {
            item_type,
            ..Default::default()
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.item = Some(Box::new(item));
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn spec(&self) -> TypeSpec<'_> {
        TypeSpec {
            attr_type: self.item_type,
            target: self.target.as_deref(),
            namecharset: self.namecharset.unwrap_or_default(),
            attributes: self.attributes.as_ref(),
            item: self.item.as_deref(),
            enum_values: &[],
            strict: true,
        }
    }
}

/// Definition of a single attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Attribute {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namecharset: Option<NameCharSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub readonly: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub immutable: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Box<Item>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ifvalues: Option<BTreeMap<String, IfValue>>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.item = Some(Box::new(item));
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn with_namecharset(mut self, charset: NameCharSet) -> Self {
        self.namecharset = Some(charset);
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.enum_values = values;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_ifvalue(mut self, value: impl Into<String>, siblings: Attributes) -> Self {
        self.ifvalues.get_or_insert_with(BTreeMap::new).insert(
            value.into(),
            IfValue {
                siblingattributes: siblings,
            },
        );
        self
    }

    /// Whether enum membership is enforced (defaults to true).
    pub fn is_strict(&self) -> bool {
        self.strict.unwrap_or(true)
    }

    pub fn spec(&self) -> TypeSpec<'_> {
        TypeSpec {
            attr_type: self.attr_type,
            target: self.target.as_deref(),
            namecharset: self.namecharset.unwrap_or_default(),
            attributes: self.attributes.as_ref(),
            item: self.item.as_deref(),
            enum_values: &self.enum_values,
            strict: self.is_strict(),
        }
    }
}

/// Build an [`Attributes`] map from a list of declarations.
pub fn attributes<I: IntoIterator<Item = Attribute>>(list: I) -> Attributes {
    list.into_iter().map(|attr| (attr.name.clone(), attr)).collect()
}

/// Borrowed view over the type-related parts of an [`Attribute`] or [`Item`].
#[derive(Debug, Clone, Copy)]
pub struct TypeSpec<'a> {
    pub attr_type: AttributeType,
    pub target: Option<&'a str>,
    pub namecharset: NameCharSet,
    pub attributes: Option<&'a Attributes>,
    pub item: Option<&'a Item>,
    pub enum_values: &'a [Value],
    pub strict: bool,
}

/// Versioning policy of a Resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersioningPolicy {
    /// Retention cap; 0 means unbounded
    pub max_versions: usize,
    /// Whether clients may pin the default version
    pub sticky_allowed: bool,
}

impl Default for VersioningPolicy {
    fn default() -> Self {
        Self {
            max_versions: 0,
            sticky_allowed: true,
        }
    }
}

/// Declaration of a Resource type within a Group type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceModel {
    pub plural: String,
    pub singular: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub maxversions: i64,
    #[serde(default = "default_true")]
    pub setversionid: bool,
    #[serde(default = "default_true")]
    pub setdefaultversionsticky: bool,
    #[serde(default = "default_true")]
    pub hasdocument: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metaattributes: Attributes,
}

impl ResourceModel {
    pub fn new(plural: impl Into<String>, singular: impl Into<String>) -> Self {
        Self {
            plural: plural.into(),
            singular: singular.into(),
            description: None,
            labels: BTreeMap::new(),
            maxversions: 0,
            setversionid: true,
            setdefaultversionsticky: true,
            hasdocument: true,
            attributes: Attributes::new(),
            metaattributes: Attributes::new(),
        }
    }

    /// Name of the id attribute, e.g. `fileid`.
    pub fn id_attribute(&self) -> String {
        format!("{}id", self.singular)
    }

    pub fn policy(&self) -> VersioningPolicy {
        VersioningPolicy {
            max_versions: usize::try_from(self.maxversions).unwrap_or(0),
            sticky_allowed: self.setdefaultversionsticky,
        }
    }
}

/// Declaration of a Group type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupModel {
    pub plural: String,
    pub singular: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, ResourceModel>,
}

impl GroupModel {
    pub fn new(plural: impl Into<String>, singular: impl Into<String>) -> Self {
        Self {
            plural: plural.into(),
            singular: singular.into(),
            description: None,
            labels: BTreeMap::new(),
            attributes: Attributes::new(),
            resources: BTreeMap::new(),
        }
    }

    pub fn with_resource(mut self, resource: ResourceModel) -> Self {
        self.resources.insert(resource.plural.clone(), resource);
        self
    }

    /// Name of the id attribute, e.g. `dirid`.
    pub fn id_attribute(&self) -> String {
        format!("{}id", self.singular)
    }

    pub fn resource(&self, plural: &str) -> Option<&ResourceModel> {
        self.resources.get(plural)
    }
}

/// The registry model: registry-level attributes plus Group types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Model {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
    #[serde(default)]
    pub groups: BTreeMap<String, GroupModel>,
    /// Snapshot counter, bumped on every accepted model update
    #[serde(skip)]
    pub(crate) generation: u64,
}

impl Model {
    pub fn with_group(mut self, group: GroupModel) -> Self {
        self.groups.insert(group.plural.clone(), group);
        self
    }

    pub fn group(&self, plural: &str) -> Option<&GroupModel> {
        self.groups.get(plural)
    }

    pub fn resource(&self, group_plural: &str, resource_plural: &str) -> Option<&ResourceModel> {
        self.group(group_plural)?.resource(resource_plural)
    }

    /// Generation of this snapshot; 0 for a model never installed in a registry.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
