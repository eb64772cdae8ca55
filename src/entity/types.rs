//! Persisted entity records.
//!
//! Each record keeps the validated attribute map of its entity. Fields the
//! registry reasons about (epochs, the default pointer, ancestors, document
//! bytes) are held typed and re-attached to the map when the entity is
//! re-validated or rendered.

use crate::schema::Model;
use crate::versioning::{Ancestor, DefaultPointer, VersionStamp, reroot_orphans};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Attribute values of one entity, keyed by attribute name.
pub type AttributeMap = Map<String, Value>;

/// The Registry root record. The installed model is persisted alongside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryRecord {
    pub epoch: u64,
    pub attributes: AttributeMap,
    #[serde(default)]
    pub model: Model,
}

/// A Group instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub epoch: u64,
    pub attributes: AttributeMap,
}

/// One Version of a Resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub id: String,
    pub epoch: u64,
    #[serde(default)]
    pub ancestor: Ancestor,
    pub created_at: DateTime<Utc>,
    /// Validated attributes without `ancestor` and the document body
    pub attributes: AttributeMap,
    #[serde(default, with = "document_encoding", skip_serializing_if = "Option::is_none")]
    pub document: Option<Vec<u8>>,
}

impl Version {
    pub fn stamp(&self) -> VersionStamp {
        VersionStamp::new(&self.id, self.created_at)
    }

    /// Attributes including `ancestor`, as the validator expects them.
    pub fn full_attributes(&self) -> AttributeMap {
        let mut map = self.attributes.clone();
        map.insert(
            "ancestor".to_string(),
            Value::String(self.ancestor.to_attribute(&self.id)),
        );
        map
    }
}

/// Default-version bookkeeping and lifecycle flags of a Resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Meta {
    pub epoch: u64,
    pub pointer: DefaultPointer,
    pub default_version_id: String,
    #[serde(default)]
    pub readonly: bool,
    /// Validated attributes without the default pointer and `readonly`
    pub attributes: AttributeMap,
}

impl Meta {
    /// Attribute names held typed rather than in [`Meta::attributes`].
    pub const TYPED_ATTRIBUTES: [&'static str; 3] =
        ["defaultversionid", "defaultversionsticky", "readonly"];

    /// Attributes including the typed fields, as the validator expects them.
    pub fn full_attributes(&self) -> AttributeMap {
        let mut map = self.attributes.clone();
        map.insert(
            "defaultversionid".to_string(),
            Value::String(self.default_version_id.clone()),
        );
        map.insert(
            "defaultversionsticky".to_string(),
            Value::Bool(self.pointer.is_sticky()),
        );
        map.insert("readonly".to_string(), Value::Bool(self.readonly));
        map
    }

    /// Keep validated attributes, dropping the typed ones.
    pub fn absorb(&mut self, mut validated: AttributeMap) {
        for name in Self::TYPED_ATTRIBUTES {
            validated.remove(name);
        }
        self.attributes = validated;
    }
}

/// A Resource: its Meta plus at least one Version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub meta: Meta,
    pub versions: BTreeMap<String, Version>,
}

impl Resource {
    /// An empty Resource, before its first Version is added.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            meta: Meta::default(),
            versions: BTreeMap::new(),
        }
    }

    pub fn default_version(&self) -> Option<&Version> {
        self.versions.get(&self.meta.default_version_id)
    }

    pub fn stamps(&self) -> Vec<VersionStamp> {
        self.versions.values().map(Version::stamp).collect()
    }

    pub fn ancestors(&self) -> BTreeMap<String, Ancestor> {
        self.versions
            .iter()
            .map(|(id, version)| (id.clone(), version.ancestor.clone()))
            .collect()
    }

    /// An existing Version whose id equals `id` ignoring case.
    pub fn version_ignoring_case(&self, id: &str) -> Option<&Version> {
        self.versions
            .values()
            .find(|version| version.id.eq_ignore_ascii_case(id))
    }

    /// Remove Versions and re-root their children. Returns the re-rooted ids.
    pub fn remove_versions(&mut self, ids: &[String]) -> Vec<String> {
        for id in ids {
            self.versions.remove(id);
        }
        let mut ancestors = self.ancestors();
        let rerooted = reroot_orphans(&mut ancestors, ids);
        for id in &rerooted {
            if let Some(version) = self.versions.get_mut(id) {
                version.ancestor = Ancestor::Root;
            }
        }
        rerooted
    }

    /// Smallest positive integer not already used as a Version id.
    pub fn next_version_id(&self) -> String {
        let mut candidate = self.versions.len() + 1;
        loop {
            let id = candidate.to_string();
            if self.version_ignoring_case(&id).is_none() {
                return id;
            }
            candidate += 1;
        }
    }
}

/// Document bodies are persisted as base64 text.
mod document_encoding {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|text| STANDARD.decode(text).map_err(serde::de::Error::custom))
            .transpose()
    }
}
