//! Ready-made models, registries and request bodies.

use super::builders::ModelBuilder;
use super::init_logging;
use serde_json::{Value, json};
use xregistry_server::entity::ResourceKey;
use xregistry_server::storage::InMemoryStorage;
use xregistry_server::{Registry, RegistryBuilder, WriteOptions};

pub const BASE_URL: &str = "https://registry.example.com";

/// A model with one Group type, two Resource types and a Registry-level
/// attribute of every type.
pub fn standard_model() -> Value {
    ModelBuilder::new()
        .attribute("regstring", json!({"type": "string"}))
        .attribute("regint", json!({"type": "integer"}))
        .attribute("reguint", json!({"type": "uinteger"}))
        .attribute("regbool", json!({"type": "boolean"}))
        .attribute("regdec", json!({"type": "decimal"}))
        .attribute("regtimestamp", json!({"type": "timestamp"}))
        .attribute("regurl", json!({"type": "url"}))
        .attribute("regarrayint", json!({"type": "array", "item": {"type": "integer"}}))
        .attribute("regmapstring", json!({"type": "map", "item": {"type": "string"}}))
        .attribute(
            "regobj",
            json!({
                "type": "object",
                "attributes": {
                    "sub": {"name": "sub", "type": "string", "required": true}
                }
            }),
        )
        .attribute("regenum", json!({"type": "string", "enum": ["red", "blue"]}))
        .attribute("regptr_group", json!({"type": "xid", "target": "/dirs"}))
        .attribute(
            "regptr_file",
            json!({"type": "xid", "target": "/dirs/files[/versions]"}),
        )
        .attribute("regptr_any", json!({"type": "xid"}))
        .attribute("regtype", json!({"type": "xidtype"}))
        .group("dirs", "dir")
        .group_attribute("dirs", "color", json!({"type": "string"}))
        .resource("dirs", "files", "file")
        .resource_with("dirs", "schemas", "schema", json!({"maxversions": 2}))
        .build()
}

/// A registry with [`standard_model`] installed and no Groups.
pub async fn empty_registry() -> Registry<InMemoryStorage> {
    registry_with(standard_model()).await
}

pub async fn registry_with(model: Value) -> Registry<InMemoryStorage> {
    init_logging();
    RegistryBuilder::new(InMemoryStorage::new())
        .with_base_url(BASE_URL)
        .with_model(model)
        .build()
        .await
        .expect("registry should build")
}

/// A registry with [`standard_model`] and Group `/dirs/d1`.
pub async fn seeded_registry() -> Registry<InMemoryStorage> {
    let registry = empty_registry().await;
    registry
        .upsert_group("dirs", Some("d1"), json!({}), WriteOptions::replace())
        .await
        .expect("group d1");
    registry
}

pub fn file(id: &str) -> ResourceKey {
    ResourceKey::new("dirs", "d1", "files", id)
}

pub fn schema(id: &str) -> ResourceKey {
    ResourceKey::new("dirs", "d1", "schemas", id)
}

/// A Version body created `second` seconds into 2024.
pub fn version_at(id: &str, second: u32) -> Value {
    json!({
        "versionid": id,
        "createdat": format!("2024-01-01T00:{:02}:{:02}Z", second / 60, second % 60)
    })
}

/// Ids of the Versions a listing returned, in listing order.
pub fn version_ids(versions: &[Value]) -> Vec<String> {
    versions
        .iter()
        .filter_map(|version| version["versionid"].as_str())
        .map(str::to_string)
        .collect()
}

/// Ids of the Versions currently flagged `isdefault`.
pub fn default_ids(versions: &[Value]) -> Vec<String> {
    versions
        .iter()
        .filter(|version| version["isdefault"] == true)
        .filter_map(|version| version["versionid"].as_str())
        .map(str::to_string)
        .collect()
}
