//! End-to-end lifecycle of Groups, Resources, Versions and Meta.

use super::{assert_error_kind, file, seeded_registry, version_at};
use crate::common::builders::ModelBuilder;
use crate::common::fixtures::{BASE_URL, registry_with};
use serde_json::json;
use xregistry_server::entity::{GroupKey, ResourceKey};
use xregistry_server::{ErrorKind, LevelPath, WriteOptions};

#[tokio::test]
async fn test_full_lifecycle() {
    let registry = seeded_registry().await;
    let key = file("f1");

    let created = registry
        .upsert_resource(&key, json!({"name": "config", "description": "first"}), WriteOptions::replace())
        .await
        .unwrap();
    assert!(created.is_new);
    assert_eq!(created.entity["self"], format!("{}/dirs/d1/files/f1", BASE_URL));
    assert_eq!(created.entity["versionsurl"], format!("{}/dirs/d1/files/f1/versions", BASE_URL));
    assert_eq!(created.entity["epoch"], 1);

    let v2 = registry
        .create_version(&key, json!({"name": "config", "description": "second"}), WriteOptions::replace())
        .await
        .unwrap();
    assert_eq!(v2.entity["versionid"], "2");
    assert_eq!(v2.entity["ancestor"], "1");
    assert_eq!(
        v2.entity["self"],
        format!("{}/dirs/d1/files/f1/versions/2", BASE_URL)
    );

    let resource = registry.get_resource(&key).await.unwrap();
    assert_eq!(resource["versionid"], "2");
    assert_eq!(resource["versionscount"], 2);

    let group = registry.get_group("dirs", "d1").await.unwrap();
    assert_eq!(group["filescount"], 1);
    assert_eq!(group["schemascount"], 0);

    let root = registry.get_registry().await.unwrap();
    assert_eq!(root["dirscount"], 1);

    registry.delete_resource(&key, None).await.unwrap();
    assert_error_kind!(registry.get_resource(&key).await, ErrorKind::NotFound);
    assert_error_kind!(registry.get_meta(&key).await, ErrorKind::NotFound);

    registry.delete_group("dirs", "d1", None).await.unwrap();
    assert!(registry.list_groups("dirs").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_version_epochs_and_merge() {
    let registry = seeded_registry().await;
    let key = file("f1");
    registry
        .upsert_version(&key, "v1", json!({"name": "a", "labels": {"env": "dev"}}), WriteOptions::replace())
        .await
        .unwrap();

    let result = registry
        .upsert_version(&key, "v1", json!({"epoch": 5}), WriteOptions::merge())
        .await;
    assert_error_kind!(result, ErrorKind::MismatchedEpoch);

    let merged = registry
        .upsert_version(
            &key,
            "v1",
            json!({"epoch": 1, "labels": {"env": "prod"}}),
            WriteOptions::merge(),
        )
        .await
        .unwrap();
    assert_eq!(merged.entity["epoch"], 2);
    assert_eq!(merged.entity["name"], "a");
    assert_eq!(merged.entity["labels"], json!({"env": "prod"}));

    let replaced = registry
        .upsert_version(&key, "v1", json!({}), WriteOptions::replace())
        .await
        .unwrap();
    assert!(replaced.entity.get("name").is_none());
    assert_eq!(replaced.entity["createdat"], merged.entity["createdat"]);
}

#[tokio::test]
async fn test_version_body_id_must_match_path() {
    let registry = seeded_registry().await;
    let result = registry
        .upsert_version(&file("f1"), "v1", json!({"versionid": "v2"}), WriteOptions::replace())
        .await;
    assert_error_kind!(result, ErrorKind::MismatchedId);

    let result = registry
        .upsert_version(&file("f1"), "v1", json!({"fileid": "f2"}), WriteOptions::replace())
        .await;
    assert_error_kind!(result, ErrorKind::MismatchedId);
}

#[tokio::test]
async fn test_create_resource_generates_ids() {
    let registry = seeded_registry().await;
    let group = GroupKey::new("dirs", "d1");

    let named = registry
        .create_resource(&group, "files", json!({"fileid": "named"}), WriteOptions::replace())
        .await
        .unwrap();
    assert_eq!(named.entity["fileid"], "named");

    let generated = registry
        .create_resource(&group, "files", json!({}), WriteOptions::replace())
        .await
        .unwrap();
    let id = generated.entity["fileid"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());

    assert_eq!(registry.list_resources(&group, "files").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_resource_ids_are_unique_ignoring_case() {
    let registry = seeded_registry().await;
    registry
        .upsert_resource(&file("f1"), json!({}), WriteOptions::replace())
        .await
        .unwrap();
    let result = registry
        .upsert_resource(&file("F1"), json!({}), WriteOptions::replace())
        .await;
    assert_error_kind!(result, ErrorKind::BadRequest);
}

#[tokio::test]
async fn test_server_assigned_version_ids_only() {
    let model = ModelBuilder::new()
        .group("dirs", "dir")
        .resource_with("dirs", "files", "file", json!({"setversionid": false}))
        .build();
    let registry = registry_with(model).await;
    registry
        .upsert_group("dirs", Some("d1"), json!({}), WriteOptions::replace())
        .await
        .unwrap();
    let key = file("f1");

    let outcome = registry
        .create_version(&key, json!({}), WriteOptions::replace())
        .await
        .unwrap();
    assert_eq!(outcome.entity["versionid"], "1");

    let err = registry
        .create_version(&key, json!({"versionid": "mine"}), WriteOptions::replace())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert_eq!(err.title(), "Resource \"files\" doesn't allow \"versionid\" to be set.");
}

#[tokio::test]
async fn test_sticky_not_allowed() {
    let model = ModelBuilder::new()
        .group("dirs", "dir")
        .resource_with("dirs", "files", "file", json!({"setdefaultversionsticky": false}))
        .build();
    let registry = registry_with(model).await;
    registry
        .upsert_group("dirs", Some("d1"), json!({}), WriteOptions::replace())
        .await
        .unwrap();
    let key = file("f1");
    registry
        .upsert_version(&key, "v1", json!({}), WriteOptions::replace())
        .await
        .unwrap();

    let result = registry
        .set_default_version(&key, xregistry_server::DefaultHint::Set("v1".to_string()))
        .await;
    assert_error_kind!(result, ErrorKind::BadRequest);
}

#[tokio::test]
async fn test_meta_lifecycle_flags() {
    let registry = seeded_registry().await;
    let key = file("f1");
    registry
        .upsert_version(&key, "v1", version_at("v1", 1), WriteOptions::replace())
        .await
        .unwrap();

    let outcome = registry
        .update_meta(
            &key,
            json!({"deprecated": {"effective": "2030-01-01T00:00:00Z"}}),
            WriteOptions::merge(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.entity["deprecated"]["effective"], "2030-01-01T00:00:00Z");
    assert_eq!(outcome.entity["epoch"], 2);

    let result = registry
        .update_meta(&key, json!({"epoch": 1, "compatibility": "full"}), WriteOptions::merge())
        .await;
    assert_error_kind!(result, ErrorKind::MismatchedEpoch);
}

#[tokio::test]
async fn test_validate_entity_resolves_levels() {
    let registry = seeded_registry().await;
    let result = registry
        .validate_entity(&LevelPath::version("dirs", "nope"), "/dirs/d1/nope/x/versions/1", &json!({}))
        .await;
    assert_error_kind!(result, ErrorKind::NotFound);

    let result = registry
        .validate_entity(
            &LevelPath::version("dirs", "files"),
            "/dirs/d1/files/f1/versions/1",
            &json!({"fileid": "f1", "versionid": "1", "ancestor": "1"}),
        )
        .await;
    assert_error_kind!(result, ErrorKind::RequiredAttributeMissing);

    let normalized = registry
        .validate_entity(
            &LevelPath::version("dirs", "files"),
            "/dirs/d1/files/f1/versions/1",
            &json!({
                "fileid": "f1",
                "versionid": "1",
                "ancestor": "1",
                "createdat": "2024-01-01T00:00:00Z",
                "modifiedat": "2024-01-01T02:00:00+02:00"
            }),
        )
        .await
        .unwrap();
    assert_eq!(normalized["modifiedat"], "2024-01-01T00:00:00Z");
}

#[tokio::test]
async fn test_unknown_types_are_not_found() {
    let registry = seeded_registry().await;
    let key = ResourceKey::new("dirs", "d1", "things", "t1");
    assert_error_kind!(registry.get_resource(&key).await, ErrorKind::NotFound);
    assert_error_kind!(registry.get_group("folders", "x").await, ErrorKind::NotFound);
    assert_error_kind!(
        registry.get_version(&file("f1"), "v1").await,
        ErrorKind::NotFound
    );
}
