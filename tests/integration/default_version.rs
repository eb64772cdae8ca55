//! Default Version selection through the registry API.

use super::{
    assert_error_kind, assert_error_title_contains, default_ids, file, seeded_registry, version_at,
};
use serde_json::json;
use xregistry_server::{DefaultHint, ErrorKind, WriteOptions};

#[tokio::test]
async fn test_equal_timestamps_order_by_id_ignoring_case() {
    let registry = seeded_registry().await;
    let key = file("f1");

    for id in ["z5", "v2", "V3", "V1", "Z1", "v9", "v5"] {
        let second = match id {
            "V3" => 10,
            "V1" => 30,
            _ => 20,
        };
        registry
            .upsert_version(&key, id, version_at(id, second), WriteOptions::replace())
            .await
            .unwrap();
    }
    let meta = registry.get_meta(&key).await.unwrap();
    assert_eq!(meta["defaultversionid"], "V1");
    assert_eq!(meta["defaultversionsticky"], false);

    let resource_deleted = registry.delete_version(&key, "V1", None, None).await.unwrap();
    assert!(!resource_deleted);
    let meta = registry.get_meta(&key).await.unwrap();
    assert_eq!(meta["defaultversionid"], "z5");

    let versions = registry.list_versions(&key).await.unwrap();
    assert_eq!(default_ids(&versions), vec!["z5".to_string()]);
}

#[tokio::test]
async fn test_request_hint_pins_the_processed_version() {
    let registry = seeded_registry().await;
    let key = file("f1");
    for (id, second) in [("v1", 10), ("v2", 20)] {
        registry
            .upsert_version(&key, id, version_at(id, second), WriteOptions::replace())
            .await
            .unwrap();
    }

    let outcome = registry
        .create_version(
            &key,
            version_at("v3", 5),
            WriteOptions::replace().with_default_version(DefaultHint::Request),
        )
        .await
        .unwrap();
    assert_eq!(outcome.entity["versionid"], "v3");
    assert_eq!(outcome.entity["isdefault"], true);

    let result = registry.set_default_version(&key, DefaultHint::Request).await;
    assert_error_kind!(result, ErrorKind::BadRequest);
    let result = registry.set_default_version(&key, DefaultHint::Request).await;
    assert_error_title_contains!(result, "Can't use 'request' if a version wasn't processed");
}

#[tokio::test]
async fn test_pin_and_unstick() {
    let registry = seeded_registry().await;
    let key = file("f1");
    for (id, second) in [("v1", 1), ("v2", 2)] {
        registry
            .upsert_version(&key, id, version_at(id, second), WriteOptions::replace())
            .await
            .unwrap();
    }

    let pinned = registry
        .set_default_version(&key, DefaultHint::Set("v1".to_string()))
        .await
        .unwrap();
    assert_eq!(pinned.entity["defaultversionid"], "v1");
    assert_eq!(pinned.entity["defaultversionsticky"], true);

    // A newer Version does not move a pinned default.
    registry
        .upsert_version(&file("f1"), "v3", version_at("v3", 3), WriteOptions::replace())
        .await
        .unwrap();
    let resource = registry.get_resource(&key).await.unwrap();
    assert_eq!(resource["versionid"], "v1");

    let floating = registry.set_default_version(&key, DefaultHint::Unstick).await.unwrap();
    assert_eq!(floating.entity["defaultversionid"], "v3");
    assert_eq!(floating.entity["defaultversionsticky"], false);
}

#[tokio::test]
async fn test_unknown_pin_target() {
    let registry = seeded_registry().await;
    let key = file("f1");
    registry
        .upsert_version(&key, "v1", json!({}), WriteOptions::replace())
        .await
        .unwrap();
    let result = registry
        .set_default_version(&key, DefaultHint::Set("nope".to_string()))
        .await;
    assert_error_kind!(result, ErrorKind::UnknownId);

    let meta = registry.get_meta(&key).await.unwrap();
    assert_eq!(meta["defaultversionid"], "v1");
}

#[tokio::test]
async fn test_deleting_pinned_default_falls_back_to_newest() {
    let registry = seeded_registry().await;
    let key = file("f1");
    for (id, second) in [("v1", 1), ("v2", 2), ("v3", 3)] {
        registry
            .upsert_version(&key, id, version_at(id, second), WriteOptions::replace())
            .await
            .unwrap();
    }
    registry
        .set_default_version(&key, DefaultHint::Set("v2".to_string()))
        .await
        .unwrap();

    registry.delete_version(&key, "v2", None, None).await.unwrap();
    let meta = registry.get_meta(&key).await.unwrap();
    assert_eq!(meta["defaultversionid"], "v3");
    assert_eq!(meta["defaultversionsticky"], false);
}

#[tokio::test]
async fn test_delete_with_next_default() {
    let registry = seeded_registry().await;
    let key = file("f1");
    for (id, second) in [("v1", 1), ("v2", 2), ("v3", 3)] {
        registry
            .upsert_version(&key, id, version_at(id, second), WriteOptions::replace())
            .await
            .unwrap();
    }

    registry.delete_version(&key, "v3", Some("v1"), None).await.unwrap();
    let meta = registry.get_meta(&key).await.unwrap();
    assert_eq!(meta["defaultversionid"], "v1");
    assert_eq!(meta["defaultversionsticky"], true);

    let result = registry.delete_version(&key, "v2", Some("v9"), None).await;
    assert_error_kind!(result, ErrorKind::UnknownId);
}

#[tokio::test]
async fn test_meta_update_pins_current_default() {
    let registry = seeded_registry().await;
    let key = file("f1");
    for (id, second) in [("v1", 1), ("v2", 2)] {
        registry
            .upsert_version(&key, id, version_at(id, second), WriteOptions::replace())
            .await
            .unwrap();
    }

    let outcome = registry
        .update_meta(&key, json!({"defaultversionsticky": true}), WriteOptions::merge())
        .await
        .unwrap();
    assert_eq!(outcome.entity["defaultversionid"], "v2");
    assert_eq!(outcome.entity["defaultversionsticky"], true);

    registry
        .upsert_version(&key, "v3", version_at("v3", 3), WriteOptions::replace())
        .await
        .unwrap();
    let meta = registry.get_meta(&key).await.unwrap();
    assert_eq!(meta["defaultversionid"], "v2");
}

#[test]
fn test_hint_parsing() {
    assert_eq!(
        DefaultHint::parse("setdefaultversionid", "request").unwrap(),
        DefaultHint::Request
    );
    assert_eq!(
        DefaultHint::parse("setdefaultversionid", "v1").unwrap(),
        DefaultHint::Set("v1".to_string())
    );
    for raw in ["", "null"] {
        let err = DefaultHint::parse("setdefaultversionid", raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }
}
