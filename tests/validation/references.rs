//! `xid` and `xidtype` attributes stored on the Registry.

use super::{assert_error_kind, assert_error_title_contains, seeded_registry};
use crate::common::fixtures::file;
use serde_json::json;
use xregistry_server::{ErrorKind, WriteOptions};

#[tokio::test]
async fn test_group_pointer_requires_an_id() {
    let registry = seeded_registry().await;

    let err = registry
        .update_registry(json!({"regptr_group": "/dirs"}), WriteOptions::merge())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidAttributes);
    assert_eq!(
        err.title(),
        "Attribute \"regptr_group\" must match \"/dirs\" target, \"/dirs\" is missing \"dirid\"."
    );

    let outcome = registry
        .update_registry(json!({"regptr_group": "/dirs/d1"}), WriteOptions::merge())
        .await
        .unwrap();
    assert_eq!(outcome.entity["regptr_group"], "/dirs/d1");

    let stored = registry.get_registry().await.unwrap();
    assert_eq!(stored["regptr_group"], "/dirs/d1");
}

#[tokio::test]
async fn test_pointer_to_missing_entity() {
    let registry = seeded_registry().await;
    let result = registry
        .update_registry(json!({"regptr_group": "/dirs/d2"}), WriteOptions::merge())
        .await;
    assert_error_kind!(result, ErrorKind::UnknownId);

    let result = registry
        .update_registry(json!({"regptr_file": "/dirs/d1/files/f1"}), WriteOptions::merge())
        .await;
    assert_error_title_contains!(result, "\"file\" with a \"fileid\" value of \"f1\"");
}

#[tokio::test]
async fn test_file_pointer_with_optional_versions() {
    let registry = seeded_registry().await;
    registry
        .upsert_version(&file("f1"), "v1", json!({}), WriteOptions::replace())
        .await
        .unwrap();

    for value in ["/dirs/d1/files/f1", "/dirs/d1/files/f1/versions/v1"] {
        registry
            .update_registry(json!({ "regptr_file": value }), WriteOptions::merge())
            .await
            .unwrap_or_else(|e| panic!("{} rejected: {}", value, e));
    }

    let result = registry
        .update_registry(
            json!({"regptr_file": "/dirs/d1/files/f1/versions/v1/extra"}),
            WriteOptions::merge(),
        )
        .await;
    assert_error_title_contains!(result, "extra stuff after \"v1\"");

    let result = registry
        .update_registry(json!({"regptr_file": "/dirs/d1/schemas/s1"}), WriteOptions::merge())
        .await;
    assert_error_title_contains!(result, "must match \"/dirs/files[/versions]\" target");
}

#[tokio::test]
async fn test_untargeted_pointer() {
    let registry = seeded_registry().await;
    registry
        .update_registry(json!({"regptr_any": "/dirs/d1"}), WriteOptions::merge())
        .await
        .unwrap();
    registry
        .update_registry(json!({"regptr_any": "/"}), WriteOptions::merge())
        .await
        .unwrap();

    let result = registry
        .update_registry(json!({"regptr_any": "/folders/f"}), WriteOptions::merge())
        .await;
    assert_error_title_contains!(result, "unknown Group type \"folders\"");

    let result = registry
        .update_registry(json!({"regptr_any": "/dirs"}), WriteOptions::merge())
        .await;
    assert_error_title_contains!(result, "\"/dirs\" is missing \"dirid\"");

    let result = registry
        .update_registry(json!({"regptr_any": "/dirs/bad id"}), WriteOptions::merge())
        .await;
    assert_error_title_contains!(result, "the \"dir\" ID is not valid");
}

#[tokio::test]
async fn test_xidtype_values() {
    let registry = seeded_registry().await;
    for value in ["/", "/dirs", "/dirs/files", "/dirs/files/versions", "/dirs/schemas/meta"] {
        registry
            .update_registry(json!({ "regtype": value }), WriteOptions::merge())
            .await
            .unwrap_or_else(|e| panic!("{} rejected: {}", value, e));
    }

    let result = registry
        .update_registry(json!({"regtype": "/dirs/d1"}), WriteOptions::merge())
        .await;
    assert_error_title_contains!(result, "unknown Resource type \"d1\"");

    let result = registry
        .update_registry(json!({"regtype": "/dirs/files/versions/v1"}), WriteOptions::merge())
        .await;
    assert_error_title_contains!(result, "is too long");
}

#[tokio::test]
async fn test_stored_pointer_survives_other_updates() {
    let registry = seeded_registry().await;
    registry
        .update_registry(json!({"regptr_group": "/dirs/d1"}), WriteOptions::merge())
        .await
        .unwrap();

    // Other registry updates keep validating the stored pointer.
    let outcome = registry
        .update_registry(json!({"regstring": "x"}), WriteOptions::merge())
        .await
        .unwrap();
    assert_eq!(outcome.entity["regptr_group"], "/dirs/d1");
}
