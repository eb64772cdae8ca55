//! Model uploads through `Registry::update_model`.

use super::{seeded_registry, standard_model};
use serde_json::{Value, json};
use xregistry_server::ErrorKind;

async fn expect_model_error(doc: Value, fragment: &str) {
    let registry = seeded_registry().await;
    let before = registry.model().await.generation();
    let err = registry.update_model(doc).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModelError, "{}", err);
    assert_eq!(err.subject(), "/model");
    assert!(
        err.title().contains(fragment),
        "expected {:?} in {:?}",
        fragment,
        err.title()
    );
    assert_eq!(registry.model().await.generation(), before);
}

#[tokio::test]
async fn test_structural_errors() {
    let mut doc = standard_model();
    doc["groups"]["dirs"]["resources"]["files"]["maxversions"] = json!(-2);
    expect_model_error(doc, "must be >= 0").await;

    let mut doc = standard_model();
    doc["groups"]["dirs"]["resources"]["files"]["maxversions"] = json!(1);
    expect_model_error(doc, "\"setdefaultversionsticky\"").await;

    let mut doc = standard_model();
    doc["attributes"]["regptr_group"]["target"] = json!("/folders");
    expect_model_error(doc, "unknown Group type \"folders\"").await;

    let mut doc = standard_model();
    doc["attributes"]["regptr_group"]["target"] = json!("dirs");
    expect_model_error(doc, "\"target\" must be of the form").await;

    let mut doc = standard_model();
    doc["attributes"]["regarrayint"] = json!({"type": "array"});
    expect_model_error(doc, "must have an \"item\" section").await;

    let mut doc = standard_model();
    doc["attributes"]["epoch"] = json!({"type": "string"});
    expect_model_error(doc, "must have a \"type\" of \"uinteger\"").await;

    let mut doc = standard_model();
    doc["attributes"]["Bad-Name"] = json!({"type": "string"});
    expect_model_error(doc, "Invalid attribute name \"Bad-Name\"").await;
}

#[tokio::test]
async fn test_document_shape_errors() {
    expect_model_error(json!({"groups": {}, "extra": 1}), "Unknown extension").await;
    expect_model_error(
        json!({"groups": {"dirs": {"singular": "dir"}}}),
        "mandatory attributes",
    )
    .await;
    expect_model_error(json!({"groups": []}), "must be a map").await;
}

#[tokio::test]
async fn test_model_round_trips() {
    let registry = seeded_registry().await;
    let current = registry.model().await;
    let installed = registry.update_model(current.to_json()).await.unwrap();
    assert_eq!(installed.generation(), current.generation() + 1);
    assert_eq!(installed.groups, current.groups);
    assert_eq!(installed.attributes, current.attributes);
}

#[tokio::test]
async fn test_new_required_attribute_needs_default() {
    let registry = seeded_registry().await;

    let mut doc = standard_model();
    doc["groups"]["dirs"]["attributes"]["owner"] =
        json!({"name": "owner", "type": "string", "required": true});
    let err = registry.update_model(doc.clone()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequiredAttributeMissing);
    assert_eq!(err.subject(), "/dirs/d1");

    doc["groups"]["dirs"]["attributes"]["owner"]["default"] = json!("nobody");
    registry.update_model(doc).await.unwrap();
    let group = registry.get_group("dirs", "d1").await.unwrap();
    assert_eq!(group["owner"], "nobody");
}
