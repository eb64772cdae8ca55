//! Attribute type validation through Registry updates.

use super::empty_registry;
use serde_json::{Value, json};
use xregistry_server::{ErrorKind, LevelPath, Registry, WriteOptions};
use xregistry_server::storage::InMemoryStorage;

async fn set(registry: &Registry<InMemoryStorage>, data: Value) -> Result<Value, xregistry_server::RegistryError> {
    registry
        .update_registry(data, WriteOptions::merge())
        .await
        .map(|outcome| outcome.entity)
}

async fn rejected(data: Value) -> xregistry_server::RegistryError {
    let registry = empty_registry().await;
    set(&registry, data).await.expect_err("update should be rejected")
}

#[tokio::test]
async fn test_scalar_mismatches() {
    let cases = [
        (json!({"regstring": 1}), "Attribute \"regstring\" must be a string."),
        (json!({"regint": "1"}), "Attribute \"regint\" must be an integer."),
        (json!({"regint": 1.5}), "Attribute \"regint\" must be an integer."),
        (json!({"reguint": -3}), "Attribute \"reguint\" must be a uinteger."),
        (json!({"regbool": "yes"}), "Attribute \"regbool\" must be a boolean."),
        (json!({"regdec": "2.5"}), "Attribute \"regdec\" must be a decimal."),
        (json!({"regurl": "example.com"}), "Attribute \"regurl\" must be a url."),
        (json!({"regobj": "x"}), "Attribute \"regobj\" must be an object."),
        (json!({"regmapstring": []}), "Attribute \"regmapstring\" must be a map."),
    ];
    for (data, title) in cases {
        let err = rejected(data.clone()).await;
        assert_eq!(err.kind(), ErrorKind::InvalidAttributes, "{}", data);
        assert_eq!(err.title(), title);
        assert_eq!(err.subject(), "/");
    }
}

#[tokio::test]
async fn test_accepted_values_are_normalized() {
    let registry = empty_registry().await;
    let entity = set(
        &registry,
        json!({
            "regint": 7.0,
            "reguint": 0,
            "regdec": 2.5,
            "regbool": false,
            "regtimestamp": "2024-03-01T09:00:00-05:00",
            "regarrayint": [1, 2, 3],
            "regmapstring": {"env": "prod", "team.a": "core"},
            "regobj": {"sub": "x"},
            "regenum": "red"
        }),
    )
    .await
    .unwrap();

    assert_eq!(entity["regint"], json!(7));
    assert_eq!(entity["regtimestamp"], "2024-03-01T14:00:00Z");
    assert_eq!(entity["regmapstring"]["team.a"], "core");
    assert_eq!(entity["regobj"], json!({"sub": "x"}));

    let stored = registry.get_registry().await.unwrap();
    assert_eq!(stored["regtimestamp"], "2024-03-01T14:00:00Z");
}

#[tokio::test]
async fn test_array_item_paths() {
    let err = rejected(json!({"regarrayint": [1, 2, "three"]})).await;
    assert_eq!(err.title(), "Attribute \"regarrayint[2]\" must be an integer.");
}

#[tokio::test]
async fn test_unknown_extensions_listed_together() {
    let err = rejected(json!({"badattr1": 1, "badattr2": 2, "regstring": "ok"})).await;
    assert_eq!(err.kind(), ErrorKind::InvalidAttributes);
    assert_eq!(err.arg("list"), Some("badattr1,badattr2"));
    assert_eq!(
        err.title(),
        "Unknown extension attribute(s) (badattr1,badattr2) specified for: /."
    );

    let err = rejected(json!({"regobj": {"sub": "x", "extra": true}})).await;
    assert_eq!(err.arg("list"), Some("regobj.extra"));
}

#[tokio::test]
async fn test_nested_required_attribute() {
    let err = rejected(json!({"regobj": {}})).await;
    assert_eq!(err.kind(), ErrorKind::RequiredAttributeMissing);
    assert_eq!(err.arg("list"), Some("regobj.sub"));
}

#[tokio::test]
async fn test_enum_values() {
    let err = rejected(json!({"regenum": "green"})).await;
    assert_eq!(
        err.title(),
        "Attribute \"regenum\" must be one of the enum values: red, blue."
    );
}

#[tokio::test]
async fn test_timestamps() {
    let err = rejected(json!({"regtimestamp": "not-a-time"})).await;
    assert_eq!(err.title(), "Attribute \"regtimestamp\" is a malformed timestamp.");

    let registry = empty_registry().await;
    let first = set(&registry, json!({"regtimestamp": "2024-01-01T00:00:00.500Z"}))
        .await
        .unwrap();
    let again = set(&registry, json!({"regtimestamp": first["regtimestamp"].clone()}))
        .await
        .unwrap();
    assert_eq!(first["regtimestamp"], again["regtimestamp"]);
}

#[tokio::test]
async fn test_map_keys() {
    let err = rejected(json!({"regmapstring": {"Bad Key": "x"}})).await;
    assert!(err.title().starts_with("Invalid map key name \"Bad Key\" in \"regmapstring\""));
}

#[tokio::test]
async fn test_readonly_system_attributes() {
    let registry = empty_registry().await;
    let data = json!({
        "registryid": "xregistry",
        "createdat": "2024-01-01T00:00:00Z",
        "modifiedat": "2024-01-01T00:00:00Z",
        "specversion": "9.9"
    });
    let err = registry
        .validate_entity(&LevelPath::Registry, "/", &data)
        .await
        .unwrap_err();
    assert_eq!(err.title(), "Attribute \"specversion\" is read-only.");

    // Computed attributes in a write body are ignored.
    let entity = set(&registry, json!({"specversion": "9.9", "self": "x"})).await.unwrap();
    assert_ne!(entity["specversion"], "9.9");
}

#[tokio::test]
async fn test_null_removes_attribute_on_merge() {
    let registry = empty_registry().await;
    set(&registry, json!({"regstring": "x"})).await.unwrap();
    let entity = set(&registry, json!({"regstring": null})).await.unwrap();
    assert!(entity.get("regstring").is_none());
}
