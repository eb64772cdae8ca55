//! Concurrent writers on a single registry.

use super::{default_ids, file, schema, seeded_registry};
use futures::future::join_all;
use serde_json::json;
use xregistry_server::validation::{cmp_ignore_case, parse_timestamp};
use xregistry_server::WriteOptions;

#[tokio::test]
async fn test_concurrent_version_creation() {
    let registry = seeded_registry().await;
    let key = file("f1");

    let writes = (0..10).map(|i| {
        registry.create_version(&key, json!({"name": format!("write-{}", i)}), WriteOptions::replace())
    });
    let results = join_all(writes).await;
    assert!(results.iter().all(Result::is_ok));

    let versions = registry.list_versions(&key).await.unwrap();
    assert_eq!(versions.len(), 10);

    let mut ids: Vec<String> = versions
        .iter()
        .map(|v| v["versionid"].as_str().unwrap().to_string())
        .collect();
    ids.sort_by_key(|id| id.parse::<u32>().unwrap());
    let expected: Vec<String> = (1..=10).map(|n| n.to_string()).collect();
    assert_eq!(ids, expected);

    let newest = versions
        .iter()
        .max_by(|a, b| {
            let created = |v: &serde_json::Value| parse_timestamp(v["createdat"].as_str().unwrap());
            created(a)
                .cmp(&created(b))
                .then_with(|| {
                    cmp_ignore_case(
                        a["versionid"].as_str().unwrap(),
                        b["versionid"].as_str().unwrap(),
                    )
                })
        })
        .unwrap();
    assert_eq!(default_ids(&versions), vec![newest["versionid"].as_str().unwrap().to_string()]);
}

#[tokio::test]
async fn test_concurrent_eviction_keeps_bound() {
    let registry = seeded_registry().await;
    let key = schema("s1");

    let writes = (0..8).map(|_| registry.create_version(&key, json!({}), WriteOptions::replace()));
    for result in join_all(writes).await {
        result.unwrap();
    }

    let versions = registry.list_versions(&key).await.unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(default_ids(&versions).len(), 1);
    let meta = registry.get_meta(&key).await.unwrap();
    assert!(versions.iter().any(|v| v["versionid"] == meta["defaultversionid"]));
}

#[tokio::test]
async fn test_concurrent_groups_and_epochs() {
    let registry = seeded_registry().await;

    let creates = (0..5).map(|i| {
        let id = format!("g{}", i);
        let registry = &registry;
        async move {
            registry
                .upsert_group("dirs", Some(id.as_str()), json!({}), WriteOptions::replace())
                .await
        }
    });
    for result in join_all(creates).await {
        assert!(result.unwrap().is_new);
    }
    assert_eq!(registry.list_groups("dirs").await.unwrap().len(), 6);

    // Racing updates that all claim epoch 1: exactly one wins.
    let updates = (0..4).map(|i| {
        registry.upsert_group(
            "dirs",
            Some("d1"),
            json!({"epoch": 1, "color": format!("c{}", i)}),
            WriteOptions::merge(),
        )
    });
    let results = join_all(updates).await;
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(registry.get_group("dirs", "d1").await.unwrap()["epoch"], 2);
}
