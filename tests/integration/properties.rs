//! Property-based tests for default-version resolution, timestamp
//! normalization and reference validation.
//!
//! Uses proptest for generating Version sets, write sequences and
//! timestamps with automatic shrinking.

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use proptest::prelude::*;
use xregistry_server::schema::{GroupModel, Model, ResourceModel, VersioningPolicy};
use xregistry_server::topology::TopologySnapshot;
use xregistry_server::validation::{normalize_timestamp, parse_timestamp};
use xregistry_server::{
    DefaultHint, DefaultPointer, DefaultVersionResolver, VersionChange, VersionStamp,
    XidValidator,
};

const SUBJECT: &str = "/dirs/d1/files/f1";

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn policy(max_versions: usize) -> VersioningPolicy {
    VersioningPolicy {
        max_versions,
        sticky_allowed: true,
    }
}

/// Reference ordering, written independently of the resolver.
fn expected_newest(stamps: &[VersionStamp]) -> Option<String> {
    stamps
        .iter()
        .max_by_key(|stamp| (stamp.created_at, stamp.id.to_ascii_lowercase()))
        .map(|stamp| stamp.id.clone())
}

prop_compose! {
    /// Distinct ids (mixed case, unique ignoring case) over a handful of
    /// timestamps so ties are common.
    fn stamps_strategy()
        (numbers in prop::collection::btree_set(0u32..1000, 1..15))
        (offsets in prop::collection::vec(0i64..4, numbers.len()), numbers in Just(numbers))
        -> Vec<VersionStamp> {
        numbers
            .into_iter()
            .zip(offsets)
            .map(|(n, offset)| {
                let id = if n % 3 == 0 { format!("V{}", n) } else { format!("v{}", n) };
                VersionStamp::new(id, base() + Duration::seconds(offset))
            })
            .collect()
    }
}

proptest! {
    #[test]
    fn prop_floating_default_is_newest(stamps in stamps_strategy()) {
        let resolver = DefaultVersionResolver::new(policy(0), SUBJECT);
        let last = stamps.last().map(|stamp| stamp.id.clone()).unwrap();
        let change = VersionChange::Upserted { processed: vec![last], hint: None };

        let resolution = resolver.resolve(&DefaultPointer::Floating, &stamps, &change).unwrap();
        prop_assert_eq!(resolution.default_version_id, expected_newest(&stamps));
        prop_assert!(!resolution.pointer.is_sticky());
        prop_assert!(resolution.evicted.is_empty());
    }

    #[test]
    fn prop_eviction_keeps_bound_and_default(
        max in 1usize..5,
        writes in prop::collection::vec((any::<bool>(), any::<u8>()), 1..30),
    ) {
        let resolver = DefaultVersionResolver::new(policy(max), SUBJECT);
        let mut live: Vec<VersionStamp> = Vec::new();
        let mut pointer = DefaultPointer::Floating;

        for (i, (pin, pick)) in writes.into_iter().enumerate() {
            let id = format!("v{}", i);
            live.push(VersionStamp::new(id.clone(), base() + Duration::seconds(i as i64 / 2)));
            let hint = pin.then(|| DefaultHint::Set(live[pick as usize % live.len()].id.clone()));
            let change = VersionChange::Upserted { processed: vec![id], hint };

            let resolution = resolver.resolve(&pointer, &live, &change).unwrap();
            live.retain(|stamp| !resolution.evicted.contains(&stamp.id));
            let default = resolution.default_version_id.clone().unwrap();

            prop_assert!(live.len() <= max);
            prop_assert!(live.iter().any(|stamp| stamp.id == default));
            match &resolution.pointer {
                DefaultPointer::Pinned(id) => prop_assert_eq!(id, &default),
                DefaultPointer::Floating => prop_assert_eq!(Some(default), expected_newest(&live)),
            }
            pointer = resolution.pointer;
        }
    }

    #[test]
    fn prop_deletion_leaves_one_live_default(
        stamps in stamps_strategy(),
        mask in prop::collection::vec(any::<bool>(), 15),
        pin in any::<prop::sample::Index>(),
    ) {
        let resolver = DefaultVersionResolver::new(policy(0), SUBJECT);
        let pinned = DefaultPointer::Pinned(pin.get(&stamps).id.clone());
        let deleted: Vec<String> = stamps
            .iter()
            .zip(&mask)
            .filter(|(_, delete)| **delete)
            .map(|(stamp, _)| stamp.id.clone())
            .collect();
        let remaining: Vec<VersionStamp> = stamps
            .iter()
            .filter(|stamp| !deleted.contains(&stamp.id))
            .cloned()
            .collect();

        for current in [DefaultPointer::Floating, pinned] {
            let change = VersionChange::Deleted { deleted: deleted.clone(), next_default: None };
            let resolution = resolver.resolve(&current, &stamps, &change).unwrap();
            if remaining.is_empty() {
                prop_assert!(resolution.resource_deleted());
                continue;
            }
            let default = resolution.default_version_id.clone().unwrap();
            prop_assert!(remaining.iter().any(|stamp| stamp.id == default));
            if !resolution.sticky() {
                prop_assert_eq!(Some(default), expected_newest(&remaining));
            }
        }
    }

    #[test]
    fn prop_timestamp_normalization_is_idempotent(
        secs in 0i64..4_000_000_000,
        quarter_hours in -48i32..=56,
        millis in prop::option::of(0u32..1000),
    ) {
        let offset = FixedOffset::east_opt(quarter_hours * 15 * 60).unwrap();
        let nanos = millis.unwrap_or(0) * 1_000_000;
        let instant = offset.timestamp_opt(secs, nanos).unwrap();

        let normalized = normalize_timestamp(&instant.to_rfc3339()).unwrap();
        prop_assert!(normalized.ends_with('Z'));
        prop_assert_eq!(normalize_timestamp(&normalized), Some(normalized.clone()));
        prop_assert_eq!(parse_timestamp(&normalized), Some(instant.with_timezone(&Utc)));
    }

    #[test]
    fn prop_valid_xids_resolve(
        group_id in "[a-zA-Z0-9_][a-zA-Z0-9_.~:@-]{0,30}",
        file_id in "[a-zA-Z0-9_][a-zA-Z0-9_.~:@-]{0,30}",
    ) {
        let model = Model::default().with_group(
            GroupModel::new("dirs", "dir").with_resource(ResourceModel::new("files", "file")),
        );
        let mut topology = TopologySnapshot::new();
        topology.add_resource(
            xregistry_server::entity::ResourceKey::new("dirs", &group_id, "files", &file_id),
            ["1"],
        );
        let xids = XidValidator::new(&model, &topology);

        let group_xid = format!("/dirs/{}", group_id);
        let version_xid = format!("/dirs/{}/files/{}/versions/1", group_id, file_id);
        prop_assert!(xids.validate_xid("p", &group_xid, Some("/dirs"), "/").is_ok());
        prop_assert!(xids.validate_xid("p", &version_xid, None, "/").is_ok());
        prop_assert!(xids
            .validate_xid("p", &version_xid, Some("/dirs/files[/versions]"), "/")
            .is_ok());
    }
}
