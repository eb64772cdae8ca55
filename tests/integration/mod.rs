//! Integration tests for registry behavior spanning several calls.
//!
//! ## Test Organization
//!
//! - `default_version` - floating and pinned defaults, `request` hints,
//!   deletion fallbacks
//! - `eviction` - `maxversions` retention with and without a pinned default
//! - `lifecycle` - create, read, update and delete across every level
//! - `concurrency` - many writers racing on one registry
//! - `properties` - proptest checks of the resolver laws

pub mod concurrency;
pub mod default_version;
pub mod lifecycle;
pub mod properties;

pub use crate::common::fixtures::{
    default_ids, file, schema, seeded_registry, version_at, version_ids,
};
pub use crate::{assert_error_kind, assert_error_title_contains};
