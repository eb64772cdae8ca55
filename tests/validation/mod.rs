//! Validation tests.
//!
//! Attribute validation observed through registry writes, plus model
//! document self-validation.

pub mod attribute_types;
pub mod model_documents;
pub mod references;

pub use crate::common::fixtures::{empty_registry, seeded_registry, standard_model};
pub use crate::{assert_error_kind, assert_error_title_contains};
