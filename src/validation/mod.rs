//! Attribute and reference validation.
//!
//! # Key Types
//!
//! - [`Validator`] - recursive type checker and normalizer for entity data
//! - [`XidValidator`] - structural and existence checks for `xid`/`xidtype`
//! - [`EntityContext`] - stored state and path ids for one validation call
//!
//! # Examples
//!
//! ```rust
//! use serde_json::json;
//! use xregistry_server::schema::{EntityLevel, Model};
//! use xregistry_server::topology::TopologySnapshot;
//! use xregistry_server::validation::{EntityContext, Validator};
//!
//! let model = Model::default();
//! let topology = TopologySnapshot::new();
//! let validator = Validator::new(&model, &topology);
//!
//! let result = validator.validate_entity(
//!     &EntityLevel::Registry,
//!     "/",
//!     &json!({"registryid": "reg", "badattr1": 1, "badattr2": 2}),
//!     &EntityContext::new(),
//! );
//! let err = result.unwrap_err();
//! assert_eq!(err.arg("list"), Some("badattr1,badattr2"));
//! ```

pub mod attributes;
pub mod names;
pub mod timestamp;
pub mod xid;


pub use attributes::{EntityContext, Validator, WILDCARD, value_has_shape};
pub use names::{ID_PATTERN, cmp_ignore_case, id_problem, is_valid_id, is_valid_name};
pub use timestamp::{format_timestamp, normalize_timestamp, parse_timestamp};
pub use xid::{TargetVersions, XidTarget, XidValidator};
