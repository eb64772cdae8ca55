//! Registry models and their attribute declarations.
//!
//! A [`Model`] declares the Group and Resource types of a registry and the
//! attributes of every entity level. Models are loaded from JSON documents
//! with [`Model::from_json`], which validates the document against a
//! built-in model schema before verifying it structurally.
//!
//! # Key Types
//!
//! - [`Model`] - registry-level attributes plus Group types
//! - [`GroupModel`] / [`ResourceModel`] - type declarations and versioning policy
//! - [`Attribute`] - a single typed attribute declaration
//! - [`EntityLevel`] - selects the attribute set for one entity level
//!
//! # Examples
//!
//! ```rust
//! use serde_json::json;
//! use xregistry_server::schema::Model;
//!
//! let model = Model::from_json(&json!({
//!     "groups": {
//!         "dirs": {
//!             "plural": "dirs",
//!             "singular": "dir",
//!             "resources": {
//!                 "files": { "plural": "files", "singular": "file", "maxversions": 2 }
//!             }
//!         }
//!     }
//! }))
//! .unwrap();
//! assert_eq!(model.resource("dirs", "files").unwrap().policy().max_versions, 2);
//! ```

pub mod embedded;
pub mod model;
pub mod types;


pub use model::EntityLevel;
pub use types::{
    Attribute, AttributeType, Attributes, GroupModel, IfValue, Item, Model, NameCharSet,
    ResourceModel, TypeSpec, VersioningPolicy, attributes,
};
