//! Version bookkeeping for Resources.
//!
//! - [`DefaultVersionResolver`] keeps exactly one default Version per
//!   Resource and evicts Versions beyond `maxversions`
//! - [`Ancestor`] and [`lineage`] describe how Versions derive from each other

pub mod ancestor;
pub mod resolver;


pub use ancestor::{Ancestor, check_ancestors, lineage, reroot_orphans};
pub use resolver::{
    DefaultHint, DefaultPointer, DefaultVersionResolver, Resolution, VersionChange, VersionStamp,
    newest, version_order,
};
