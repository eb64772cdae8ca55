//! Grammar checks for entity ids, attribute names and map keys.
//!
//! Patterns are compile-time constants, compiled once on first use and
//! shared across requests.

use crate::schema::NameCharSet;
use regex::Regex;
use std::sync::OnceLock;

/// Grammar every `*id` value must satisfy.
pub const ID_PATTERN: &str = r"^[a-zA-Z0-9_][a-zA-Z0-9_.\-~:@]{0,127}$";

/// Attribute names under the `strict` charset.
pub const STRICT_NAME_PATTERN: &str = r"^[a-z_][a-z_0-9]{0,62}$";

/// Attribute names under the `extended` charset, and all map keys.
pub const EXTENDED_NAME_PATTERN: &str = r"^[a-z0-9][a-z0-9_.:\-]{0,62}$";

fn id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ID_PATTERN).expect("id regex must compile"))
}

fn strict_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(STRICT_NAME_PATTERN).expect("strict name regex must compile"))
}

fn extended_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(EXTENDED_NAME_PATTERN).expect("extended name regex must compile"))
}

/// Whether `id` is a syntactically valid entity id.
pub fn is_valid_id(id: &str) -> bool {
    id_regex().is_match(id)
}

/// Describe why `id` is not a valid id, or `None` when it is.
pub fn id_problem(id: &str) -> Option<String> {
    if is_valid_id(id) {
        None
    } else {
        Some(format!("Invalid ID \"{}\", must match \"{}\"", id, ID_PATTERN))
    }
}

/// Pattern text for a charset, used in error messages.
pub fn name_pattern(charset: NameCharSet) -> &'static str {
    match charset {
        NameCharSet::Strict => STRICT_NAME_PATTERN,
        NameCharSet::Extended => EXTENDED_NAME_PATTERN,
    }
}

/// Whether `name` is a valid attribute name under `charset`.
pub fn is_valid_name(name: &str, charset: NameCharSet) -> bool {
    match charset {
        NameCharSet::Strict => strict_regex().is_match(name),
        NameCharSet::Extended => extended_regex().is_match(name),
    }
}

/// Map keys always use the extended grammar.
pub fn is_valid_map_key(key: &str) -> bool {
    extended_regex().is_match(key)
}

/// Message for an attribute name rejected at `location`.
pub fn invalid_name_message(name: &str, location: &str, charset: NameCharSet) -> String {
    if location.is_empty() {
        format!(
            "Invalid attribute name \"{}\", must match \"{}\"",
            name,
            name_pattern(charset)
        )
    } else {
        format!(
            "Invalid attribute name \"{}\" at \"{}\", must match \"{}\"",
            name,
            location,
            name_pattern(charset)
        )
    }
}

/// Byte-wise, ASCII case-insensitive comparison used for version ordering
/// and id uniqueness.
pub fn cmp_ignore_case(a: &str, b: &str) -> std::cmp::Ordering {
    a.bytes()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
}
