//! Error types for registry operations.
//!
//! Every core operation reports at most one [`RegistryError`] per call. The
//! error is structured so the surrounding protocol layer can surface it
//! verbatim: a stable taxonomy [`ErrorKind`] (rendered as a `type` URI), a
//! human readable `title`, the `subject` entity path and machine readable
//! `args`.

use serde::Serialize;
use std::collections::BTreeMap;

/// Base URI for the error taxonomy.
pub const ERROR_TYPE_BASE: &str = "https://github.com/xregistry/spec/blob/main/core/spec.md#";

/// Result alias used throughout the crate.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Stable classification of registry failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Type/format mismatch, bad id syntax, unknown extension
    InvalidAttributes,
    /// A mandatory attribute is absent or null
    RequiredAttributeMissing,
    /// The model failed its own validation
    ModelError,
    /// A referenced group, resource or version does not exist
    UnknownId,
    /// Conflicting or malformed operation
    BadRequest,
    /// The targeted entity path does not exist
    NotFound,
    /// Client supplied a stale epoch
    MismatchedEpoch,
    /// URL id and body id disagree
    MismatchedId,
    /// Write attempted on a read-only entity
    Readonly,
    /// Storage failure or broken internal invariant
    ServerError,
}

impl ErrorKind {
    /// Taxonomy key of this kind, e.g. `invalid_attributes`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidAttributes => "invalid_attributes",
            ErrorKind::RequiredAttributeMissing => "required_attribute_missing",
            ErrorKind::ModelError => "model_error",
            ErrorKind::UnknownId => "unknown_id",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::NotFound => "not_found",
            ErrorKind::MismatchedEpoch => "mismatched_epoch",
            ErrorKind::MismatchedId => "mismatched_id",
            ErrorKind::Readonly => "readonly",
            ErrorKind::ServerError => "server_error",
        }
    }

    /// Full taxonomy URI for this kind.
    pub fn type_uri(&self) -> String {
        format!("{}{}", ERROR_TYPE_BASE, self.as_str())
    }
}

/// Structured error returned by the validator, the resolver and the registry
/// service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{title}")]
pub struct RegistryError {
    kind: ErrorKind,
    title: String,
    subject: String,
    args: BTreeMap<String, String>,
}

impl Serialize for RegistryError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", &self.kind.type_uri())?;
        map.serialize_entry("title", &self.title)?;
        if !self.subject.is_empty() {
            map.serialize_entry("subject", &self.subject)?;
        }
        if !self.args.is_empty() {
            map.serialize_entry("args", &self.args)?;
        }
        map.end()
    }
}

/// Ensure user visible messages end in a period.
fn sentence(text: impl Into<String>) -> String {
    let mut text = text.into();
    if !text.ends_with('.') {
        text.push('.');
    }
    text
}

impl RegistryError {
    /// Build an error from its parts.
    pub fn new(kind: ErrorKind, title: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            kind,
            title: sentence(title),
            subject: subject.into(),
            args: BTreeMap::new(),
        }
    }

    /// Attach a machine readable argument.
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Replace the subject path.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Re-classify the error, keeping its message.
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn args(&self) -> &BTreeMap<String, String> {
        &self.args
    }

    /// Look up a single argument.
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args.get(key).map(String::as_str)
    }

    /// Serialize to the wire representation.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    // Convenience constructors, one per message family.

    /// A single attribute failed a type or format check.
    pub fn invalid_attribute(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(ErrorKind::InvalidAttributes, reason.clone(), subject).with_arg("error_detail", reason)
    }

    /// Keys with no matching declaration and no `*` wildcard.
    pub fn unknown_extensions(subject: impl Into<String>, names: &[String]) -> Self {
        let subject = subject.into();
        let list = names.join(",");
        Self::new(
            ErrorKind::InvalidAttributes,
            format!("Unknown extension attribute(s) ({}) specified for: {}", list, subject),
            subject,
        )
        .with_arg("list", list)
    }

    /// Required attributes absent or explicitly null.
    pub fn required_missing(subject: impl Into<String>, names: &[String]) -> Self {
        let subject = subject.into();
        let list = names.join(",");
        Self::new(
            ErrorKind::RequiredAttributeMissing,
            format!(
                "One or more mandatory attributes for \"{}\" are missing: {}",
                subject, list
            ),
            subject,
        )
        .with_arg("list", list)
    }

    /// The model document failed self-validation.
    pub fn model_error(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(
            ErrorKind::ModelError,
            format!(
                "There was an error in the model definition provided: {}",
                reason.trim_end_matches('.')
            ),
            "/model",
        )
        .with_arg("error_detail", reason)
    }

    /// A referenced entity could not be found.
    pub fn unknown_id(
        subject: impl Into<String>,
        singular: &str,
        id: &str,
    ) -> Self {
        Self::new(
            ErrorKind::UnknownId,
            format!(
                "The \"{}\" with a \"{}id\" value of \"{}\" cannot be found",
                singular, singular, id
            ),
            subject,
        )
        .with_arg("singular", singular)
        .with_arg("id", id)
    }

    /// Conflicting or malformed request.
    pub fn bad_request(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(ErrorKind::BadRequest, reason.clone(), subject).with_arg("error_detail", reason)
    }

    /// The entity path does not exist.
    pub fn not_found(subject: impl Into<String>) -> Self {
        let subject = subject.into();
        Self::new(
            ErrorKind::NotFound,
            format!("The targeted entity ({}) cannot be found", subject),
            subject,
        )
    }

    /// Stale epoch supplied by the client.
    pub fn mismatched_epoch(subject: impl Into<String>, supplied: u64, existing: u64) -> Self {
        Self::new(
            ErrorKind::MismatchedEpoch,
            format!(
                "Attribute \"epoch\"({}) doesn't match existing value ({})",
                supplied, existing
            ),
            subject,
        )
        .with_arg("bad_epoch", supplied.to_string())
        .with_arg("epoch", existing.to_string())
    }

    /// URL-supplied and body-supplied ids disagree.
    pub fn mismatched_id(
        subject: impl Into<String>,
        field: &str,
        url_id: &str,
        body_id: &str,
    ) -> Self {
        Self::new(
            ErrorKind::MismatchedId,
            format!(
                "The \"{}\" attribute must be set to \"{}\", not \"{}\"",
                field, url_id, body_id
            ),
            subject,
        )
        .with_arg("field", field)
        .with_arg("expected", url_id)
        .with_arg("invalid", body_id)
    }

    /// The entity is marked read-only.
    pub fn readonly(subject: impl Into<String>) -> Self {
        let subject = subject.into();
        Self::new(
            ErrorKind::Readonly,
            format!("Updating a read-only entity ({}) is not allowed", subject),
            subject,
        )
    }

    /// Internal failure (storage, serialization, broken invariant).
    pub fn server_error(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(
            ErrorKind::ServerError,
            format!("An unexpected error occurred: {}", reason.trim_end_matches('.')),
            subject,
        )
        .with_arg("error_detail", reason)
    }
}

impl From<crate::storage::StorageError> for RegistryError {
    fn from(err: crate::storage::StorageError) -> Self {
        RegistryError::server_error("", err.to_string())
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::server_error("", format!("JSON error: {}", err))
    }
}
