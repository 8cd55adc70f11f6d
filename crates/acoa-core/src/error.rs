//! Error types for ACOA core records.

use thiserror::Error;

/// Errors raised while constructing or decoding a record.
///
/// Construction is all-or-nothing: when one of these is returned, no record
/// exists.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("payload must be a JSON object, got {0}")]
    InvalidPayload(&'static str),

    #[error("metrics must be a JSON object, got {0}")]
    InvalidMetrics(&'static str),

    #[error("event_id is required")]
    MissingEventId,

    #[error("omega_score must be finite, got {0}")]
    NonFiniteScore(f64),

    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("field `{field}` must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("unknown field `{0}`")]
    UnknownField(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The first integrity check a record failed.
///
/// Returned by `check()`; `validate()` collapses it to a boolean.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("context hash mismatch: stored {stored}, computed {computed}")]
    HashMismatch { stored: String, computed: String },

    #[error("malformed id {0:?}: expected 36 characters")]
    MalformedId(String),

    #[error("event_id is empty")]
    MissingEventId,
}

/// Result type for record construction.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Human-readable JSON type name, for error messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;

    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
