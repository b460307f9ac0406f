use thiserror::Error;

/// Why a leaf payload (or a stored record) could not be turned into typed values.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not a json object")]
    NotAnObject,

    #[error("missing field `{field}`")]
    MissingField { field: &'static str },

    #[error("field `{field}` must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("unparsable entry-timestamp {value:?}: {reason}")]
    BadTimestamp { value: String, reason: String },
}
