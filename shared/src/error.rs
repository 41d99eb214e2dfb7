use thiserror::Error;

/// Why a parcel query produced no collection.
///
/// Every variant ends up as the same user-visible failure state; the split
/// exists for logging and for tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("server returned {status}: {text}")]
    Status { status: u16, text: String },
    #[error("malformed response: {0}")]
    Shape(String),
    #[error("request timed out after {secs}s")]
    Timeout { secs: u32 },
}

impl From<serde_json::Error> for QueryError {
    fn from(e: serde_json::Error) -> Self {
        QueryError::Shape(e.to_string())
    }
}
