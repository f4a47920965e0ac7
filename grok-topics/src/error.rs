//! Error types for the reconciliation layer
//!
//! Maps the failure taxonomy onto variants:
//! - network/HTTP failure → `Http` / `Status`
//! - shape mismatch or parse failure → `Shape`
//! - nothing resolves for an id/slug/name → `NotFound`
//!
//! Ambiguous heuristic matches are not errors: the first match in priority order wins.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TopicsError>;

#[derive(Debug, Error)]
pub enum TopicsError {
    /// Request could not be sent or the body could not be read
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-2xx status
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Response or stored value had an unexpected shape
    #[error("Unexpected data shape: {0}")]
    Shape(String),

    /// No record resolves for the given reference
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage, IO or configuration failure from the common layer
    #[error(transparent)]
    Common(#[from] grok_common::Error),
}

impl TopicsError {
    pub fn is_not_found(&self) -> bool {
        match self {
            TopicsError::NotFound(_) => true,
            TopicsError::Status { status, .. } => *status == 404,
            _ => false,
        }
    }
}

impl From<sqlx::Error> for TopicsError {
    fn from(e: sqlx::Error) -> Self {
        TopicsError::Common(grok_common::Error::Database(e))
    }
}

impl From<serde_json::Error> for TopicsError {
    fn from(e: serde_json::Error) -> Self {
        TopicsError::Shape(e.to_string())
    }
}

impl From<std::io::Error> for TopicsError {
    fn from(e: std::io::Error) -> Self {
        TopicsError::Common(grok_common::Error::Io(e))
    }
}
