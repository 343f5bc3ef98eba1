use serde_json::Value;
use thiserror::Error;

use crate::model::FieldType;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A field failed its declared type predicate.
    #[error("Property {field} must be {expected}")]
    InvalidType { field: String, expected: FieldType },

    #[error("document store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The store answered with an unexpected status; `body` is passed through verbatim.
    #[error("document store rejected the request ({status}): {body}")]
    Rejected { status: u16, body: Value },

    #[error("no open connection to the document store")]
    NotConnected,

    #[error("Database does not exist")]
    DatabaseMissing { database: String },

    #[error("malformed document store response: {0}")]
    Malformed(String),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::InvalidType { .. } => "InvalidType",
            StoreError::Transport(_) => "Transport",
            StoreError::Rejected { .. } => "Rejected",
            StoreError::NotConnected => "NotConnected",
            StoreError::DatabaseMissing { .. } => "NOTEXISTS",
            StoreError::Malformed(_) => "Malformed",
        }
    }

    pub fn is_invalid_type(&self) -> bool {
        matches!(self, StoreError::InvalidType { .. })
    }

    /// Status reported by the store, for rejected requests.
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
