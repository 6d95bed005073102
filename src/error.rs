//! Error taxonomy for the workflow index.
//!
//! Every core operation returns [`IndexError`] as a value. Transports map
//! it to their own status codes through [`IndexError::code`] and render it
//! with [`IndexError::to_body`], which follows the
//! `{ "error": { "code": "...", "message": "..." } }` contract.

use serde::Serialize;
use std::path::PathBuf;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// A corpus document is not well-formed. Non-fatal inside batch operations.
    #[error("parse error in {filename}: {detail}")]
    Parse { filename: String, detail: String },

    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    /// A caller parameter is out of range. `field` names the parameter.
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// The store has not been initialized or cannot be opened.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("internal store error: {0}")]
    InternalStore(#[source] sqlx::Error),

    /// The corpus itself could not be enumerated.
    #[error("corpus unavailable at {}: {message}", .path.display())]
    Corpus { path: PathBuf, message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl IndexError {
    pub fn parse(filename: impl Into<String>, detail: impl ToString) -> Self {
        Self::Parse {
            filename: filename.into(),
            detail: detail.to_string(),
        }
    }

    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Machine-readable error code, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "parse_error",
            Self::NotFound { .. } => "not_found",
            Self::Validation { .. } => "validation_error",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::InternalStore(_) => "internal_store_error",
            Self::Corpus { .. } => "corpus_unavailable",
            Self::Config(_) => "config_error",
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        }
    }
}

/// JSON error response body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl From<sqlx::Error> for IndexError {
    fn from(err: sqlx::Error) -> Self {
        let unavailable = match &err {
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => true,
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                msg.contains("no such table")
                    || msg.contains("unable to open database")
                    || msg.contains("file is not a database")
            }
            _ => false,
        };
        if unavailable {
            Self::StoreUnavailable(err.to_string())
        } else {
            Self::InternalStore(err)
        }
    }
}
