//! Error types for the calsync engine.

use crate::Uid;
use thiserror::Error;

/// All possible errors from the calsync engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Store errors
    #[error("record not found: {0}")]
    RecordNotFound(Uid),

    #[error("record already exists: {0}")]
    RecordAlreadyExists(Uid),

    #[error("store failure: {0}")]
    Store(String),

    // Configuration errors
    #[error("unknown strategy: '{0}' (expected one of: sync, mirror)")]
    UnknownStrategy(String),

    // Data errors
    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
