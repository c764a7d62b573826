//! Error types for the compatibility client.
//!
//! # Design
//! Three kinds of failure reach callers. Caller-input errors
//! (`MissingArgument`) are raised before any request is built. Remote errors
//! (`Remote`) carry the status code and message of a non-2xx response and are
//! propagated unchanged, except for the single conflict fallback in
//! `Properties::upsert`. Everything else describes a payload or transport
//! problem. Unmatched membership records are not errors at all; they degrade
//! to empty contacts.

/// Errors returned by the translators, facades and executors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A required identifier or body was not supplied by the caller.
    #[error("{0} parameter must be provided.")]
    MissingArgument(&'static str),

    /// The remote API answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    /// The request never produced a response.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body could not be deserialized into the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// Two batch results mapped to the same legacy key under `CollisionPolicy::Reject`.
    #[error("duplicate key in batch result: {key}")]
    KeyCollision { key: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ApiError {
    pub const CONFLICT: u16 = 409;
    pub const NOT_FOUND: u16 = 404;

    /// Status code of a remote error, `None` for local failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The remote reported that the resource already exists.
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(Self::CONFLICT)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(Self::NOT_FOUND)
    }
}
