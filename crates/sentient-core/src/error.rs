//! Error types for the core domain.

use crate::ids::IdError;
use crate::proof::ProofRejection;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by domain-level validation.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A required field was missing or blank.
    #[error("missing required field: {field}")]
    MissingField {
        /// Name of the field.
        field: &'static str,
    },

    /// The uploaded proof file was rejected.
    #[error(transparent)]
    InvalidProof(#[from] ProofRejection),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// Unknown enum value received from the backend.
    #[error("unknown {kind}: {value}")]
    UnknownVariant {
        /// What was being parsed (e.g. "payment status").
        kind: &'static str,
        /// The offending value.
        value: String,
    },
}
