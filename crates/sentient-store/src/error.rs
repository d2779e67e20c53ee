//! Error types for the storage layer.
//!
//! Backend failures are classified by the structured error code the backend
//! returns (PostgREST `PGRST*` codes, Postgres SQLSTATEs), never by matching
//! on message text.

use serde::Deserialize;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The entity kind (e.g. "payment").
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// The caller is not allowed to read or write the row.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Row-level policies are broken (e.g. recursive policy definitions).
    #[error("policy misconfigured: {0}")]
    PolicyMisconfigured(String),

    /// A table, function or bucket the service relies on does not exist.
    #[error("missing schema object: {0}")]
    MissingSchemaObject(String),

    /// The backend could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// Any other backend failure.
    #[error("backend error ({status}): {message}")]
    Backend {
        /// HTTP status returned by the backend.
        status: u16,
        /// Backend error code, when present.
        code: Option<String>,
        /// Backend error message.
        message: String,
    },

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// PostgREST error body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostgrestErrorBody {
    /// `PGRST*` code or Postgres SQLSTATE.
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Extra detail.
    #[serde(default)]
    pub details: Option<String>,
    /// Hint for resolving the error.
    #[serde(default)]
    pub hint: Option<String>,
}

impl StoreError {
    /// Classify a PostgREST error response.
    #[must_use]
    pub fn from_postgrest(status: u16, body: PostgrestErrorBody) -> Self {
        let message = body
            .message
            .clone()
            .unwrap_or_else(|| format!("HTTP {status}"));

        match body.code.as_deref() {
            // single-row request matched no rows
            Some("PGRST116") => Self::NotFound {
                entity: "row",
                id: body.details.unwrap_or_default(),
            },
            // JWT rejected / insufficient privilege
            Some("PGRST301" | "PGRST302" | "42501") => Self::PermissionDenied(message),
            // infinite recursion detected in policy
            Some("42P17") => Self::PolicyMisconfigured(message),
            // undefined function / table, or not in the schema cache
            Some("42883" | "42P01" | "PGRST202" | "PGRST205") => Self::MissingSchemaObject(message),
            _ if status == 401 || status == 403 => Self::PermissionDenied(message),
            code => Self::Backend {
                status,
                code: code.map(String::from),
                message,
            },
        }
    }

    /// Whether retrying the same call might succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Backend { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
