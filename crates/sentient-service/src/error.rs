//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Serialize;

use sentient_core::CoreError;
use sentient_store::StoreError;

use crate::identity::IdentityError;
use crate::workflow::WorkflowError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Email/password pair did not match.
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// The caller is not allowed to touch the resource.
    #[error("{0}")]
    Forbidden(String),

    /// Send the caller elsewhere (303 See Other).
    #[error("redirect to {0}")]
    Redirect(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - malformed input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Well-formed input that fails a domain rule.
    #[error("{message}")]
    Validation {
        /// The offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// Conflict - resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Too many requests.
    #[error("rate limited")]
    RateLimited,

    /// Backend tables, functions or policies are set up wrongly.
    #[error("{0}")]
    Misconfigured(String),

    /// Backend could not be reached.
    #[error("{0}")]
    Unavailable(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Redirect(location) => return Redirect::to(location).into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                self.to_string(),
                None,
            ),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone(), None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Validation { field, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                message.clone(),
                Some(serde_json::json!({ "field": field })),
            ),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Too many requests - please wait and try again".to_string(),
                Some(serde_json::json!({ "retryable": true })),
            ),
            Self::Misconfigured(msg) => {
                tracing::error!(error = %msg, "Backend misconfigured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "backend_misconfigured",
                    msg.clone(),
                    None,
                )
            }
            Self::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "backend_unavailable",
                msg.clone(),
                Some(serde_json::json!({ "retryable": true })),
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
                Some(serde_json::json!({ "retryable": true })),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// The message shown to a user for a backend failure.
#[must_use]
pub fn user_message(err: &StoreError) -> String {
    match err {
        StoreError::NotFound { entity, .. } => format!("{entity} not found"),
        StoreError::PermissionDenied(_) => {
            "Permission denied - please check your account status".to_string()
        }
        StoreError::PolicyMisconfigured(_) => {
            "Database configuration issue - please contact support".to_string()
        }
        StoreError::MissingSchemaObject(_) => {
            "Database function missing - please contact support".to_string()
        }
        StoreError::Network(_) => "Network connection issue - please try again".to_string(),
        StoreError::Backend { .. } | StoreError::Serialization(_) => {
            "Something went wrong - please try again".to_string()
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let message = user_message(&err);
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound(format!("{entity} not found: {id}")),
            StoreError::PermissionDenied(detail) => {
                tracing::warn!(error = %detail, "Backend denied access");
                Self::Forbidden(message)
            }
            StoreError::PolicyMisconfigured(detail) | StoreError::MissingSchemaObject(detail) => {
                tracing::error!(error = %detail, "Backend schema problem");
                Self::Misconfigured(message)
            }
            StoreError::Network(detail) => {
                tracing::warn!(error = %detail, "Backend unreachable");
                Self::Unavailable(message)
            }
            StoreError::Backend {
                status,
                code,
                message: detail,
            } => {
                tracing::warn!(status, code = ?code, error = %detail, "Backend request failed");
                Self::ExternalService(message)
            }
            StoreError::Serialization(detail) => Self::Internal(detail),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MissingField { field } => Self::Validation {
                field,
                message: format!("{field} is required"),
            },
            CoreError::InvalidProof(rejection) => Self::Validation {
                field: "proof_file",
                message: rejection.to_string(),
            },
            CoreError::InvalidId(_) | CoreError::UnknownVariant { .. } => {
                Self::BadRequest(err.to_string())
            }
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Invalid(e) => e.into(),
            WorkflowError::Store(e) => e.into(),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredentials => Self::InvalidCredentials,
            IdentityError::InvalidToken => Self::Unauthorized,
            IdentityError::AlreadyRegistered => Self::Conflict("User already registered".into()),
            IdentityError::WeakPassword(msg) => Self::Validation {
                field: "password",
                message: msg,
            },
            IdentityError::RateLimited => Self::RateLimited,
            IdentityError::Http(e) if e.is_connect() || e.is_timeout() => {
                tracing::warn!(error = %e, "Auth server unreachable");
                Self::Unavailable("Network connection issue - please try again".into())
            }
            IdentityError::Http(e) => Self::ExternalService(e.to_string()),
            IdentityError::Api { status, message, .. } => {
                Self::ExternalService(format!("auth server returned {status}: {message}"))
            }
            IdentityError::Configuration(msg) => Self::Internal(msg),
        }
    }
}
