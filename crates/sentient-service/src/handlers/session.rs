//! Sign-up, sign-in, sign-out and password reset handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::Session;
use crate::error::ApiError;
use crate::identity::{AuthSession, SessionEvent, SignUpRequest, SignUpResult};
use crate::state::AppState;

/// Sign-in request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email address.
    pub email: String,
    /// Password.
    pub password: String,
}

/// Password reset request.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    /// Address to send the reset link to.
    pub email: String,
}

/// Acknowledgement for operations without a payload.
#[derive(Debug, Serialize)]
pub struct Ack {
    /// Always true.
    pub ok: bool,
}

fn require_email(email: &str) -> Result<(), ApiError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::Validation {
            field: "email",
            message: "A valid email address is required".into(),
        });
    }
    Ok(())
}

/// Register a new account.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<SignUpResult>), ApiError> {
    require_email(&body.email)?;
    if body.full_name.trim().is_empty() {
        return Err(ApiError::Validation {
            field: "full_name",
            message: "Full name is required".into(),
        });
    }

    let result = state.identity.sign_up(&body).await?;

    tracing::info!(
        user_id = %result.user.id,
        confirmed = result.session.is_some(),
        "User registered"
    );
    state.publish(SessionEvent::UserRegistered {
        user_id: result.user.id,
    });
    if result.session.is_some() {
        state.publish(SessionEvent::SignedIn {
            user_id: result.user.id,
        });
    }

    Ok((StatusCode::CREATED, Json(result)))
}

/// Sign in with email and password.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthSession>, ApiError> {
    require_email(&body.email)?;

    let session = state.identity.sign_in(&body.email, &body.password).await?;

    tracing::info!(user_id = %session.user.id, "User signed in");
    state.publish(SessionEvent::SignedIn {
        user_id: session.user.id,
    });

    Ok(Json(session))
}

/// Sign out the current session.
///
/// A failed revocation is logged, not returned: the client drops its token
/// either way.
pub async fn logout(State(state): State<Arc<AppState>>, session: Session) -> Json<Ack> {
    if let Err(e) = state.identity.sign_out(&session.access_token).await {
        tracing::warn!(user_id = %session.user_id, error = %e, "Sign-out failed");
    } else {
        tracing::info!(user_id = %session.user_id, "User signed out");
    }
    state.publish(SessionEvent::SignedOut {
        user_id: session.user_id,
    });

    Json(Ack { ok: true })
}

/// Send a password reset email.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<Ack>, ApiError> {
    require_email(&body.email)?;
    let email = body.email.trim();

    state
        .identity
        .request_password_reset(email, &state.config.password_reset_redirect())
        .await?;

    tracing::info!("Password reset requested");
    state.publish(SessionEvent::PasswordRecovery {
        email: email.to_string(),
    });

    Ok(Json(Ack { ok: true }))
}
