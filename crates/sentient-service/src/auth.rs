//! Authentication extractors.
//!
//! This module provides extractors for:
//! - `Session` - an authenticated user, from a Supabase session JWT
//! - `AdminSession` - a session whose user holds an admin role
//!
//! Session tokens are HS256 JWTs signed with the project's JWT secret. When
//! no secret is configured, the token is resolved by the identity provider.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use sentient_core::{NewProfile, UserId};
use sentient_store::Caller;

use crate::error::ApiError;
use crate::identity::{IdentityUser, UserMetadata};
use crate::state::AppState;

/// Audience of user session tokens.
pub const SESSION_AUDIENCE: &str = "authenticated";

/// Where non-admins are sent when they reach an admin view.
pub const NON_ADMIN_REDIRECT: &str = "/dashboard";

/// JWT claims of a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID).
    pub sub: String,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Audience (can be string or array).
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
    /// Expiration time.
    pub exp: i64,
    /// Issued at.
    #[serde(default)]
    pub iat: Option<i64>,
    /// Database role the token maps to.
    #[serde(default)]
    pub role: Option<String>,
    /// Sign-up metadata.
    #[serde(default)]
    pub user_metadata: UserMetadata,
    /// Session identifier.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Decode and validate a session token.
///
/// # Errors
///
/// Returns an error if the signature, expiry or audience is invalid.
pub fn decode_session_token(
    token: &str,
    secret: &str,
) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[SESSION_AUDIENCE]);

    decode::<SessionClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
}

/// An authenticated user session.
#[derive(Debug, Clone)]
pub struct Session {
    /// The user ID.
    pub user_id: UserId,
    /// Email address, when known.
    pub email: Option<String>,
    /// Full name from the sign-up metadata.
    pub full_name: Option<String>,
    /// The bearer token, forwarded to the backend.
    pub access_token: String,
}

impl Session {
    /// The store caller acting for this session.
    #[must_use]
    pub fn caller(&self) -> Caller {
        Caller::new(self.user_id, self.access_token.clone())
    }

    /// The profile row to create when none exists yet.
    #[must_use]
    pub fn new_profile(&self) -> NewProfile {
        NewProfile {
            id: self.user_id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
        }
    }

    fn from_claims(claims: SessionClaims, access_token: String) -> Result<Self, ApiError> {
        let user_id = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| ApiError::Unauthorized)?;

        Ok(Self {
            user_id,
            email: claims.email,
            full_name: claims.user_metadata.full_name,
            access_token,
        })
    }

    fn from_user(user: IdentityUser, access_token: String) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
            full_name: user.user_metadata.full_name,
            access_token,
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?
            .to_string();

        // Allow test tokens in testing only.
        // This bypass is gated behind #[cfg(test)] or the "test-auth" feature
        // to ensure it is never active in production builds.
        #[cfg(any(test, feature = "test-auth"))]
        if let Some(user_id_str) = token.strip_prefix("test-token:") {
            let user_id = user_id_str
                .parse::<UserId>()
                .map_err(|_| ApiError::Unauthorized)?;

            return Ok(Session {
                user_id,
                email: None,
                full_name: None,
                access_token: token.clone(),
            });
        }

        if let Some(secret) = state.jwt_secret() {
            let claims = decode_session_token(&token, secret).map_err(|e| {
                tracing::debug!(error = %e, "JWT validation failed");
                ApiError::Unauthorized
            })?;
            if let Some(session_id) = claims.session_id.as_deref() {
                if state.identity.is_revoked(session_id).await {
                    tracing::debug!(session_id = %session_id, "Rejected signed-out session");
                    return Err(ApiError::Unauthorized);
                }
            }
            return Session::from_claims(claims, token);
        }

        let user = state.identity.get_user(&token).await?;
        Ok(Session::from_user(user, token))
    }
}

/// A session whose user passed the admin role check.
///
/// Non-admins are redirected to the dashboard rather than shown an error.
#[derive(Debug, Clone)]
pub struct AdminSession(pub Session);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;

        if !state.review.is_admin(&session.caller()).await? {
            tracing::info!(user_id = %session.user_id, "Non-admin redirected from admin view");
            return Err(ApiError::Redirect(NON_ADMIN_REDIRECT.to_string()));
        }

        tracing::debug!(admin_id = %session.user_id, "Admin authenticated");
        Ok(AdminSession(session))
    }
}
