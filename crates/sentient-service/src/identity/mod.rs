//! Identity collaborator: sign-up, sign-in, sign-out and password reset.
//!
//! The service never stores credentials itself. [`GoTrueClient`] talks to the
//! Supabase Auth server; [`InMemoryIdentity`] stands in for it during local
//! development and tests.

pub mod gotrue;
pub mod memory;
pub mod types;

use async_trait::async_trait;

pub use gotrue::GoTrueClient;
pub use memory::InMemoryIdentity;
pub use types::{
    AuthSession, IdentityUser, SessionEvent, SignUpRequest, SignUpResult, UserMetadata,
};

/// Error type for identity operations.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Email/password pair did not match.
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// The email is already registered.
    #[error("user already registered")]
    AlreadyRegistered,

    /// The password does not meet the provider's rules.
    #[error("weak password: {0}")]
    WeakPassword(String),

    /// The access token is expired, malformed or revoked.
    #[error("invalid or expired session")]
    InvalidToken,

    /// Too many requests for this address.
    #[error("rate limited")]
    RateLimited,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The auth server returned an error this service does not classify.
    #[error("auth API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Provider error code.
        code: Option<String>,
        /// Error message.
        message: String,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for identity operations.
pub type Result<T> = std::result::Result<T, IdentityError>;

/// Session operations delegated to the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a new user with a full name in their metadata.
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpResult>;

    /// Exchange an email/password pair for a session.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession>;

    /// Revoke the session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<()>;

    /// Send a reset email whose link lands on `redirect_to`.
    async fn request_password_reset(&self, email: &str, redirect_to: &str) -> Result<()>;

    /// Resolve the user behind `access_token`.
    async fn get_user(&self, access_token: &str) -> Result<IdentityUser>;

    /// Whether the session `session_id` has been signed out.
    ///
    /// Consulted after a token passes local signature checks. Providers that
    /// can only answer through [`get_user`](Self::get_user) report `false`.
    async fn is_revoked(&self, _session_id: &str) -> bool {
        false
    }
}
