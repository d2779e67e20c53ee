//! Identity data shapes shared by the providers.

use serde::{Deserialize, Serialize};

use sentient_core::{NewProfile, UserId};

/// Metadata captured at sign-up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    /// Name entered on the sign-up form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// A user as known to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityUser {
    /// User id, shared with the `profiles` table.
    pub id: UserId,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Sign-up metadata.
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl IdentityUser {
    /// The profile row to create for this user.
    #[must_use]
    pub fn new_profile(&self) -> NewProfile {
        NewProfile {
            id: self.id,
            email: self.email.clone(),
            full_name: self.user_metadata.full_name.clone(),
        }
    }
}

/// An authenticated session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    /// Bearer token for subsequent requests.
    pub access_token: String,
    /// Token type, always "bearer".
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Seconds until the access token expires.
    pub expires_in: u64,
    /// Refresh token, when the provider issues one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// The signed-in user.
    pub user: IdentityUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Sign-up form input.
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpRequest {
    /// Email address.
    pub email: String,
    /// Password.
    pub password: String,
    /// Full name, stored as user metadata.
    pub full_name: String,
}

/// Result of a sign-up.
///
/// `session` is `None` when the provider requires email confirmation first.
#[derive(Debug, Clone, Serialize)]
pub struct SignUpResult {
    /// The registered user.
    pub user: IdentityUser,
    /// Session, when the account is usable immediately.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<AuthSession>,
}

/// A session change, published to in-process subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A user signed in.
    SignedIn {
        /// The user.
        user_id: UserId,
    },
    /// A user signed out.
    SignedOut {
        /// The user.
        user_id: UserId,
    },
    /// A password reset email was requested.
    PasswordRecovery {
        /// The address the email went to.
        email: String,
    },
    /// A new account was created.
    UserRegistered {
        /// The user.
        user_id: UserId,
    },
}
