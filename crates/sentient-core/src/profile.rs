//! User profiles and administrator roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Name shown when a profile has neither a full name nor an email.
const FALLBACK_DISPLAY_NAME: &str = "Trader";

/// A row of the `profiles` table, keyed by the identity provider's user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// The user id (same as the identity id).
    pub id: UserId,
    /// Email address.
    pub email: Option<String>,
    /// Full name captured at sign-up.
    pub full_name: Option<String>,
    /// When the profile was created.
    pub created_at: DateTime<Utc>,
    /// When the profile was last updated.
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Build a profile from identity data without touching the store.
    ///
    /// Used when the lazy profile insert fails so the dashboard can still render.
    #[must_use]
    pub fn fallback(profile: NewProfile) -> Self {
        profile.into_profile(Utc::now())
    }

    /// Greeting name: full name, else the email local part, else "Trader".
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(name) = self.full_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        self.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .unwrap_or(FALLBACK_DISPLAY_NAME)
            .to_string()
    }
}

/// Insert shape for a new profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfile {
    /// The user id.
    pub id: UserId,
    /// Email address.
    pub email: Option<String>,
    /// Full name.
    pub full_name: Option<String>,
}

impl NewProfile {
    /// Materialize the row the store would produce for this insert.
    #[must_use]
    pub fn into_profile(self, now: DateTime<Utc>) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email,
            full_name: self.full_name,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Administrative role from the `admin_users` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// May review payments.
    Admin,
    /// May review payments and manage admins (outside this service).
    SuperAdmin,
}

/// A row of the `admin_users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    /// The admin's user id.
    pub id: UserId,
    /// Granted role.
    pub role: AdminRole,
    /// When the role was granted.
    pub created_at: DateTime<Utc>,
}
