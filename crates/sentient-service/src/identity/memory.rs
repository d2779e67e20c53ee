//! In-memory identity provider for local development and tests.
//!
//! Issues HS256 session tokens signed with the same secret the auth
//! extractor validates against, so a local session works end to end.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use sentient_core::{AdminRole, UserId};
use sentient_store::InMemoryRecordStore;

use super::types::{AuthSession, IdentityUser, SignUpRequest, SignUpResult, UserMetadata};
use super::{IdentityError, IdentityProvider, Result};
use crate::auth::{decode_session_token, SessionClaims, SESSION_AUDIENCE};

/// Lifetime of issued access tokens.
const SESSION_TTL_SECONDS: i64 = 3600;

/// Shortest password accepted at sign-up.
const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    user: IdentityUser,
    password_digest: String,
}

#[derive(Default)]
struct Directory {
    /// Keyed by lower-cased email.
    accounts: HashMap<String, Account>,
    revoked_sessions: HashSet<String>,
    password_resets: Vec<(String, String)>,
}

/// Addresses that receive the admin role when they sign up.
struct AdminGrants {
    records: InMemoryRecordStore,
    emails: HashSet<String>,
}

/// A thread-safe in-memory identity provider.
#[derive(Clone)]
pub struct InMemoryIdentity {
    directory: Arc<RwLock<Directory>>,
    secret: String,
    admin_grants: Option<Arc<AdminGrants>>,
}

impl InMemoryIdentity {
    /// Create a provider that signs tokens with `secret`.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            directory: Arc::default(),
            secret: secret.into(),
            admin_grants: None,
        }
    }

    /// Grant the admin role in `records` to accounts registered under one
    /// of `emails` (compared case-insensitively).
    #[must_use]
    pub fn granting_admin_to(
        mut self,
        records: InMemoryRecordStore,
        emails: impl IntoIterator<Item = String>,
    ) -> Self {
        let emails: HashSet<String> = emails
            .into_iter()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        if !emails.is_empty() {
            self.admin_grants = Some(Arc::new(AdminGrants { records, emails }));
        }
        self
    }

    /// Password reset requests received so far, as `(email, redirect_to)`.
    pub async fn password_resets(&self) -> Vec<(String, String)> {
        self.directory.read().await.password_resets.clone()
    }

    fn digest(user_id: UserId, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(user_id.as_uuid().as_bytes());
        hasher.update(password.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn issue_session(&self, user: &IdentityUser) -> Result<AuthSession> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            aud: Some(serde_json::Value::String(SESSION_AUDIENCE.to_string())),
            exp: now + SESSION_TTL_SECONDS,
            iat: Some(now),
            role: Some(SESSION_AUDIENCE.to_string()),
            user_metadata: user.user_metadata.clone(),
            session_id: Some(uuid::Uuid::new_v4().to_string()),
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| IdentityError::Configuration(format!("failed to sign session: {e}")))?;

        Ok(AuthSession {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: SESSION_TTL_SECONDS.unsigned_abs(),
            refresh_token: None,
            user: user.clone(),
        })
    }

    fn claims(&self, access_token: &str) -> Result<SessionClaims> {
        decode_session_token(access_token, &self.secret).map_err(|e| {
            tracing::debug!(error = %e, "Rejected session token");
            IdentityError::InvalidToken
        })
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentity {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpResult> {
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::WeakPassword(format!(
                "Password should be at least {MIN_PASSWORD_LEN} characters."
            )));
        }

        let key = request.email.trim().to_lowercase();
        let mut directory = self.directory.write().await;
        if directory.accounts.contains_key(&key) {
            return Err(IdentityError::AlreadyRegistered);
        }

        let user = IdentityUser {
            id: UserId::generate(),
            email: Some(request.email.trim().to_string()),
            user_metadata: UserMetadata {
                full_name: Some(request.full_name.trim().to_string()).filter(|n| !n.is_empty()),
            },
        };
        let password_digest = Self::digest(user.id, &request.password);
        let grant_admin = self
            .admin_grants
            .as_deref()
            .is_some_and(|grants| grants.emails.contains(&key));
        directory.accounts.insert(
            key,
            Account {
                user: user.clone(),
                password_digest,
            },
        );
        drop(directory);

        if let Some(grants) = self.admin_grants.as_deref().filter(|_| grant_admin) {
            grants.records.grant_admin(user.id, AdminRole::Admin).await;
            tracing::info!(user_id = %user.id, "Granted admin role at sign-up");
        }

        // auto-confirm: the account is usable right away
        let session = self.issue_session(&user)?;
        Ok(SignUpResult {
            user,
            session: Some(session),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let directory = self.directory.read().await;
        let account = directory
            .accounts
            .get(&email.trim().to_lowercase())
            .ok_or(IdentityError::InvalidCredentials)?;

        if Self::digest(account.user.id, password) != account.password_digest {
            return Err(IdentityError::InvalidCredentials);
        }
        self.issue_session(&account.user)
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let claims = self.claims(access_token)?;
        if let Some(session_id) = claims.session_id {
            self.directory.write().await.revoked_sessions.insert(session_id);
        }
        Ok(())
    }

    async fn request_password_reset(&self, email: &str, redirect_to: &str) -> Result<()> {
        // unknown addresses succeed too, so the endpoint does not reveal accounts
        self.directory
            .write()
            .await
            .password_resets
            .push((email.trim().to_string(), redirect_to.to_string()));
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<IdentityUser> {
        let claims = self.claims(access_token)?;
        let directory = self.directory.read().await;

        if claims
            .session_id
            .as_ref()
            .is_some_and(|id| directory.revoked_sessions.contains(id))
        {
            return Err(IdentityError::InvalidToken);
        }

        let user_id: UserId = claims.sub.parse().map_err(|_| IdentityError::InvalidToken)?;
        directory
            .accounts
            .values()
            .find(|a| a.user.id == user_id)
            .map(|a| a.user.clone())
            .ok_or(IdentityError::InvalidToken)
    }

    async fn is_revoked(&self, session_id: &str) -> bool {
        self.directory.read().await.revoked_sessions.contains(session_id)
    }
}
