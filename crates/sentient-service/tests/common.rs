//! Common test utilities for sentient-service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use jsonwebtoken::{encode, EncodingKey, Header};

use sentient_core::{
    AdminRole, NewPayment, NewProfile, PaymentId, PaymentRecord, PaymentUpdate, PaymentWithOwner,
    UserId, UserProfile,
};
use sentient_service::auth::{SessionClaims, SESSION_AUDIENCE};
use sentient_service::config::DEV_JWT_SECRET;
use sentient_service::identity::UserMetadata;
use sentient_service::{create_router, AppState, InMemoryIdentity, ServiceConfig};
use sentient_store::{
    Caller, InMemoryObjectStore, InMemoryRecordStore, ObjectStore, RecordStore, Result, StoreError,
};

/// Public base URL of proofs in the test object store.
pub const PROOF_BASE_URL: &str = "https://proofs.test/payment-proofs";

/// Discord invite configured for tests.
pub const DISCORD_INVITE: &str = "https://discord.gg/sentient-test";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Backing record store.
    pub records: InMemoryRecordStore,
    /// Backing object store.
    pub objects: InMemoryObjectStore,
    /// Identity provider.
    pub identity: InMemoryIdentity,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
    /// A user holding the admin role.
    pub admin_user_id: UserId,
}

/// Configuration used by every harness.
pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        listen_addr: "127.0.0.1:0".into(),
        jwt_secret: Some(DEV_JWT_SECRET.into()),
        site_url: "https://app.sentient.test".into(),
        discord_invite_url: DISCORD_INVITE.into(),
        ..ServiceConfig::default()
    }
}

impl TestHarness {
    /// Create a new test harness over fresh in-memory backends.
    pub fn new() -> Self {
        let admin_user_id = UserId::generate();
        let records = InMemoryRecordStore::with_admins([(admin_user_id, AdminRole::Admin)]);
        let objects = InMemoryObjectStore::new(PROOF_BASE_URL);
        let identity = InMemoryIdentity::new(DEV_JWT_SECRET);

        let state = AppState::with_backends(
            test_config(),
            Arc::new(records.clone()),
            Arc::new(objects.clone()),
            Arc::new(identity.clone()),
        );
        let router: Router = create_router(state);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            records,
            objects,
            identity,
            test_user_id: UserId::generate(),
            admin_user_id,
        }
    }

    /// Create a harness whose payment backends are replaced, e.g. by failing ones.
    pub fn with_stores(records: Arc<dyn RecordStore>, objects: Arc<dyn ObjectStore>) -> TestServer {
        let state = AppState::with_backends(
            test_config(),
            records,
            objects,
            Arc::new(InMemoryIdentity::new(DEV_JWT_SECRET)),
        );
        TestServer::new(create_router(state)).expect("Failed to create test server")
    }

    /// Get the authorization header for user authentication.
    pub fn user_auth_header(&self) -> String {
        bearer(self.test_user_id, Some("Tess Trader"))
    }

    /// Get the authorization header for the admin user.
    pub fn admin_auth_header(&self) -> String {
        bearer(self.admin_user_id, Some("Ada Admin"))
    }

    /// Get a different user's auth header (for testing isolation).
    pub fn other_user_auth_header() -> String {
        bearer(UserId::generate(), None)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A bearer header carrying a freshly signed session token.
pub fn bearer(user_id: UserId, full_name: Option<&str>) -> String {
    format!("Bearer {}", session_token(user_id, full_name, 3600))
}

/// Sign a session token for `user_id` that expires `ttl` seconds from now.
pub fn session_token(user_id: UserId, full_name: Option<&str>, ttl: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = SessionClaims {
        sub: user_id.to_string(),
        email: Some(format!("{}@example.com", &user_id.to_string()[..8])),
        aud: Some(serde_json::json!(SESSION_AUDIENCE)),
        exp: now + ttl,
        iat: Some(now),
        role: Some(SESSION_AUDIENCE.into()),
        user_metadata: UserMetadata {
            full_name: full_name.map(str::to_string),
        },
        session_id: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(DEV_JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign test token")
}

/// A tiny PNG header; content is never decoded.
pub fn png_bytes() -> Vec<u8> {
    vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n', 0, 0, 0, 0]
}

// ============================================================================
// Faulty backends
// ============================================================================

/// In-memory record store with selected operations failing.
#[derive(Default)]
pub struct FaultyRecords {
    inner: InMemoryRecordStore,
    fail_inserts: bool,
    fail_updates: bool,
    fail_history: bool,
}

impl FaultyRecords {
    /// Payment inserts are denied by row-level security.
    pub fn failing_inserts() -> Self {
        Self {
            fail_inserts: true,
            ..Self::default()
        }
    }

    /// Payment updates cannot reach the backend.
    pub fn failing_updates() -> Self {
        Self {
            fail_updates: true,
            ..Self::default()
        }
    }

    /// Payment history reads cannot reach the backend.
    pub fn failing_history() -> Self {
        Self {
            fail_history: true,
            ..Self::default()
        }
    }

    /// The store behind the failing operations.
    pub fn inner(&self) -> &InMemoryRecordStore {
        &self.inner
    }
}

#[async_trait]
impl RecordStore for FaultyRecords {
    async fn get_profile(&self, caller: &Caller, user_id: &UserId) -> Result<Option<UserProfile>> {
        self.inner.get_profile(caller, user_id).await
    }

    async fn insert_profile(&self, caller: &Caller, profile: &NewProfile) -> Result<UserProfile> {
        self.inner.insert_profile(caller, profile).await
    }

    async fn insert_payment(&self, caller: &Caller, payment: &NewPayment) -> Result<PaymentRecord> {
        if self.fail_inserts {
            return Err(StoreError::PermissionDenied(
                "new row violates row-level security policy".into(),
            ));
        }
        self.inner.insert_payment(caller, payment).await
    }

    async fn update_payment(
        &self,
        caller: &Caller,
        payment_id: &PaymentId,
        update: &PaymentUpdate,
    ) -> Result<PaymentRecord> {
        if self.fail_updates {
            return Err(StoreError::Network("connection reset by peer".into()));
        }
        self.inner.update_payment(caller, payment_id, update).await
    }

    async fn list_payments_for_user(
        &self,
        caller: &Caller,
        user_id: &UserId,
    ) -> Result<Vec<PaymentRecord>> {
        if self.fail_history {
            return Err(StoreError::Network("connection refused".into()));
        }
        self.inner.list_payments_for_user(caller, user_id).await
    }

    async fn list_payments_with_owners(&self, caller: &Caller) -> Result<Vec<PaymentWithOwner>> {
        self.inner.list_payments_with_owners(caller).await
    }

    async fn get_payment_with_owner(
        &self,
        caller: &Caller,
        payment_id: &PaymentId,
    ) -> Result<Option<PaymentWithOwner>> {
        self.inner.get_payment_with_owner(caller, payment_id).await
    }

    async fn is_admin(&self, caller: &Caller, user_id: &UserId) -> Result<bool> {
        self.inner.is_admin(caller, user_id).await
    }
}
