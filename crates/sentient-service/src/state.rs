//! Application state.

use std::sync::Arc;

use tokio::sync::broadcast;

use sentient_core::AdminRole;
use sentient_store::{
    InMemoryObjectStore, InMemoryRecordStore, ObjectStore, RecordStore, SupabaseObjectStore,
    SupabaseRecordStore,
};

use crate::config::{ServiceConfig, DEV_JWT_SECRET};
use crate::identity::{GoTrueClient, IdentityProvider, InMemoryIdentity, SessionEvent};
use crate::review::AdminReview;
use crate::workflow::PaymentWorkflow;

/// Buffered session events per subscriber before the oldest are dropped.
const SESSION_EVENT_CAPACITY: usize = 64;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: ServiceConfig,

    /// Profile, payment and role rows.
    pub records: Arc<dyn RecordStore>,

    /// Identity provider for session operations.
    pub identity: Arc<dyn IdentityProvider>,

    /// Payment submission workflow.
    pub workflow: PaymentWorkflow,

    /// Admin review operations.
    pub review: AdminReview,

    session_events: broadcast::Sender<SessionEvent>,
    jwt_secret: Option<String>,
}

impl AppState {
    /// Create application state, connecting to Supabase when configured and
    /// falling back to in-memory backends otherwise.
    #[must_use]
    pub fn new(config: ServiceConfig) -> Self {
        if let Some(state) = Self::supabase(&config) {
            return state;
        }

        tracing::warn!("Supabase not configured - using in-memory backends (data is not persisted)");

        let secret = config.jwt_secret.clone().unwrap_or_else(|| {
            tracing::warn!("SUPABASE_JWT_SECRET not set - signing local sessions with the development secret");
            DEV_JWT_SECRET.to_string()
        });

        let records = InMemoryRecordStore::with_admins(
            config.admin_user_ids.iter().map(|id| (*id, AdminRole::Admin)),
        );
        for admin in &config.admin_user_ids {
            tracing::info!(user_id = %admin, "Granted admin role");
        }

        for email in &config.admin_emails {
            tracing::info!(email = %email, "Admin role granted at sign-up");
        }

        let objects = InMemoryObjectStore::new(format!("memory://{}", config.proof_bucket));
        let identity = InMemoryIdentity::new(secret.clone())
            .granting_admin_to(records.clone(), config.admin_emails.iter().cloned());

        let config = ServiceConfig {
            jwt_secret: Some(secret),
            ..config
        };
        Self::with_backends(config, Arc::new(records), Arc::new(objects), Arc::new(identity))
    }

    /// Create application state over explicit backends.
    #[must_use]
    pub fn with_backends(
        config: ServiceConfig,
        records: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let (session_events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        let jwt_secret = config.jwt_secret.clone();

        Self {
            workflow: PaymentWorkflow::new(records.clone(), objects.clone()),
            review: AdminReview::new(records.clone(), objects),
            records,
            identity,
            config,
            session_events,
            jwt_secret,
        }
    }

    fn supabase(config: &ServiceConfig) -> Option<Self> {
        let (url, anon_key) = config.supabase()?;

        let clients = SupabaseRecordStore::new(url, anon_key)
            .and_then(|records| {
                SupabaseObjectStore::new(url, anon_key, &config.proof_bucket)
                    .map(|objects| (records, objects))
            })
            .map_err(|e| e.to_string())
            .and_then(|(records, objects)| {
                GoTrueClient::new(url, anon_key)
                    .map(|identity| (records, objects, identity))
                    .map_err(|e| e.to_string())
            });

        match clients {
            Ok((records, objects, identity)) => {
                tracing::info!(
                    supabase_url = %url,
                    bucket = %config.proof_bucket,
                    local_jwt_validation = config.jwt_secret.is_some(),
                    "Supabase integration enabled"
                );
                if !config.admin_user_ids.is_empty() || !config.admin_emails.is_empty() {
                    tracing::warn!(
                        "ADMIN_USER_IDS and ADMIN_EMAILS are ignored with Supabase - roles live in admin_users"
                    );
                }
                Some(Self::with_backends(
                    config.clone(),
                    Arc::new(records),
                    Arc::new(objects),
                    Arc::new(identity),
                ))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to create Supabase clients");
                None
            }
        }
    }

    /// Secret for local session token validation, if configured.
    #[must_use]
    pub fn jwt_secret(&self) -> Option<&str> {
        self.jwt_secret.as_deref()
    }

    /// Subscribe to session changes.
    #[must_use]
    pub fn subscribe_session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.session_events.subscribe()
    }

    /// Publish a session change. Dropped silently when nobody listens.
    pub fn publish(&self, event: SessionEvent) {
        let _ = self.session_events.send(event);
    }
}
