//! In-memory backends.
//!
//! Used when no managed backend is configured (local development) and by
//! tests. Access policies are not modelled: every caller sees every row.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use sentient_core::{
    AdminRole, AdminUser, NewPayment, NewProfile, OwnerSummary, PaymentId, PaymentRecord,
    PaymentUpdate, PaymentWithOwner, UserId, UserProfile,
};

use crate::error::{Result, StoreError};
use crate::{Caller, ObjectEntry, ObjectStore, RecordStore};

#[derive(Default)]
struct Tables {
    profiles: HashMap<UserId, UserProfile>,
    /// Insertion order doubles as the tiebreak for equal `created_at`.
    payments: Vec<PaymentRecord>,
    admins: HashMap<UserId, AdminUser>,
}

/// A thread-safe in-memory record store.
#[derive(Default, Clone)]
pub struct InMemoryRecordStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryRecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with roles already granted.
    #[must_use]
    pub fn with_admins(admins: impl IntoIterator<Item = (UserId, AdminRole)>) -> Self {
        let created_at = Utc::now();
        let tables = Tables {
            admins: admins
                .into_iter()
                .map(|(id, role)| (id, AdminUser { id, role, created_at }))
                .collect(),
            ..Tables::default()
        };
        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    /// Grant an admin role. The service itself never writes roles.
    pub async fn grant_admin(&self, user_id: UserId, role: AdminRole) {
        let mut tables = self.tables.write().await;
        tables.admins.insert(
            user_id,
            AdminUser {
                id: user_id,
                role,
                created_at: Utc::now(),
            },
        );
    }

    /// Number of stored payments.
    pub async fn payment_count(&self) -> usize {
        self.tables.read().await.payments.len()
    }

    fn newest_first(mut payments: Vec<PaymentRecord>) -> Vec<PaymentRecord> {
        payments.reverse();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        payments
    }

    fn join_owner(tables: &Tables, payment: PaymentRecord) -> PaymentWithOwner {
        let owner = tables.profiles.get(&payment.user_id).map(|p| OwnerSummary {
            email: p.email.clone(),
            full_name: p.full_name.clone(),
        });
        PaymentWithOwner { payment, owner }
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_profile(&self, _caller: &Caller, user_id: &UserId) -> Result<Option<UserProfile>> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.get(user_id).cloned())
    }

    async fn insert_profile(&self, _caller: &Caller, profile: &NewProfile) -> Result<UserProfile> {
        let mut tables = self.tables.write().await;
        if tables.profiles.contains_key(&profile.id) {
            return Err(StoreError::Backend {
                status: 409,
                code: Some("23505".to_string()),
                message: format!("profile already exists: {}", profile.id),
            });
        }
        let row = profile.clone().into_profile(Utc::now());
        tables.profiles.insert(row.id, row.clone());
        Ok(row)
    }

    async fn insert_payment(&self, _caller: &Caller, payment: &NewPayment) -> Result<PaymentRecord> {
        let row = payment.clone().into_record(PaymentId::generate(), Utc::now());
        let mut tables = self.tables.write().await;
        tables.payments.push(row.clone());
        Ok(row)
    }

    async fn update_payment(
        &self,
        _caller: &Caller,
        payment_id: &PaymentId,
        update: &PaymentUpdate,
    ) -> Result<PaymentRecord> {
        let mut tables = self.tables.write().await;
        let row = tables
            .payments
            .iter_mut()
            .find(|p| p.id == *payment_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "payment",
                id: payment_id.to_string(),
            })?;
        row.apply(update, Utc::now());
        Ok(row.clone())
    }

    async fn list_payments_for_user(
        &self,
        _caller: &Caller,
        user_id: &UserId,
    ) -> Result<Vec<PaymentRecord>> {
        let tables = self.tables.read().await;
        let owned = tables
            .payments
            .iter()
            .filter(|p| p.user_id == *user_id)
            .cloned()
            .collect();
        Ok(Self::newest_first(owned))
    }

    async fn list_payments_with_owners(&self, _caller: &Caller) -> Result<Vec<PaymentWithOwner>> {
        let tables = self.tables.read().await;
        Ok(Self::newest_first(tables.payments.clone())
            .into_iter()
            .map(|p| Self::join_owner(&tables, p))
            .collect())
    }

    async fn get_payment_with_owner(
        &self,
        _caller: &Caller,
        payment_id: &PaymentId,
    ) -> Result<Option<PaymentWithOwner>> {
        let tables = self.tables.read().await;
        Ok(tables
            .payments
            .iter()
            .find(|p| p.id == *payment_id)
            .cloned()
            .map(|p| Self::join_owner(&tables, p)))
    }

    async fn is_admin(&self, _caller: &Caller, user_id: &UserId) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.admins.contains_key(user_id))
    }
}

/// A stored object.
#[derive(Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
    created_at: chrono::DateTime<Utc>,
}

/// A thread-safe in-memory object store.
#[derive(Clone)]
pub struct InMemoryObjectStore {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
    public_base_url: String,
}

impl InMemoryObjectStore {
    /// Create an empty store whose public URLs start with `public_base_url`.
    #[must_use]
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            objects: Arc::default(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch an object's bytes and content type.
    pub async fn get(&self, key: &str) -> Option<(Vec<u8>, String)> {
        let objects = self.objects.read().await;
        objects
            .get(key)
            .map(|o| (o.bytes.clone(), o.content_type.clone()))
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn upload(
        &self,
        _caller: &Caller,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let mut objects = self.objects.write().await;
        if objects.contains_key(key) {
            return Err(StoreError::Backend {
                status: 409,
                code: Some("Duplicate".to_string()),
                message: format!("object already exists: {key}"),
            });
        }
        objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base_url)
    }

    async fn list(&self, _caller: &Caller, prefix: &str) -> Result<Vec<ObjectEntry>> {
        let objects = self.objects.read().await;
        let mut entries: Vec<_> = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, o)| ObjectEntry {
                name: key.clone(),
                size: Some(o.bytes.len() as u64),
                created_at: Some(o.created_at),
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn remove(&self, _caller: &Caller, keys: &[String]) -> Result<()> {
        let mut objects = self.objects.write().await;
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }
}
