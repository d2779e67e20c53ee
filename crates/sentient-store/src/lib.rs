//! Storage layer for the Sentient Markets subscription service.
//!
//! Persistence and file storage are delegated to a managed backend. This crate
//! defines the two seams the service talks through and their implementations:
//!
//! - [`RecordStore`]: `profiles`, `payments` and `admin_users` rows
//!   ([`SupabaseRecordStore`] over PostgREST, [`InMemoryRecordStore`])
//! - [`ObjectStore`]: proof-of-payment files
//!   ([`SupabaseObjectStore`] over the Storage API, [`InMemoryObjectStore`])
//!
//! Row-level authorization stays in the backend: every call carries the
//! [`Caller`]'s access token so the backend's policies apply.
//!
//! # Example
//!
//! ```no_run
//! use sentient_core::{NewPayment, UserId};
//! use sentient_store::{Caller, InMemoryRecordStore, RecordStore};
//!
//! # async fn example() -> sentient_store::Result<()> {
//! let store = InMemoryRecordStore::new();
//! let caller = Caller::new(UserId::generate(), "access-token");
//!
//! let payment = store.insert_payment(&caller, &NewPayment::usdt(caller.user_id, None)).await?;
//! let history = store.list_payments_for_user(&caller, &caller.user_id).await?;
//! assert_eq!(history[0].id, payment.id);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgrest;
pub mod schema;
pub mod storage;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use error::{Result, StoreError};
pub use memory::{InMemoryObjectStore, InMemoryRecordStore};
pub use postgrest::SupabaseRecordStore;
pub use storage::SupabaseObjectStore;

use sentient_core::{
    NewPayment, NewProfile, PaymentId, PaymentRecord, PaymentUpdate, PaymentWithOwner, UserId,
    UserProfile,
};

/// The authenticated party on whose behalf a store call is made.
#[derive(Debug, Clone)]
pub struct Caller {
    /// The caller's user id.
    pub user_id: UserId,
    /// Bearer token forwarded to the backend.
    pub access_token: String,
}

impl Caller {
    /// Create a caller from a user id and its session token.
    #[must_use]
    pub fn new(user_id: UserId, access_token: impl Into<String>) -> Self {
        Self {
            user_id,
            access_token: access_token.into(),
        }
    }
}

/// Row storage for profiles, payments and admin roles.
///
/// This trait abstracts the record store, allowing for different implementations
/// (e.g., Supabase PostgREST, in-memory for development and testing).
#[async_trait]
pub trait RecordStore: Send + Sync {
    // =========================================================================
    // Profile Operations
    // =========================================================================

    /// Get a profile by user id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    async fn get_profile(&self, caller: &Caller, user_id: &UserId) -> Result<Option<UserProfile>>;

    /// Insert a profile row.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails or the row already exists.
    async fn insert_profile(&self, caller: &Caller, profile: &NewProfile) -> Result<UserProfile>;

    // =========================================================================
    // Payment Operations
    // =========================================================================

    /// Insert a payment row and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    async fn insert_payment(&self, caller: &Caller, payment: &NewPayment) -> Result<PaymentRecord>;

    /// Apply a partial update to one payment row.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no row matched.
    async fn update_payment(
        &self,
        caller: &Caller,
        payment_id: &PaymentId,
        update: &PaymentUpdate,
    ) -> Result<PaymentRecord>;

    /// List a user's payments, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    async fn list_payments_for_user(
        &self,
        caller: &Caller,
        user_id: &UserId,
    ) -> Result<Vec<PaymentRecord>>;

    /// List every payment joined with its owner's profile, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    async fn list_payments_with_owners(&self, caller: &Caller) -> Result<Vec<PaymentWithOwner>>;

    /// Get one payment joined with its owner's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    async fn get_payment_with_owner(
        &self,
        caller: &Caller,
        payment_id: &PaymentId,
    ) -> Result<Option<PaymentWithOwner>>;

    // =========================================================================
    // Role Operations
    // =========================================================================

    /// Whether the user holds an admin role.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    async fn is_admin(&self, caller: &Caller, user_id: &UserId) -> Result<bool>;
}

/// An entry returned by [`ObjectStore::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// Object key within the bucket.
    pub name: String,
    /// Size in bytes, when the backend reports it.
    #[serde(default)]
    pub size: Option<u64>,
    /// Creation timestamp, when the backend reports it.
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// File storage for proof-of-payment uploads.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload an object. Existing keys are not overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the upload.
    async fn upload(
        &self,
        caller: &Caller,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<()>;

    /// Public URL for an object key.
    fn public_url(&self, key: &str) -> String;

    /// List objects whose key starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    async fn list(&self, caller: &Caller, prefix: &str) -> Result<Vec<ObjectEntry>>;

    /// Remove objects by key. Missing keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    async fn remove(&self, caller: &Caller, keys: &[String]) -> Result<()>;
}
