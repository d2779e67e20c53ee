//! Admin review of submitted payments.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use sentient_core::{PaymentId, PaymentRecord, PaymentUpdate, PaymentWithOwner, ReviewStats};
use sentient_store::{Caller, ObjectStore, RecordStore, Result, StoreError};

/// A stored proof file as listed for admins.
#[derive(Debug, Clone, Serialize)]
pub struct ProofObject {
    /// Object key.
    pub name: String,
    /// Size in bytes, when known.
    pub size: Option<u64>,
    /// Upload time, when known.
    pub created_at: Option<DateTime<Utc>>,
    /// Public URL of the file.
    pub public_url: String,
}

/// Role-gated review operations. Callers must already have passed
/// [`AdminReview::is_admin`].
#[derive(Clone)]
pub struct AdminReview {
    records: Arc<dyn RecordStore>,
    objects: Arc<dyn ObjectStore>,
}

impl AdminReview {
    /// Create a review service over the given backends.
    #[must_use]
    pub fn new(records: Arc<dyn RecordStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { records, objects }
    }

    /// Whether the caller holds an admin role.
    ///
    /// # Errors
    ///
    /// Returns the record store error; a failed check is not treated as "no".
    pub async fn is_admin(&self, caller: &Caller) -> Result<bool> {
        self.records.is_admin(caller, &caller.user_id).await
    }

    /// Every payment with its owner's profile fields, newest first.
    ///
    /// # Errors
    ///
    /// Returns the record store error.
    pub async fn list_all(&self, caller: &Caller) -> Result<Vec<PaymentWithOwner>> {
        self.records.list_payments_with_owners(caller).await
    }

    /// One payment with its owner's profile fields.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown id.
    pub async fn get(&self, caller: &Caller, payment_id: &PaymentId) -> Result<PaymentWithOwner> {
        self.records
            .get_payment_with_owner(caller, payment_id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "payment",
                id: payment_id.to_string(),
            })
    }

    /// Approve or reject a payment.
    ///
    /// Writes `admin_verified`, `discord_invite_sent` and `status` in one
    /// update. Re-verifying an already decided payment is allowed; the last
    /// write wins.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown id, or the store error.
    pub async fn set_verification(
        &self,
        caller: &Caller,
        payment_id: &PaymentId,
        verified: bool,
    ) -> Result<PaymentRecord> {
        let payment = self
            .records
            .update_payment(caller, payment_id, &PaymentUpdate::verification(verified))
            .await?;

        tracing::info!(
            admin_id = %caller.user_id,
            payment_id = %payment.id,
            owner_id = %payment.user_id,
            verified,
            status = %payment.status,
            "Payment verification updated"
        );
        Ok(payment)
    }

    /// Header counters for a listing.
    #[must_use]
    pub fn stats(rows: &[PaymentWithOwner]) -> ReviewStats {
        ReviewStats::from_payments(rows.iter().map(|row| &row.payment))
    }

    /// Proof files in the bucket whose key starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns the object store error.
    pub async fn list_proofs(&self, caller: &Caller, prefix: &str) -> Result<Vec<ProofObject>> {
        let entries = self.objects.list(caller, prefix).await?;
        Ok(entries
            .into_iter()
            .map(|entry| ProofObject {
                public_url: self.objects.public_url(&entry.name),
                name: entry.name,
                size: entry.size,
                created_at: entry.created_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use sentient_core::{AdminRole, NewPayment, PaymentStatus, UserId};
    use sentient_store::{InMemoryObjectStore, InMemoryRecordStore};

    use super::*;

    async fn seeded() -> (AdminReview, Caller, PaymentRecord) {
        let admin = Caller::new(UserId::generate(), "admin");
        let user = Caller::new(UserId::generate(), "user");
        let records = InMemoryRecordStore::with_admins([(admin.user_id, AdminRole::Admin)]);
        let payment = records
            .insert_payment(&user, &NewPayment::usdt(user.user_id, None))
            .await
            .unwrap();
        let review = AdminReview::new(
            Arc::new(records),
            Arc::new(InMemoryObjectStore::new("memory://payment-proofs")),
        );
        (review, admin, payment)
    }

    #[tokio::test]
    async fn approve_and_reject_move_fields_together() {
        let (review, admin, payment) = seeded().await;

        let approved = review.set_verification(&admin, &payment.id, true).await.unwrap();
        assert_eq!(approved.status, PaymentStatus::Completed);
        assert!(approved.admin_verified && approved.discord_invite_sent);

        let rejected = review.set_verification(&admin, &payment.id, false).await.unwrap();
        assert_eq!(rejected.status, PaymentStatus::Failed);
        assert!(!rejected.admin_verified && !rejected.discord_invite_sent);
    }

    #[tokio::test]
    async fn unknown_payment_is_not_found() {
        let (review, admin, _) = seeded().await;
        let missing = PaymentId::generate();

        assert!(matches!(
            review.get(&admin, &missing).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            review.set_verification(&admin, &missing, true).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn stats_count_pending_and_verified() {
        let (review, admin, payment) = seeded().await;
        let rows = review.list_all(&admin).await.unwrap();
        assert_eq!(
            AdminReview::stats(&rows),
            ReviewStats {
                total_payments: 1,
                pending_verification: 1,
                verified: 0
            }
        );

        review.set_verification(&admin, &payment.id, true).await.unwrap();
        let rows = review.list_all(&admin).await.unwrap();
        let stats = AdminReview::stats(&rows);
        assert_eq!((stats.pending_verification, stats.verified), (0, 1));
    }

    #[tokio::test]
    async fn only_granted_users_are_admins() {
        let (review, admin, payment) = seeded().await;
        assert!(review.is_admin(&admin).await.unwrap());
        assert!(!review
            .is_admin(&Caller::new(payment.user_id, "user"))
            .await
            .unwrap());
    }
}
