//! Payment submission workflow.
//!
//! Validates input, writes payment records and attaches proof files. Every
//! step is one round trip to a backend; there are no transactions, so the
//! PayPal path can leave a `pending` row behind if its second write fails.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use sentient_core::{
    validate_proof, CoreError, NewPayment, PaymentId, PaymentRecord, PaymentUpdate, ProofKind,
};
use sentient_store::{Caller, ObjectStore, RecordStore, StoreError};

/// Error type for workflow operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Input rejected before any side effect.
    #[error(transparent)]
    Invalid(#[from] CoreError),

    /// A backend write or read failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A proof-of-payment file as received from the client.
#[derive(Debug, Clone)]
pub struct ProofUpload {
    /// Original file name.
    pub file_name: String,
    /// Declared content type.
    pub content_type: Option<String>,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// A manual USDT transfer report.
#[derive(Debug, Clone, Default)]
pub struct UsdtSubmission {
    /// On-chain transaction hash.
    pub tx_hash: String,
    /// Optional screenshot or PDF of the transfer.
    pub proof: Option<ProofUpload>,
    /// Free-form notes for the reviewer.
    pub notes: Option<String>,
}

/// Outcome of a payment submission.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    /// The stored payment.
    pub payment: PaymentRecord,
    /// Transaction hash as submitted (trimmed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    /// Non-fatal problem the user should know about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Payment submission operations.
#[derive(Clone)]
pub struct PaymentWorkflow {
    records: Arc<dyn RecordStore>,
    objects: Arc<dyn ObjectStore>,
}

impl PaymentWorkflow {
    /// Create a workflow over the given backends.
    #[must_use]
    pub fn new(records: Arc<dyn RecordStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { records, objects }
    }

    /// Record a PayPal payment and immediately capture it (demo checkout).
    ///
    /// # Errors
    ///
    /// Returns the first failing write. A failed capture leaves the inserted
    /// row `pending`.
    pub async fn submit_paypal(&self, caller: &Caller) -> Result<PaymentRecord, WorkflowError> {
        let pending = self
            .records
            .insert_payment(caller, &NewPayment::paypal(caller.user_id))
            .await?;

        tracing::info!(
            user_id = %caller.user_id,
            payment_id = %pending.id,
            "PayPal payment created"
        );

        let demo_id = format!("DEMO_{}", Utc::now().timestamp_millis());
        self.capture_paypal(caller, &pending.id, &demo_id)
            .await
            .map_err(|e| {
                tracing::warn!(
                    payment_id = %pending.id,
                    error = %e,
                    "PayPal capture failed - payment left pending"
                );
                e
            })
    }

    /// Mark a PayPal payment as paid and release access.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown payment.
    pub async fn capture_paypal(
        &self,
        caller: &Caller,
        payment_id: &PaymentId,
        paypal_payment_id: &str,
    ) -> Result<PaymentRecord, WorkflowError> {
        let payment = self
            .records
            .update_payment(caller, payment_id, &PaymentUpdate::paypal_capture(paypal_payment_id))
            .await?;

        tracing::info!(
            payment_id = %payment.id,
            paypal_payment_id = %paypal_payment_id,
            "PayPal payment captured"
        );
        Ok(payment)
    }

    /// Record a manual USDT transfer for admin review.
    ///
    /// A failed proof upload does not stop the submission: the payment is
    /// stored without a proof URL and the receipt carries a warning.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Invalid` for a blank transaction hash or a
    /// rejected proof file (nothing is written), or the record store error.
    pub async fn submit_usdt(
        &self,
        caller: &Caller,
        submission: UsdtSubmission,
    ) -> Result<PaymentReceipt, WorkflowError> {
        let tx_hash = submission.tx_hash.trim().to_string();
        if tx_hash.is_empty() {
            return Err(CoreError::MissingField { field: "tx_hash" }.into());
        }

        let proof = submission
            .proof
            .map(|p| {
                let kind = validate_proof(&p.file_name, p.content_type.as_deref(), p.bytes.len() as u64)
                    .map_err(CoreError::from)?;
                Ok::<_, CoreError>((p, kind))
            })
            .transpose()?;

        let mut warning = None;
        let mut uploaded_key = None;
        if let Some((file, kind)) = proof {
            match self.upload_proof(caller, file, kind).await {
                Ok(key) => uploaded_key = Some(key),
                Err(e) => {
                    tracing::warn!(
                        user_id = %caller.user_id,
                        error = %e,
                        "Proof upload failed - continuing without proof"
                    );
                    warning = Some(format!(
                        "Payment proof could not be uploaded ({e}). Your payment was recorded without it."
                    ));
                }
            }
        }

        let proof_url = uploaded_key.as_deref().map(|key| self.objects.public_url(key));
        let payment = match self
            .records
            .insert_payment(caller, &NewPayment::usdt(caller.user_id, proof_url))
            .await
        {
            Ok(payment) => payment,
            Err(e) => {
                if let Some(key) = uploaded_key {
                    self.discard_proof(caller, key).await;
                }
                return Err(e.into());
            }
        };

        tracing::info!(
            user_id = %caller.user_id,
            payment_id = %payment.id,
            tx_hash = %tx_hash,
            notes = ?submission.notes,
            has_proof = payment.payment_proof_url.is_some(),
            "USDT payment submitted"
        );

        Ok(PaymentReceipt {
            payment,
            tx_hash: Some(tx_hash),
            warning,
        })
    }

    /// The caller's own payments, newest first.
    ///
    /// # Errors
    ///
    /// Returns the record store error.
    pub async fn list_own(&self, caller: &Caller) -> Result<Vec<PaymentRecord>, StoreError> {
        self.records
            .list_payments_for_user(caller, &caller.user_id)
            .await
    }

    async fn upload_proof(
        &self,
        caller: &Caller,
        file: ProofUpload,
        kind: ProofKind,
    ) -> Result<String, StoreError> {
        let key = proof_key(caller, kind);
        self.objects
            .upload(caller, &key, file.bytes, kind.mime())
            .await?;
        Ok(key)
    }

    /// Remove a proof whose payment row was never written.
    async fn discard_proof(&self, caller: &Caller, key: String) {
        match self.objects.remove(caller, &[key.clone()]).await {
            Ok(()) => tracing::info!(key = %key, "Removed orphaned proof"),
            Err(e) => tracing::warn!(key = %key, error = %e, "Failed to remove orphaned proof"),
        }
    }
}

/// Object key for a proof: `<user_id>_<unix-millis>-<nonce>.<ext>`.
///
/// The nonce keeps keys distinct when one user uploads twice within a
/// millisecond; uploads never overwrite.
fn proof_key(caller: &Caller, kind: ProofKind) -> String {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}-{}.{}",
        caller.user_id,
        Utc::now().timestamp_millis(),
        &nonce[..8],
        kind.extension()
    )
}
