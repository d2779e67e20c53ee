//! Payment submission and history handlers.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use sentient_core::{
    has_active_subscription, PaymentBadge, PaymentMethod, PaymentRecord, ALLOWED_PROOF_MIME_TYPES,
    MAX_PROOF_BYTES, SUBSCRIPTION_PRICE_CENTS,
};

use crate::auth::Session;
use crate::error::ApiError;
use crate::state::AppState;
use crate::workflow::{PaymentReceipt, ProofUpload, UsdtSubmission};

/// A payment as shown in the user's own history.
#[derive(Debug, Serialize)]
pub struct PaymentView {
    /// The stored row.
    #[serde(flatten)]
    pub payment: PaymentRecord,
    /// Status badge.
    pub badge: PaymentBadge,
    /// Badge text.
    pub badge_label: &'static str,
    /// Amount for display, e.g. `$49.00 USDT`.
    pub amount_formatted: String,
}

impl From<PaymentRecord> for PaymentView {
    fn from(payment: PaymentRecord) -> Self {
        let badge = PaymentBadge::of(&payment);
        Self {
            badge,
            badge_label: badge.label(),
            amount_formatted: payment.amount_formatted(),
            payment,
        }
    }
}

/// Payment history response.
#[derive(Debug, Serialize)]
pub struct PaymentListResponse {
    /// Whether any payment grants access.
    pub has_active_subscription: bool,
    /// Payments, newest first.
    pub payments: Vec<PaymentView>,
}

/// How to pay.
#[derive(Debug, Serialize)]
pub struct PaymentInstructions {
    /// Subscription price in cents.
    pub price_cents: i64,
    /// Price formatted for display.
    pub price_formatted: String,
    /// PayPal checkout details.
    pub paypal: PaypalInstructions,
    /// Manual transfer details.
    pub usdt: UsdtInstructions,
    /// Constraints on proof files.
    pub proof: ProofRequirements,
}

/// PayPal checkout details.
#[derive(Debug, Serialize)]
pub struct PaypalInstructions {
    /// Charged currency.
    pub currency: &'static str,
}

/// Manual transfer details.
#[derive(Debug, Serialize)]
pub struct UsdtInstructions {
    /// Token.
    pub currency: &'static str,
    /// Receiving address.
    pub wallet_address: String,
    /// Chain of the receiving address.
    pub network: String,
}

/// Constraints on proof files.
#[derive(Debug, Serialize)]
pub struct ProofRequirements {
    /// Largest accepted file.
    pub max_bytes: u64,
    /// Accepted MIME types.
    pub allowed_types: &'static [&'static str],
}

/// List the caller's payments.
pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<PaymentListResponse>, ApiError> {
    let payments = state.workflow.list_own(&session.caller()).await?;

    Ok(Json(PaymentListResponse {
        has_active_subscription: has_active_subscription(&payments),
        payments: payments.into_iter().map(PaymentView::from).collect(),
    }))
}

/// Price, wallet and proof constraints.
#[allow(clippy::cast_precision_loss)]
pub async fn instructions(State(state): State<Arc<AppState>>) -> Json<PaymentInstructions> {
    Json(PaymentInstructions {
        price_cents: SUBSCRIPTION_PRICE_CENTS,
        price_formatted: format!("${:.2}", SUBSCRIPTION_PRICE_CENTS as f64 / 100.0),
        paypal: PaypalInstructions {
            currency: PaymentMethod::Paypal.currency(),
        },
        usdt: UsdtInstructions {
            currency: PaymentMethod::Usdt.currency(),
            wallet_address: state.config.usdt_wallet_address.clone(),
            network: state.config.usdt_network.clone(),
        },
        proof: ProofRequirements {
            max_bytes: MAX_PROOF_BYTES,
            allowed_types: &ALLOWED_PROOF_MIME_TYPES,
        },
    })
}

/// Pay with PayPal (demo checkout, captured immediately).
pub async fn submit_paypal(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<(StatusCode, Json<PaymentReceipt>), ApiError> {
    let payment = state.workflow.submit_paypal(&session.caller()).await?;

    Ok((
        StatusCode::CREATED,
        Json(PaymentReceipt {
            payment,
            tx_hash: None,
            warning: None,
        }),
    ))
}

/// Report a manual USDT transfer.
///
/// Multipart fields: `tx_hash` (required), `notes`, `proof_file`.
pub async fn submit_usdt(
    State(state): State<Arc<AppState>>,
    session: Session,
    multipart: Multipart,
) -> Result<(StatusCode, Json<PaymentReceipt>), ApiError> {
    let submission = read_usdt_form(multipart).await?;
    let receipt = state
        .workflow
        .submit_usdt(&session.caller(), submission)
        .await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn read_usdt_form(mut multipart: Multipart) -> Result<UsdtSubmission, ApiError> {
    let mut submission = UsdtSubmission::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "tx_hash" => submission.tx_hash = text(field).await?,
            "notes" => {
                submission.notes = Some(text(field).await?).filter(|n| !n.trim().is_empty());
            }
            "proof_file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("invalid proof_file: {e}")))?;

                // browsers send an empty part when no file was chosen
                if !(file_name.is_empty() && bytes.is_empty()) {
                    submission.proof = Some(ProofUpload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            other => tracing::debug!(field = %other, "Ignoring unknown form field"),
        }
    }

    Ok(submission)
}

async fn text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid form field: {e}")))
}
