//! Admin review handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use sentient_core::{AdminBadge, CoreError, PaymentId, PaymentRecord, PaymentWithOwner, ReviewStats};

use crate::auth::{AdminSession, Session};
use crate::error::ApiError;
use crate::review::{AdminReview, ProofObject};
use crate::state::AppState;

/// Whether the caller may use the admin views.
#[derive(Debug, Serialize)]
pub struct AdminStatusResponse {
    /// True for admins.
    pub is_admin: bool,
}

/// A payment row in the admin table.
#[derive(Debug, Serialize)]
pub struct AdminPaymentView {
    /// Payment and owner fields.
    #[serde(flatten)]
    pub row: PaymentWithOwner,
    /// Status badge.
    pub badge: AdminBadge,
    /// Badge text.
    pub badge_label: &'static str,
    /// Whether approve/reject actions apply.
    pub awaits_review: bool,
    /// Amount for display.
    pub amount_formatted: String,
}

impl From<PaymentWithOwner> for AdminPaymentView {
    fn from(row: PaymentWithOwner) -> Self {
        let badge = AdminBadge::of(&row.payment);
        Self {
            badge,
            badge_label: badge.label(),
            awaits_review: row.payment.awaits_review(),
            amount_formatted: row.payment.amount_formatted(),
            row,
        }
    }
}

/// Admin table response.
#[derive(Debug, Serialize)]
pub struct AdminPaymentsResponse {
    /// Header counters.
    pub stats: ReviewStats,
    /// All payments, newest first.
    pub payments: Vec<AdminPaymentView>,
}

/// Approve/reject request.
#[derive(Debug, Deserialize)]
pub struct VerificationRequest {
    /// True to approve, false to reject.
    pub verified: bool,
}

/// Result of a verification change.
#[derive(Debug, Serialize)]
pub struct VerificationResponse {
    /// The updated row.
    pub payment: PaymentRecord,
    /// New badge.
    pub badge: AdminBadge,
    /// Badge text.
    pub badge_label: &'static str,
}

/// Proof listing query.
#[derive(Debug, Deserialize)]
pub struct ProofQuery {
    /// Only keys starting with this (e.g. a user id).
    #[serde(default)]
    pub prefix: Option<String>,
}

/// Proof listing response.
#[derive(Debug, Serialize)]
pub struct ProofListResponse {
    /// Stored proofs.
    pub proofs: Vec<ProofObject>,
}

fn parse_payment_id(raw: &str) -> Result<PaymentId, ApiError> {
    raw.parse::<PaymentId>()
        .map_err(|e| ApiError::from(CoreError::from(e)))
}

/// Whether the caller holds an admin role.
pub async fn status(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<AdminStatusResponse>, ApiError> {
    let is_admin = state.review.is_admin(&session.caller()).await?;
    Ok(Json(AdminStatusResponse { is_admin }))
}

/// All payments with owner details and counters.
pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    AdminSession(admin): AdminSession,
) -> Result<Json<AdminPaymentsResponse>, ApiError> {
    let rows = state.review.list_all(&admin.caller()).await?;

    Ok(Json(AdminPaymentsResponse {
        stats: AdminReview::stats(&rows),
        payments: rows.into_iter().map(AdminPaymentView::from).collect(),
    }))
}

/// One payment for the detail dialog.
pub async fn get_payment(
    State(state): State<Arc<AppState>>,
    AdminSession(admin): AdminSession,
    Path(payment_id): Path<String>,
) -> Result<Json<AdminPaymentView>, ApiError> {
    let payment_id = parse_payment_id(&payment_id)?;
    let row = state.review.get(&admin.caller(), &payment_id).await?;
    Ok(Json(AdminPaymentView::from(row)))
}

/// Approve or reject a payment.
pub async fn set_verification(
    State(state): State<Arc<AppState>>,
    AdminSession(admin): AdminSession,
    Path(payment_id): Path<String>,
    Json(body): Json<VerificationRequest>,
) -> Result<Json<VerificationResponse>, ApiError> {
    let payment_id = parse_payment_id(&payment_id)?;
    let payment = state
        .review
        .set_verification(&admin.caller(), &payment_id, body.verified)
        .await?;

    let badge = AdminBadge::of(&payment);
    Ok(Json(VerificationResponse {
        payment,
        badge,
        badge_label: badge.label(),
    }))
}

/// Uploaded proof files.
pub async fn list_proofs(
    State(state): State<Arc<AppState>>,
    AdminSession(admin): AdminSession,
    Query(query): Query<ProofQuery>,
) -> Result<Json<ProofListResponse>, ApiError> {
    let prefix = query.prefix.unwrap_or_default();
    let proofs = state.review.list_proofs(&admin.caller(), &prefix).await?;
    Ok(Json(ProofListResponse { proofs }))
}
