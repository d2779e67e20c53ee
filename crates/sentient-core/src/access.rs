//! Access computation over a user's payment history.
//!
//! Everything here is pure: callers fetch the rows, these functions derive
//! what the dashboard and the admin table show.

use serde::Serialize;

use crate::payment::{PaymentRecord, PaymentStatus};

/// Whether any payment grants active access.
///
/// True iff some record is `completed` and admin-verified. False for an empty
/// history.
#[must_use]
pub fn has_active_subscription(payments: &[PaymentRecord]) -> bool {
    payments.iter().any(PaymentRecord::is_active)
}

/// Headline subscription state of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    /// At least one payment is completed and verified.
    Active,
    /// No active payment, but at least one awaits admin review.
    PendingVerification,
    /// Nothing active or pending.
    Inactive,
}

impl SubscriptionState {
    /// Derive the state from a payment history.
    #[must_use]
    pub fn from_payments(payments: &[PaymentRecord]) -> Self {
        if has_active_subscription(payments) {
            Self::Active
        } else if payments
            .iter()
            .any(|p| PaymentBadge::of(p) == PaymentBadge::PendingVerification)
        {
            Self::PendingVerification
        } else {
            Self::Inactive
        }
    }

    /// Label shown on the dashboard.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Premium Active",
            Self::PendingVerification => "Pending Verification",
            Self::Inactive => "No Active Subscription",
        }
    }
}

/// Status badge of a payment in the user's own history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentBadge {
    /// Completed and verified.
    Active,
    /// Pending, or completed but not yet verified.
    PendingVerification,
    /// Rejected.
    Failed,
    /// Cancelled.
    Cancelled,
}

impl PaymentBadge {
    /// Badge for a payment.
    #[must_use]
    pub fn of(payment: &PaymentRecord) -> Self {
        match (payment.status, payment.admin_verified) {
            (PaymentStatus::Completed, true) => Self::Active,
            (PaymentStatus::Pending | PaymentStatus::Completed, _) => Self::PendingVerification,
            (PaymentStatus::Failed, _) => Self::Failed,
            (PaymentStatus::Cancelled, _) => Self::Cancelled,
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::PendingVerification => "Pending Verification",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// Status badge of a payment in the admin table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminBadge {
    /// Completed and verified.
    Verified,
    /// Awaiting a decision.
    Pending,
    /// Rejected.
    Rejected,
    /// Cancelled.
    Cancelled,
}

impl AdminBadge {
    /// Badge for a payment.
    #[must_use]
    pub fn of(payment: &PaymentRecord) -> Self {
        match (payment.status, payment.admin_verified) {
            (PaymentStatus::Completed, true) => Self::Verified,
            (PaymentStatus::Pending | PaymentStatus::Completed, _) => Self::Pending,
            (PaymentStatus::Failed, _) => Self::Rejected,
            (PaymentStatus::Cancelled, _) => Self::Cancelled,
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Verified => "Verified",
            Self::Pending => "Pending",
            Self::Rejected => "Rejected",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// Summary counters for the admin table header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReviewStats {
    /// All payments.
    pub total_payments: usize,
    /// Payments awaiting an admin decision.
    pub pending_verification: usize,
    /// Admin-verified payments (active subscribers).
    pub verified: usize,
}

impl ReviewStats {
    /// Compute counters over a set of payments.
    #[must_use]
    pub fn from_payments<'a>(payments: impl IntoIterator<Item = &'a PaymentRecord>) -> Self {
        payments.into_iter().fold(Self::default(), |mut stats, p| {
            stats.total_payments += 1;
            if p.awaits_review() {
                stats.pending_verification += 1;
            }
            if p.admin_verified {
                stats.verified += 1;
            }
            stats
        })
    }
}
