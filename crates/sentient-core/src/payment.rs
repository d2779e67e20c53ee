//! Payment records and their lifecycle.
//!
//! A payment row moves through a small derived state machine over
//! `(status, admin_verified)`:
//!
//! ```text
//! pending/false   --approve--> completed/true   (active access)
//! pending/false   --reject---> failed/false
//! completed/false --paypal capture--> completed/true
//! ```
//!
//! The three verification fields (`status`, `admin_verified`,
//! `discord_invite_sent`) are only ever written together through
//! [`PaymentUpdate::verification`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::{PaymentId, UserId};

// ============================================================================
// Constants
// ============================================================================

/// Monthly subscription price in cents ($49.00 / 49 USDT).
pub const SUBSCRIPTION_PRICE_CENTS: i64 = 4900;

/// A payment row as stored in the `payments` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Row id.
    pub id: PaymentId,

    /// Owner of the payment.
    pub user_id: UserId,

    /// How the user paid.
    pub payment_method: PaymentMethod,

    /// Amount in cents. Serialized as a decimal number of whole units.
    #[serde(rename = "amount", with = "decimal_amount")]
    pub amount_cents: i64,

    /// Currency code (`USD` or `USDT`).
    pub currency: String,

    /// Lifecycle status.
    pub status: PaymentStatus,

    /// Public URL of the uploaded proof of payment, if any.
    pub payment_proof_url: Option<String>,

    /// PayPal transaction id, once captured.
    pub paypal_payment_id: Option<String>,

    /// Whether the Discord invite has been released to the user.
    pub discord_invite_sent: bool,

    /// Whether an administrator has verified the payment.
    pub admin_verified: bool,

    /// When the row was created.
    pub created_at: DateTime<Utc>,

    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Whether this payment grants access to the gated community.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == PaymentStatus::Completed && self.admin_verified
    }

    /// Whether this payment still needs an administrator decision.
    ///
    /// Only such rows expose approve/reject actions.
    #[must_use]
    pub fn awaits_review(&self) -> bool {
        !self.admin_verified && self.status != PaymentStatus::Failed
    }

    /// Apply a partial update in place, bumping `updated_at`.
    pub fn apply(&mut self, update: &PaymentUpdate, now: DateTime<Utc>) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(verified) = update.admin_verified {
            self.admin_verified = verified;
        }
        if let Some(sent) = update.discord_invite_sent {
            self.discord_invite_sent = sent;
        }
        if let Some(id) = &update.paypal_payment_id {
            self.paypal_payment_id = Some(id.clone());
        }
        self.updated_at = now;
    }

    /// Amount formatted for display, e.g. `$49.00 USDT`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn amount_formatted(&self) -> String {
        format!("${:.2} {}", self.amount_cents as f64 / 100.0, self.currency)
    }
}

/// Insert shape for a new payment row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPayment {
    /// Owner of the payment.
    pub user_id: UserId,
    /// How the user paid.
    pub payment_method: PaymentMethod,
    /// Amount in cents.
    #[serde(rename = "amount", with = "decimal_amount")]
    pub amount_cents: i64,
    /// Currency code.
    pub currency: String,
    /// Initial status.
    pub status: PaymentStatus,
    /// Proof URL, if one was uploaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_proof_url: Option<String>,
    /// Initial verification flag.
    pub admin_verified: bool,
}

impl NewPayment {
    /// A pending PayPal payment for the standard subscription.
    #[must_use]
    pub fn paypal(user_id: UserId) -> Self {
        Self {
            user_id,
            payment_method: PaymentMethod::Paypal,
            amount_cents: SUBSCRIPTION_PRICE_CENTS,
            currency: PaymentMethod::Paypal.currency().to_string(),
            status: PaymentStatus::Pending,
            payment_proof_url: None,
            admin_verified: false,
        }
    }

    /// A pending, unverified USDT transfer awaiting admin review.
    #[must_use]
    pub fn usdt(user_id: UserId, payment_proof_url: Option<String>) -> Self {
        Self {
            user_id,
            payment_method: PaymentMethod::Usdt,
            amount_cents: SUBSCRIPTION_PRICE_CENTS,
            currency: PaymentMethod::Usdt.currency().to_string(),
            status: PaymentStatus::Pending,
            payment_proof_url,
            admin_verified: false,
        }
    }

    /// Materialize the row the store would produce for this insert.
    #[must_use]
    pub fn into_record(self, id: PaymentId, now: DateTime<Utc>) -> PaymentRecord {
        PaymentRecord {
            id,
            user_id: self.user_id,
            payment_method: self.payment_method,
            amount_cents: self.amount_cents,
            currency: self.currency,
            status: self.status,
            payment_proof_url: self.payment_proof_url,
            paypal_payment_id: None,
            discord_invite_sent: false,
            admin_verified: self.admin_verified,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a payment row. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentUpdate {
    /// New status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentStatus>,
    /// New verification flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_verified: Option<bool>,
    /// New invite flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord_invite_sent: Option<bool>,
    /// PayPal transaction id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paypal_payment_id: Option<String>,
}

impl PaymentUpdate {
    /// The admin verification transition.
    ///
    /// Sets `admin_verified`, `discord_invite_sent` and `status` together:
    /// approval yields `completed/true/true`, rejection `failed/false/false`.
    #[must_use]
    pub fn verification(verified: bool) -> Self {
        Self {
            status: Some(if verified {
                PaymentStatus::Completed
            } else {
                PaymentStatus::Failed
            }),
            admin_verified: Some(verified),
            discord_invite_sent: Some(verified),
            paypal_payment_id: None,
        }
    }

    /// Mark a PayPal payment as captured and release access.
    #[must_use]
    pub fn paypal_capture(paypal_payment_id: impl Into<String>) -> Self {
        Self {
            status: Some(PaymentStatus::Completed),
            admin_verified: Some(true),
            discord_invite_sent: Some(true),
            paypal_payment_id: Some(paypal_payment_id.into()),
        }
    }
}

/// Display fields of the profile owning a payment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerSummary {
    /// Owner email.
    pub email: Option<String>,
    /// Owner full name.
    pub full_name: Option<String>,
}

/// A payment joined with its owner's profile, as shown in the admin table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentWithOwner {
    /// The payment row.
    #[serde(flatten)]
    pub payment: PaymentRecord,
    /// The owner's profile fields; absent when the profile row is missing.
    #[serde(rename = "profiles")]
    pub owner: Option<OwnerSummary>,
}

/// Payment method chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// PayPal checkout (simulated).
    Paypal,
    /// Manual USDT (TRC20) transfer.
    Usdt,
}

impl PaymentMethod {
    /// Currency code recorded for this method.
    #[must_use]
    pub const fn currency(self) -> &'static str {
        match self {
            Self::Paypal => "USD",
            Self::Usdt => "USDT",
        }
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paypal => "paypal",
            Self::Usdt => "usdt",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a payment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Submitted, awaiting capture or review.
    Pending,
    /// Paid.
    Completed,
    /// Rejected by an administrator.
    Failed,
    /// Abandoned by the user.
    Cancelled,
}

impl PaymentStatus {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(CoreError::UnknownVariant {
                kind: "payment status",
                value: other.to_string(),
            }),
        }
    }
}

/// Serde adapter between integer cents and a decimal JSON number.
mod decimal_amount {
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::cast_precision_loss)]
    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(cents: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(*cents as f64 / 100.0)
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        // numeric columns may come back as numbers or strings depending on precision
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        let value = match Raw::deserialize(deserializer)? {
            Raw::Number(n) => n,
            Raw::Text(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom)?,
        };
        if !value.is_finite() {
            return Err(serde::de::Error::custom("amount must be finite"));
        }
        Ok((value * 100.0).round() as i64)
    }
}
