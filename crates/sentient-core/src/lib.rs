//! Core types and utilities for the Sentient Markets subscription service.
//!
//! This crate provides the foundational types shared by the store and service crates:
//!
//! - **Identifiers**: `UserId`, `PaymentId`
//! - **Payments**: `PaymentRecord`, `NewPayment`, `PaymentMethod`, `PaymentStatus`
//! - **Access**: `has_active_subscription`, `SubscriptionState`, badges
//! - **Profiles**: `UserProfile`, `AdminRole`, `AdminUser`
//! - **Proofs**: `validate_proof`, `ProofKind`
//!
//! # Amounts
//!
//! The subscription costs **$49.00** (or 49 USDT). Amounts are held as `i64`
//! cents and travel on the wire as a decimal number (`49.0`), matching the
//! `numeric` column of the backing table.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod access;
pub mod error;
pub mod ids;
pub mod payment;
pub mod profile;
pub mod proof;

pub use access::{has_active_subscription, AdminBadge, PaymentBadge, ReviewStats, SubscriptionState};
pub use error::{CoreError, Result};
pub use ids::{IdError, PaymentId, UserId};
pub use payment::{
    NewPayment, PaymentMethod, PaymentRecord, PaymentStatus, PaymentUpdate, PaymentWithOwner,
    OwnerSummary, SUBSCRIPTION_PRICE_CENTS,
};
pub use profile::{AdminRole, AdminUser, NewProfile, UserProfile};
pub use proof::{
    validate_proof, ProofKind, ProofRejection, ALLOWED_PROOF_MIME_TYPES, MAX_PROOF_BYTES,
};
