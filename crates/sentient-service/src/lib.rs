//! Sentient Markets subscription service.
//!
//! This crate provides the HTTP API behind the Sentient Markets web app:
//!
//! - Account sign-up, sign-in, sign-out and password reset
//! - The user dashboard (profile, subscription state, payment history)
//! - PayPal (demo) and manual USDT payment submission with proof upload
//! - Admin review of payments (approve/reject, counters, proof listing)
//!
//! # Authentication
//!
//! Every user request carries the Supabase access token as a bearer token.
//! It is validated locally when the JWT secret is configured and against the
//! identity provider otherwise. The same token is forwarded to the data
//! backend so its row-level policies apply.
//!
//! # Backends
//!
//! With `SUPABASE_URL` and `SUPABASE_ANON_KEY` set, data, proofs and
//! identities live in Supabase. Without them the service runs on in-memory
//! backends, which is useful for local development.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers without awaits stay async for routing

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod review;
pub mod routes;
pub mod state;
pub mod workflow;

pub use auth::{AdminSession, Session};
pub use config::ServiceConfig;
pub use error::ApiError;
pub use identity::{GoTrueClient, IdentityError, IdentityProvider, InMemoryIdentity, SessionEvent};
pub use review::AdminReview;
pub use routes::create_router;
pub use state::AppState;
pub use workflow::{PaymentReceipt, PaymentWorkflow, ProofUpload, UsdtSubmission, WorkflowError};
