//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, dashboard, health, payments, session};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent requests for session endpoints.
const SESSION_MAX_CONCURRENT_REQUESTS: usize = 20;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /v1/payments/instructions` - Price, wallet and proof constraints
///
/// ## Session
/// - `POST /v1/auth/signup` - Register
/// - `POST /v1/auth/login` - Sign in
/// - `POST /v1/auth/logout` - Sign out (bearer token)
/// - `POST /v1/auth/forgot-password` - Send reset email
///
/// ## User (bearer token)
/// - `GET /v1/dashboard` - Profile, subscription state and history
/// - `GET /v1/payments` - Payment history
/// - `POST /v1/payments/paypal` - Pay with PayPal
/// - `POST /v1/payments/usdt` - Report a USDT transfer (multipart)
///
/// ## Admin (bearer token + admin role)
/// - `GET /v1/admin/status` - Whether the caller is an admin
/// - `GET /v1/admin/payments` - All payments with counters
/// - `GET /v1/admin/payments/:id` - One payment
/// - `POST /v1/admin/payments/:id/verification` - Approve or reject
/// - `GET /v1/admin/proofs` - Uploaded proof files
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // Credential endpoints get a tighter limit than the rest of the API.
    let session_routes = Router::new()
        .route("/signup", post(session::signup))
        .route("/login", post(session::login))
        .route("/logout", post(session::logout))
        .route("/forgot-password", post(session::forgot_password))
        .layer(ConcurrencyLimitLayer::new(SESSION_MAX_CONCURRENT_REQUESTS));

    let admin_routes = Router::new()
        .route("/status", get(admin::status))
        .route("/payments", get(admin::list_payments))
        .route("/payments/:id", get(admin::get_payment))
        .route("/payments/:id/verification", post(admin::set_verification))
        .route("/proofs", get(admin::list_proofs));

    let api_routes = Router::new()
        .route("/dashboard", get(dashboard::get_dashboard))
        // Payments
        .route("/payments", get(payments::list_payments))
        .route("/payments/instructions", get(payments::instructions))
        .route("/payments/paypal", post(payments::submit_paypal))
        .route("/payments/usdt", post(payments::submit_usdt))
        .nest("/auth", session_routes)
        .nest("/admin", admin_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Multipart extraction has its own 2 MiB default
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
