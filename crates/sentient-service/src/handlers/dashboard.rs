//! Dashboard handler: profile, subscription state and payment history.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use sentient_core::{SubscriptionState, UserProfile};
use sentient_store::{Caller, StoreError};

use crate::auth::Session;
use crate::error::user_message;
use crate::handlers::payments::PaymentView;
use crate::state::AppState;

/// Headline subscription state.
#[derive(Debug, Serialize)]
pub struct SubscriptionView {
    /// Derived state.
    pub state: SubscriptionState,
    /// Text shown to the user.
    pub label: &'static str,
    /// Whether access is active.
    pub active: bool,
}

/// Dashboard response.
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    /// The user's profile.
    pub profile: UserProfile,
    /// Greeting name.
    pub display_name: String,
    /// Subscription state.
    pub subscription: SubscriptionView,
    /// Community invite; only present while access is active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord_invite_url: Option<String>,
    /// Payments, newest first.
    pub payments: Vec<PaymentView>,
    /// Why the history could not be loaded, if it could not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payments_error: Option<String>,
}

/// Load the dashboard.
///
/// Profile and history are read concurrently. Neither failure fails the
/// request: a missing profile is created (or synthesized), and a history
/// error is reported in `payments_error` so the client can offer a retry.
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Json<DashboardResponse> {
    let caller = session.caller();
    let (profile, history) = futures::join!(
        load_profile(&state, &session, &caller),
        state.workflow.list_own(&caller)
    );

    let (payments, payments_error) = match history {
        Ok(payments) => (payments, None),
        Err(e) => {
            tracing::warn!(user_id = %session.user_id, error = %e, "Failed to load payment history");
            (Vec::new(), Some(user_message(&e)))
        }
    };

    let subscription = SubscriptionState::from_payments(&payments);
    let active = subscription == SubscriptionState::Active;

    Json(DashboardResponse {
        display_name: profile.display_name(),
        profile,
        subscription: SubscriptionView {
            state: subscription,
            label: subscription.label(),
            active,
        },
        discord_invite_url: active.then(|| state.config.discord_invite_url.clone()),
        payments: payments.into_iter().map(PaymentView::from).collect(),
        payments_error,
    })
}

/// Fetch the profile, creating it on first visit.
async fn load_profile(state: &AppState, session: &Session, caller: &Caller) -> UserProfile {
    match state.records.get_profile(caller, &session.user_id).await {
        Ok(Some(profile)) => profile,
        Ok(None) | Err(StoreError::NotFound { .. }) => {
            match state.records.insert_profile(caller, &session.new_profile()).await {
                Ok(profile) => {
                    tracing::info!(user_id = %session.user_id, "Profile created");
                    profile
                }
                Err(e) => {
                    tracing::warn!(user_id = %session.user_id, error = %e, "Failed to create profile - using session data");
                    UserProfile::fallback(session.new_profile())
                }
            }
        }
        Err(e) => {
            tracing::warn!(user_id = %session.user_id, error = %e, "Failed to load profile - using session data");
            UserProfile::fallback(session.new_profile())
        }
    }
}
