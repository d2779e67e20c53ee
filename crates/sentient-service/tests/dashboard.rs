//! Dashboard integration tests.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{FaultyRecords, TestHarness, DISCORD_INVITE};

use sentient_core::UserId;
use sentient_store::{Caller, InMemoryObjectStore, InMemoryRecordStore, RecordStore};

#[tokio::test]
async fn first_visit_creates_profile() {
    let harness = TestHarness::new();
    let caller = Caller::new(harness.test_user_id, "t");
    assert!(harness
        .records
        .get_profile(&caller, &harness.test_user_id)
        .await
        .unwrap()
        .is_none());

    let response = harness
        .server
        .get("/v1/dashboard")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["display_name"], "Tess Trader");
    assert_eq!(body["profile"]["id"], harness.test_user_id.to_string());
    assert_eq!(body["subscription"]["state"], "inactive");
    assert_eq!(body["subscription"]["label"], "No Active Subscription");
    assert!(body.get("discord_invite_url").is_none());
    assert!(body["payments"].as_array().unwrap().is_empty());

    let stored = harness
        .records
        .get_profile(&caller, &harness.test_user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.full_name.as_deref(), Some("Tess Trader"));
}

#[tokio::test]
async fn repeat_visits_reuse_profile() {
    let harness = TestHarness::new();

    let first: serde_json::Value = harness
        .server
        .get("/v1/dashboard")
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();
    let second: serde_json::Value = harness
        .server
        .get("/v1/dashboard")
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();

    assert_eq!(first["profile"]["created_at"], second["profile"]["created_at"]);
}

#[tokio::test]
async fn display_name_falls_back_to_email_local_part() {
    let server = TestHarness::with_stores(
        Arc::new(InMemoryRecordStore::new()),
        Arc::new(InMemoryObjectStore::new(common::PROOF_BASE_URL)),
    );
    let user_id = UserId::generate();

    let body: serde_json::Value = server
        .get("/v1/dashboard")
        .add_header("authorization", common::bearer(user_id, None))
        .await
        .json();

    let local = &user_id.to_string()[..8];
    assert_eq!(body["display_name"], local);
}

#[tokio::test]
async fn pending_usdt_shows_pending_verification_without_invite() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/v1/payments/usdt")
        .add_header("authorization", harness.user_auth_header())
        .multipart(axum_test::multipart::MultipartForm::new().add_text("tx_hash", "abc123"))
        .await
        .assert_status(StatusCode::CREATED);

    let body: serde_json::Value = harness
        .server
        .get("/v1/dashboard")
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();

    assert_eq!(body["subscription"]["state"], "pending_verification");
    assert_eq!(body["subscription"]["label"], "Pending Verification");
    assert_eq!(body["subscription"]["active"], false);
    assert!(body.get("discord_invite_url").is_none());
    assert_eq!(body["payments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn dashboard_requires_a_session() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/dashboard").await;

    response.assert_status_unauthorized();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn paypal_payment_releases_invite() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/v1/payments/paypal")
        .add_header("authorization", harness.user_auth_header())
        .await
        .assert_status(StatusCode::CREATED);

    let body: serde_json::Value = harness
        .server
        .get("/v1/dashboard")
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();

    assert_eq!(body["subscription"]["state"], "active");
    assert_eq!(body["subscription"]["label"], "Premium Active");
    assert_eq!(body["discord_invite_url"], DISCORD_INVITE);
    assert_eq!(body["payments"][0]["badge"], "active");
}

#[tokio::test]
async fn history_failure_is_reported_inline() {
    let server = TestHarness::with_stores(
        Arc::new(FaultyRecords::failing_history()),
        Arc::new(InMemoryObjectStore::new(common::PROOF_BASE_URL)),
    );

    let response = server
        .get("/v1/dashboard")
        .add_header("authorization", common::bearer(UserId::generate(), Some("Tess")))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["display_name"], "Tess");
    assert_eq!(
        body["payments_error"],
        "Network connection issue - please try again"
    );
    assert_eq!(body["subscription"]["state"], "inactive");
}
