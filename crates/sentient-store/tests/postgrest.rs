//! PostgREST and Storage client tests against a mocked Supabase project.

use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sentient_core::{NewPayment, PaymentId, PaymentStatus, PaymentUpdate, UserId};
use sentient_store::{
    Caller, ObjectStore, RecordStore, StoreError, SupabaseObjectStore, SupabaseRecordStore,
};

const ANON_KEY: &str = "anon-key";

fn caller() -> Caller {
    Caller::new(UserId::generate(), "user-jwt")
}

fn payment_row(id: PaymentId, user_id: UserId, status: &str, verified: bool) -> serde_json::Value {
    json!({
        "id": id.to_string(),
        "user_id": user_id.to_string(),
        "payment_method": "usdt",
        "amount": 49.0,
        "currency": "USDT",
        "status": status,
        "payment_proof_url": null,
        "paypal_payment_id": null,
        "discord_invite_sent": verified,
        "admin_verified": verified,
        "created_at": "2024-05-01T10:00:00Z",
        "updated_at": "2024-05-01T10:00:00Z"
    })
}

// ============================================================================
// Record Store
// ============================================================================

#[tokio::test]
async fn insert_payment_forwards_caller_token_and_returns_row() {
    let server = MockServer::start().await;
    let caller = caller();
    let id = PaymentId::generate();

    Mock::given(method("POST"))
        .and(path("/rest/v1/payments"))
        .and(header("apikey", ANON_KEY))
        .and(header("authorization", "Bearer user-jwt"))
        .and(header("prefer", "return=representation"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([payment_row(id, caller.user_id, "pending", false)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = SupabaseRecordStore::new(&server.uri(), ANON_KEY).unwrap();
    let row = store
        .insert_payment(&caller, &NewPayment::usdt(caller.user_id, None))
        .await
        .unwrap();

    assert_eq!(row.id, id);
    assert_eq!(row.amount_cents, 4900);
    assert_eq!(row.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn verification_update_patches_the_three_fields() {
    let server = MockServer::start().await;
    let caller = caller();
    let id = PaymentId::generate();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/payments"))
        .and(query_param("id", format!("eq.{id}")))
        .and(body_json(json!({
            "status": "completed",
            "admin_verified": true,
            "discord_invite_sent": true
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([payment_row(id, caller.user_id, "completed", true)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = SupabaseRecordStore::new(&server.uri(), ANON_KEY).unwrap();
    let row = store
        .update_payment(&caller, &id, &PaymentUpdate::verification(true))
        .await
        .unwrap();

    assert!(row.is_active());
}

#[tokio::test]
async fn update_matching_no_rows_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = SupabaseRecordStore::new(&server.uri(), ANON_KEY).unwrap();
    let err = store
        .update_payment(&caller(), &PaymentId::generate(), &PaymentUpdate::verification(false))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::NotFound { entity: "payment", .. }));
}

#[tokio::test]
async fn history_is_requested_newest_first() {
    let server = MockServer::start().await;
    let caller = caller();

    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .and(query_param("user_id", format!("eq.{}", caller.user_id)))
        .and(query_param("order", "created_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            payment_row(PaymentId::generate(), caller.user_id, "failed", false),
            payment_row(PaymentId::generate(), caller.user_id, "completed", true),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let store = SupabaseRecordStore::new(&server.uri(), ANON_KEY).unwrap();
    let rows = store
        .list_payments_for_user(&caller, &caller.user_id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn admin_listing_embeds_owner_profile() {
    let server = MockServer::start().await;
    let caller = caller();
    let mut row = payment_row(PaymentId::generate(), caller.user_id, "pending", false);
    row["profiles"] = json!({ "email": "tess@example.com", "full_name": "Tess Trader" });

    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .and(query_param("select", "*,profiles(email,full_name)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&server)
        .await;

    let store = SupabaseRecordStore::new(&server.uri(), ANON_KEY).unwrap();
    let rows = store.list_payments_with_owners(&caller).await.unwrap();

    let owner = rows[0].owner.as_ref().unwrap();
    assert_eq!(owner.email.as_deref(), Some("tess@example.com"));
}

#[tokio::test]
async fn admin_check_calls_rpc() {
    let server = MockServer::start().await;
    let caller = caller();

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/check_admin_status"))
        .and(body_json(json!({ "user_id": caller.user_id.to_string() })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .expect(1)
        .mount(&server)
        .await;

    let store = SupabaseRecordStore::new(&server.uri(), ANON_KEY).unwrap();
    assert!(store.is_admin(&caller, &caller.user_id).await.unwrap());
}

#[tokio::test]
async fn backend_error_codes_are_classified() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/check_admin_status"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "PGRST202",
            "message": "Could not find the function public.check_admin_status(user_id)",
            "details": null,
            "hint": null
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "code": "42P17",
            "message": "infinite recursion detected in policy for relation \"admin_users\""
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "PGRST301",
            "message": "JWT expired"
        })))
        .mount(&server)
        .await;

    let store = SupabaseRecordStore::new(&server.uri(), ANON_KEY).unwrap();
    let caller = caller();

    let err = store.is_admin(&caller, &caller.user_id).await.unwrap_err();
    assert!(matches!(err, StoreError::MissingSchemaObject(_)));

    let err = store.list_payments_with_owners(&caller).await.unwrap_err();
    assert!(matches!(err, StoreError::PolicyMisconfigured(_)));

    let err = store.get_profile(&caller, &caller.user_id).await.unwrap_err();
    assert!(matches!(err, StoreError::PermissionDenied(_)));
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    // nothing listens on the discard port
    let store = SupabaseRecordStore::new("http://127.0.0.1:9", ANON_KEY).unwrap();
    let caller = caller();

    let err = store
        .list_payments_for_user(&caller, &caller.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Network(_)));
    assert!(err.is_transient());
}

// ============================================================================
// Object Store
// ============================================================================

#[tokio::test]
async fn upload_posts_bytes_without_upsert() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/storage/v1/object/payment-proofs/u_1700000000000.png"))
        .and(header("x-upsert", "false"))
        .and(header("content-type", "image/png"))
        .and(header("authorization", "Bearer user-jwt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Key": "payment-proofs/u_1700000000000.png"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = SupabaseObjectStore::new(&server.uri(), ANON_KEY, "payment-proofs").unwrap();
    store
        .upload(&caller(), "u_1700000000000.png", vec![0x89, b'P', b'N', b'G'], "image/png")
        .await
        .unwrap();
}

#[tokio::test]
async fn missing_bucket_is_a_schema_problem() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/storage/v1/object/payment-proofs/u_1.png"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "statusCode": "404",
            "error": "Bucket not found",
            "message": "Bucket not found"
        })))
        .mount(&server)
        .await;

    let store = SupabaseObjectStore::new(&server.uri(), ANON_KEY, "payment-proofs").unwrap();
    let err = store
        .upload(&caller(), "u_1.png", vec![1], "image/png")
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::MissingSchemaObject(_)));
}

#[tokio::test]
async fn upload_rejected_by_policy_is_permission_denied() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/storage/v1/object/payment-proofs/u_1.pdf"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "statusCode": "403",
            "error": "Unauthorized",
            "message": "new row violates row-level security policy"
        })))
        .mount(&server)
        .await;

    let store = SupabaseObjectStore::new(&server.uri(), ANON_KEY, "payment-proofs").unwrap();
    let err = store
        .upload(&caller(), "u_1.pdf", vec![1], "application/pdf")
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::PermissionDenied(_)));
}

#[tokio::test]
async fn list_filters_by_key_prefix() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/storage/v1/object/list/payment-proofs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "name": "abc_1.png",
                "created_at": "2024-05-01T10:00:00Z",
                "metadata": { "size": 2048, "mimetype": "image/png" }
            },
            { "name": "xabc_2.png", "metadata": null }
        ])))
        .mount(&server)
        .await;

    let store = SupabaseObjectStore::new(&server.uri(), ANON_KEY, "payment-proofs").unwrap();
    let entries = store.list(&caller(), "abc").await.unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "abc_1.png");
    assert_eq!(entries[0].size, Some(2048));
}

#[tokio::test]
async fn list_pages_until_a_short_page() {
    let server = MockServer::start().await;
    let full_page: Vec<_> = (0..100)
        .map(|i| json!({ "name": format!("abc_{i:03}.png") }))
        .collect();

    Mock::given(method("POST"))
        .and(path("/storage/v1/object/list/payment-proofs"))
        .and(body_partial_json(json!({ "limit": 100, "offset": 0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(full_page))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/storage/v1/object/list/payment-proofs"))
        .and(body_partial_json(json!({ "limit": 100, "offset": 100 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "abc_100.png" },
            { "name": "abc_101.png" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let store = SupabaseObjectStore::new(&server.uri(), ANON_KEY, "payment-proofs").unwrap();
    let entries = store.list(&caller(), "abc").await.unwrap();

    assert_eq!(entries.len(), 102);
    assert_eq!(entries[101].name, "abc_101.png");
}

#[tokio::test]
async fn remove_sends_prefixes() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/storage/v1/object/payment-proofs"))
        .and(body_json(json!({ "prefixes": ["u_1.png"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let store = SupabaseObjectStore::new(&server.uri(), ANON_KEY, "payment-proofs").unwrap();
    store
        .remove(&caller(), &["u_1.png".to_string()])
        .await
        .unwrap();
}
