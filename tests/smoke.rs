// ABOUTME: End-to-end smoke test for the full cassncase lifecycle over the HTTP router.
// ABOUTME: Covers lookup, update and confirm actions, state replay, import, clear, and reopening.

use std::sync::Arc;

use axum::body::Body;
use cassncase_core::{ActionType, OrderStatus};
use cassncase_server::{AppState, SharedState, create_router};
use cassncase_store::{BuiltinSeed, NoSeed, OrderLedger};
use http::Request;
use tower::ServiceExt;

/// Helper to extract JSON body from a response.
async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn get(state: &SharedState, uri: &str) -> axum::response::Response {
    create_router(Arc::clone(state))
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_json(state: &SharedState, uri: &str, body: serde_json::Value) -> axum::response::Response {
    create_router(Arc::clone(state))
        .oneshot(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn smoke_test_full_lifecycle() {
    // 1. Open a seeded ledger on disk
    let dir = tempfile::TempDir::new().unwrap();
    let db_path = dir.path().join("orders.db");
    let ledger = OrderLedger::open(&db_path, &BuiltinSeed).await.unwrap();
    let state: SharedState = Arc::new(AppState::new(ledger));

    // 2. Buyer looks up their order by phone, typed with separators
    let resp = get(&state, "/api/search?q=0928-123-4567").await;
    assert_eq!(resp.status(), 200, "search should find the order");
    let json = json_body(resp).await;
    let order_id = json["order_id"].as_str().unwrap().to_string();
    assert_eq!(order_id, "CN-0002");
    assert_eq!(json["status"], "Pending");

    // 3. Buyer corrects the address, then confirms
    let resp = post_json(
        &state,
        &format!("/api/orders/{}/actions", order_id),
        serde_json::json!({
            "action_type": "UPDATE",
            "changes": { "address": "45 Jasmine Street, Mandaue City, Cebu", "landmark": "near the chapel" }
        }),
    )
    .await;
    assert_eq!(resp.status(), 201, "update should be recorded");

    let resp = post_json(
        &state,
        &format!("/api/orders/{}/actions", order_id),
        serde_json::json!({ "action_type": "CONFIRM" }),
    )
    .await;
    assert_eq!(resp.status(), 201, "confirm should be recorded");

    // 4. State replays both actions; unknown fields survive the merge
    let resp = get(&state, &format!("/api/orders/{}/state", order_id)).await;
    assert_eq!(resp.status(), 200);
    let json = json_body(resp).await;
    assert_eq!(json["status"], "Confirmed");
    assert_eq!(json["address"], "45 Jasmine Street, Mandaue City, Cebu");
    assert_eq!(json["landmark"], "near the chapel");
    assert_eq!(json["email"], "joshua.santos@example.com");

    // 5. The log holds both entries in commit order
    let json = json_body(get(&state, "/api/logs").await).await;
    let logs = json.as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["action_type"], ActionType::Update.as_str());
    assert_eq!(logs[1]["action_type"], ActionType::Confirm.as_str());
    assert!(logs[0]["timestamp"].as_str().unwrap() < logs[1]["timestamp"].as_str().unwrap());

    // 6. Mirror and log agree
    let json = json_body(get(&state, "/api/admin/audit").await).await;
    assert!(json["divergences"].as_array().unwrap().is_empty());

    // 7. Bulk import skips the keyless row
    let resp = post_json(
        &state,
        "/api/admin/import",
        serde_json::json!([
            { "order_id": "CN-0100", "full_name": "Bea Dizon", "email": "bea@example.com" },
            { "full_name": "Missing Key" }
        ]),
    )
    .await;
    assert_eq!(resp.status(), 200);
    assert_eq!(json_body(resp).await["imported"], 1);

    let resp = get(&state, "/api/search?q=BEA%40example.com").await;
    assert_eq!(json_body(resp).await["order_id"], "CN-0100");

    // 8. Clear wipes everything; known ids become not found
    let resp = post_json(&state, "/api/admin/clear", serde_json::json!({})).await;
    assert_eq!(resp.status(), 200);

    let resp = get(&state, &format!("/api/orders/{}/state", order_id)).await;
    assert_eq!(resp.status(), 404);
    let json = json_body(get(&state, "/api/orders").await).await;
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn smoke_test_state_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let db_path = dir.path().join("orders.db");

    {
        let ledger = OrderLedger::open(&db_path, &BuiltinSeed).await.unwrap();
        let state: SharedState = Arc::new(AppState::new(ledger));
        let resp = post_json(
            &state,
            "/api/orders/CN-0005/actions",
            serde_json::json!({ "action_type": "UPDATE", "changes": { "phone": "0999 000 1111" } }),
        )
        .await;
        assert_eq!(resp.status(), 201);
    }

    // Reopening without a seed keeps the stored data
    let ledger = OrderLedger::open(&db_path, &NoSeed).await.unwrap();
    let found = ledger.search("09990001111").await.unwrap().unwrap();
    assert_eq!(found.order_id(), "CN-0005");
    assert_eq!(*found.status(), OrderStatus::Confirmed);
    assert_eq!(ledger.list_logs().await.unwrap().len(), 1);
}
