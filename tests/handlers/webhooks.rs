//! Paystack webhook signature verification and order update tests

#[path = "../common/mod.rs"]
mod common;

use axum::http::StatusCode;
use common::*;
use orderpay::error::msg;
use serde_json::json;
use tower::ServiceExt;

fn charge_success(order_id: &str, reference: &str) -> String {
    json!({
        "event": "charge.success",
        "data": {
            "reference": reference,
            "amount": 12000,
            "metadata": { "order_id": order_id }
        }
    })
    .to_string()
}

fn webhook_state() -> AppState {
    // The webhook never calls the gateway
    create_test_app_state("http://127.0.0.1:9")
}

#[tokio::test]
async fn test_charge_success_marks_order_processing() {
    let state = webhook_state();
    let fx = setup_fixture(&state, 100.0);
    let body = charge_success(&fx.order.id, "r1");

    let response = app(&state)
        .oneshot(webhook_request(&body, Some(&sign(&body))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "received": true }));

    let order = get_order(&state, &fx.order.id);
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.payment_reference.as_deref(), Some("r1"));
}

#[tokio::test]
async fn test_replayed_charge_success_is_idempotent() {
    let state = webhook_state();
    let fx = setup_fixture(&state, 100.0);
    let body = charge_success(&fx.order.id, "r1");
    let signature = sign(&body);

    let first = app(&state)
        .oneshot(webhook_request(&body, Some(&signature)))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let after_first = get_order(&state, &fx.order.id);

    let second = app(&state)
        .oneshot(webhook_request(&body, Some(&signature)))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let after_second = get_order(&state, &fx.order.id);

    assert_eq!(after_second.status, after_first.status);
    assert_eq!(after_second.payment_reference, after_first.payment_reference);
}

#[tokio::test]
async fn test_missing_signature_is_rejected() {
    let state = webhook_state();
    let fx = setup_fixture(&state, 100.0);
    let body = charge_success(&fx.order.id, "r1");

    let response = app(&state)
        .oneshot(webhook_request(&body, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], msg::MISSING_SIGNATURE);
    assert_eq!(get_order(&state, &fx.order.id).status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_blank_signature_counts_as_missing() {
    let state = webhook_state();
    let fx = setup_fixture(&state, 100.0);
    let body = charge_success(&fx.order.id, "r1");

    for signature in ["", "   "] {
        let response = app(&state)
            .oneshot(webhook_request(&body, Some(signature)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], msg::MISSING_SIGNATURE);
    }
    assert_eq!(get_order(&state, &fx.order.id).status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_invalid_signature_is_rejected_without_mutation() {
    let state = webhook_state();
    let fx = setup_fixture(&state, 100.0);
    let body = charge_success(&fx.order.id, "r1");

    let wrong_key = sign_payload("sk_test_someone_else", body.as_bytes()).unwrap();
    let tampered = sign(&charge_success(&fx.order.id, "r2"));

    for signature in [wrong_key.as_str(), tampered.as_str(), "deadbeef"] {
        let response = app(&state)
            .oneshot(webhook_request(&body, Some(signature)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], msg::INVALID_SIGNATURE);
    }

    let order = get_order(&state, &fx.order.id);
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(order.payment_reference.is_none());
}

#[tokio::test]
async fn test_signature_is_checked_before_parsing() {
    let state = webhook_state();
    let body = "this is not json";

    let response = app(&state)
        .oneshot(webhook_request(body, Some("0000")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], msg::INVALID_SIGNATURE);

    let response = app(&state)
        .oneshot(webhook_request(body, Some(&sign(body))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], msg::INVALID_JSON);
}

#[tokio::test]
async fn test_charge_success_without_order_id_is_acknowledged() {
    let state = webhook_state();
    let fx = setup_fixture(&state, 100.0);

    for body in [
        json!({ "event": "charge.success", "data": { "reference": "r9" } }),
        json!({ "event": "charge.success", "data": { "reference": "r9", "metadata": "" } }),
        json!({ "event": "charge.success", "data": { "reference": "r9", "metadata": { "order_id": "" } } }),
    ] {
        let body = body.to_string();
        let response = app(&state)
            .oneshot(webhook_request(&body, Some(&sign(&body))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "received": true }));
    }

    let order = get_order(&state, &fx.order.id);
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(order.payment_reference.is_none());
}

#[tokio::test]
async fn test_top_level_order_id_is_used_when_metadata_lacks_it() {
    let state = webhook_state();
    let fx = setup_fixture(&state, 100.0);
    let body = json!({
        "event": "charge.success",
        "data": { "reference": "r5", "metadata": "", "order_id": fx.order.id }
    })
    .to_string();

    let response = app(&state)
        .oneshot(webhook_request(&body, Some(&sign(&body))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let order = get_order(&state, &fx.order.id);
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.payment_reference.as_deref(), Some("r5"));
}

#[tokio::test]
async fn test_other_events_are_ignored() {
    let state = webhook_state();
    let fx = setup_fixture(&state, 100.0);
    let body = json!({
        "event": "charge.failed",
        "data": { "reference": "r1", "metadata": { "order_id": fx.order.id } }
    })
    .to_string();

    let response = app(&state)
        .oneshot(webhook_request(&body, Some(&sign(&body))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "received": true }));
    assert_eq!(get_order(&state, &fx.order.id).status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_non_string_event_is_acknowledged() {
    let state = webhook_state();
    let fx = setup_fixture(&state, 100.0);
    let body = json!({
        "event": 123,
        "data": { "reference": "r1", "metadata": { "order_id": fx.order.id } }
    })
    .to_string();

    let response = app(&state)
        .oneshot(webhook_request(&body, Some(&sign(&body))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "received": true }));
    assert_eq!(get_order(&state, &fx.order.id).status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_unknown_order_fails_the_handler() {
    let state = webhook_state();
    let body = charge_success("ord_missing", "r1");

    let response = app(&state)
        .oneshot(webhook_request(&body, Some(&sign(&body))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], msg::WEBHOOK_HANDLER_FAILED);
}

#[tokio::test]
async fn test_shipped_order_is_not_moved_back() {
    let state = webhook_state();
    let fx = setup_fixture(&state, 100.0);
    set_order_status(&state.db.get().unwrap(), &fx.order.id, OrderStatus::Shipped);
    let body = charge_success(&fx.order.id, "late_ref");

    let response = app(&state)
        .oneshot(webhook_request(&body, Some(&sign(&body))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let order = get_order(&state, &fx.order.id);
    assert_eq!(order.status, OrderStatus::Shipped);
    assert_eq!(order.payment_reference.as_deref(), Some("late_ref"));
}

#[tokio::test]
async fn test_cancelled_order_payment_is_recorded() {
    let state = webhook_state();
    let fx = setup_fixture(&state, 100.0);
    set_order_status(&state.db.get().unwrap(), &fx.order.id, OrderStatus::Cancelled);
    let body = charge_success(&fx.order.id, "after_cancel");

    let response = app(&state)
        .oneshot(webhook_request(&body, Some(&sign(&body))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "received": true }));
    let order = get_order(&state, &fx.order.id);
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.payment_reference.as_deref(), Some("after_cancel"));
}

#[tokio::test]
async fn test_paid_order_rejects_new_initialization() {
    let state = webhook_state();
    let fx = setup_fixture(&state, 100.0);
    let body = charge_success(&fx.order.id, "r1");

    app(&state)
        .oneshot(webhook_request(&body, Some(&sign(&body))))
        .await
        .unwrap();

    // The gateway URL is unreachable, so anything but an early rejection would surface as 502
    let response = app(&state)
        .oneshot(payment_request(
            Some(&fx.token),
            &json!({ "orderId": fx.order.id }).to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["details"], msg::ORDER_ALREADY_PAID);
}
