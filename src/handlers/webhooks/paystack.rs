//! Paystack webhook receiver.
//!
//! Order of checks matters: the signature is verified against the raw body
//! before the body is parsed or the database is touched. Only
//! `charge.success` mutates state, through a single idempotent write, so
//! duplicate deliveries converge on the same order row.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde_json::{Value, json};

use crate::db::{AppState, queries};
use crate::error::msg;
use crate::models::OrderStatus;
use crate::payments::{ChargeSuccess, PaystackWebhookEvent, SIGNATURE_HEADER};

/// Result type for webhook operations.
pub type WebhookResult = (StatusCode, Json<Value>);

fn received() -> WebhookResult {
    (StatusCode::OK, Json(json!({ "received": true })))
}

fn reject(status: StatusCode, message: &'static str) -> WebhookResult {
    (status, Json(json!({ "error": message })))
}

pub async fn handle_paystack_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> WebhookResult {
    let signature = match headers.get(SIGNATURE_HEADER).map(|v| v.to_str()) {
        Some(Ok(s)) if !s.trim().is_empty() => s,
        _ => return reject(StatusCode::BAD_REQUEST, msg::MISSING_SIGNATURE),
    };

    match state.gateway.verify_webhook_signature(&body, signature) {
        Ok(true) => {}
        Ok(false) => {
            tracing::error!("Invalid Paystack webhook signature");
            return reject(StatusCode::BAD_REQUEST, msg::INVALID_SIGNATURE);
        }
        Err(e) => {
            tracing::error!("Signature verification error: {}", e);
            return reject(StatusCode::INTERNAL_SERVER_ERROR, msg::INVALID_WEBHOOK_SECRET);
        }
    }

    let event = match PaystackWebhookEvent::parse(&body) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to parse Paystack webhook: {}", e);
            return reject(StatusCode::BAD_REQUEST, msg::INVALID_JSON);
        }
    };

    match event.charge_success() {
        Some(charge) => handle_charge_success(&state, charge),
        None => {
            tracing::debug!(event = %event.event, "Paystack event ignored");
            received()
        }
    }
}

fn handle_charge_success(state: &AppState, charge: ChargeSuccess) -> WebhookResult {
    let Some(order_id) = charge.order_id else {
        tracing::warn!(
            reference = ?charge.reference,
            "charge.success without order_id in metadata"
        );
        return received();
    };

    let conn = match state.db.get() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("DB connection error: {}", e);
            return reject(StatusCode::INTERNAL_SERVER_ERROR, msg::WEBHOOK_HANDLER_FAILED);
        }
    };

    let previous = match queries::get_order_by_id(&conn, &order_id) {
        Ok(Some(order)) => order.status,
        Ok(None) => {
            tracing::error!(order_id = %order_id, "charge.success for unknown order");
            return reject(StatusCode::INTERNAL_SERVER_ERROR, msg::WEBHOOK_HANDLER_FAILED);
        }
        Err(e) => {
            tracing::error!("DB error: {}", e);
            return reject(StatusCode::INTERNAL_SERVER_ERROR, msg::WEBHOOK_HANDLER_FAILED);
        }
    };

    match queries::confirm_order_payment(&conn, &order_id, charge.reference.as_deref()) {
        Ok(true) => {
            match previous {
                OrderStatus::Cancelled => tracing::error!(
                    order_id = %order_id,
                    reference = ?charge.reference,
                    "Payment received for cancelled order, reopened as PROCESSING"
                ),
                OrderStatus::Shipped | OrderStatus::Delivered => tracing::warn!(
                    order_id = %order_id,
                    reference = ?charge.reference,
                    status = %previous.as_ref(),
                    "Payment received for fulfilled order, reference stored"
                ),
                OrderStatus::Pending | OrderStatus::Processing => tracing::info!(
                    order_id = %order_id,
                    reference = ?charge.reference,
                    "Order payment confirmed"
                ),
            }
            received()
        }
        Ok(false) => {
            tracing::error!(order_id = %order_id, "Order vanished during payment confirmation");
            reject(StatusCode::INTERNAL_SERVER_ERROR, msg::WEBHOOK_HANDLER_FAILED)
        }
        Err(e) => {
            tracing::error!(order_id = %order_id, "Failed to confirm order payment: {}", e);
            reject(StatusCode::INTERNAL_SERVER_ERROR, msg::WEBHOOK_HANDLER_FAILED)
        }
    }
}
