use axum::{
    extract::{Extension, State},
    http::HeaderMap,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result, msg};
use crate::extractors::Json;
use crate::id::payment_reference;
use crate::models::{Order, SessionUser};
use crate::payments::{InitializeTransaction, InitializedTransaction, TransactionMetadata};
use crate::util::callback_base_url;

use super::orders::load_user_order;

#[derive(Debug, Deserialize)]
pub struct InitializePaymentRequest {
    #[serde(default, rename = "orderId")]
    pub order_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InitializePaymentResponse {
    pub authorization_url: String,
    pub reference: String,
}

/// POST /api/payment
pub async fn initialize_payment(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    Json(request): Json<InitializePaymentRequest>,
) -> Result<Json<InitializePaymentResponse>> {
    let order_id = request.order_id.as_deref().unwrap_or_default();
    let transaction = start_payment(&state, &user, order_id, &headers).await?;

    Ok(Json(InitializePaymentResponse {
        authorization_url: transaction.authorization_url,
        reference: transaction.reference,
    }))
}

/// Initialize a gateway transaction for one of the user's orders.
///
/// The order is claimed atomically before the gateway is called, so two
/// concurrent attempts cannot both reach the gateway. Paid orders and orders
/// with an attempt in flight are rejected as bad requests without any
/// outbound call. The claim is released once the gateway answers, whatever
/// the outcome.
pub async fn start_payment(
    state: &AppState,
    user: &SessionUser,
    order_id: &str,
    headers: &HeaderMap,
) -> Result<InitializedTransaction> {
    let order_id = order_id.trim();
    if order_id.is_empty() {
        return Err(AppError::BadRequest(msg::ORDER_ID_REQUIRED.into()));
    }

    let order = {
        let conn = state.db.get()?;
        let order = load_user_order(&conn, user, order_id)?;

        if order.is_paid() {
            return Err(AppError::BadRequest(msg::ORDER_ALREADY_PAID.into()));
        }

        if !queries::try_claim_order_initialization(&conn, &order.id, &user.id)? {
            // Lost the race: either the webhook settled it or another attempt holds it.
            let paid = queries::get_order_by_id(&conn, &order.id)?.is_some_and(|o| o.is_paid());
            let reason = if paid {
                msg::ORDER_ALREADY_PAID
            } else {
                msg::PAYMENT_IN_PROGRESS
            };
            tracing::info!(order_id = %order.id, reason, "Payment initialization rejected");
            return Err(AppError::BadRequest(reason.into()));
        }

        order
    };

    let result = initialize_claimed(state, user, &order, headers).await;

    let issued = result.as_ref().ok().map(|t| t.reference.as_str());
    let released = state
        .db
        .get()
        .map_err(AppError::from)
        .and_then(|conn| queries::release_order_initialization(&conn, &order.id, issued));
    if let Err(e) = released {
        // The claim expires on its own after INIT_LOCK_TTL_SECS.
        tracing::error!(order_id = %order.id, "Failed to release initialization claim: {}", e);
    }

    result
}

async fn initialize_claimed(
    state: &AppState,
    user: &SessionUser,
    order: &Order,
    headers: &HeaderMap,
) -> Result<InitializedTransaction> {
    let pricing = order.pricing();
    let reference = payment_reference(&order.id, Utc::now().timestamp_millis());
    let callback_url = format!(
        "{}/order-confirmation/{}",
        callback_base_url(headers, state.public_base_url.as_deref()),
        order.id
    );

    let request = InitializeTransaction {
        email: user.email.clone(),
        amount: pricing.amount_minor,
        currency: state.currency.clone(),
        reference,
        callback_url,
        metadata: TransactionMetadata {
            order_id: order.id.clone(),
            user_id: user.id.clone(),
        },
    };

    tracing::info!(
        order_id = %order.id,
        amount = request.amount,
        currency = %request.currency,
        reference = %request.reference,
        "Initializing payment"
    );

    let transaction = state.gateway.initialize_transaction(&request).await?;

    tracing::info!(
        order_id = %order.id,
        reference = %transaction.reference,
        "Payment initialized"
    );

    Ok(transaction)
}
