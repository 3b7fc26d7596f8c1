//! Server-rendered pay button and confirmation page.
//!
//! The pay button posts to `/checkout/{order_id}/pay`, which runs the same
//! initialization as `POST /api/payment` and answers with a full-page
//! redirect to the gateway. Failures render the message and leave the order
//! untouched.

use axum::{
    extract::{Extension, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};

use crate::db::AppState;
use crate::error::AppError;
use crate::extractors::OrderId;
use crate::models::{Order, OrderStatus, SessionUser};
use crate::util::escape_html;

use super::orders::load_user_order;
use super::payment::start_payment;

fn page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{}</title></head><body>{}</body></html>",
        escape_html(title),
        body
    )
}

fn error_page(error: &AppError) -> Response {
    let message = escape_html(&error.public_message());
    let body = format!(
        "<h1>Payment could not be started</h1><p role=\"alert\">{}</p>",
        message
    );
    (error.status(), Html(page("Payment error", &body))).into_response()
}

fn format_amount(amount: f64, currency: &str) -> String {
    format!("{} {:.2}", escape_html(currency), amount)
}

/// GET /checkout/{order_id}
pub async fn checkout_page(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    OrderId(order_id): OrderId,
) -> Response {
    let order = match state
        .db
        .get()
        .map_err(AppError::from)
        .and_then(|conn| load_user_order(&conn, &user, &order_id))
    {
        Ok(order) => order,
        Err(e) => return error_page(&e),
    };

    Html(page("Checkout", &checkout_body(&order, &state.currency))).into_response()
}

fn checkout_body(order: &Order, currency: &str) -> String {
    let pricing = order.pricing();
    let summary = format!(
        "<dl><dt>Subtotal</dt><dd>{}</dd><dt>Shipping</dt><dd>{}</dd><dt>Tax</dt><dd>{}</dd><dt>Total</dt><dd>{}</dd></dl>",
        format_amount(pricing.subtotal, currency),
        format_amount(pricing.shipping, currency),
        format_amount(pricing.tax, currency),
        format_amount(pricing.total, currency),
    );

    if order.is_paid() {
        return format!("<h1>Order paid</h1>{}<p>This order has already been paid.</p>", summary);
    }

    format!(
        "<h1>Checkout</h1>{}\
         <p>You will be redirected to Paystack to complete your payment securely.</p>\
         <form method=\"post\" action=\"/checkout/{}/pay\"><button type=\"submit\">Pay with Paystack</button></form>",
        summary,
        escape_html(&order.id)
    )
}

/// POST /checkout/{order_id}/pay
pub async fn pay_order(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    OrderId(order_id): OrderId,
    headers: HeaderMap,
) -> Response {
    match start_payment(&state, &user, &order_id, &headers).await {
        Ok(transaction) => Redirect::to(&transaction.authorization_url).into_response(),
        Err(e) => {
            tracing::warn!(order_id = %order_id, "Checkout trigger failed: {}", e);
            error_page(&e)
        }
    }
}

/// GET /order-confirmation/{order_id}
///
/// Gateway callback target. Shows the current status; the webhook is what
/// actually settles the order, so a PENDING order here means "not yet".
pub async fn order_confirmation(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    OrderId(order_id): OrderId,
) -> Response {
    let order = match state
        .db
        .get()
        .map_err(AppError::from)
        .and_then(|conn| load_user_order(&conn, &user, &order_id))
    {
        Ok(order) => order,
        Err(e) => return error_page(&e),
    };

    let message = match order.status {
        OrderStatus::Pending => "We are waiting for the payment confirmation. Refresh in a moment.",
        OrderStatus::Processing => "Payment received. Your order is being processed.",
        OrderStatus::Shipped => "Your order has shipped.",
        OrderStatus::Delivered => "Your order has been delivered.",
        OrderStatus::Cancelled => "This order was cancelled.",
    };

    let body = format!(
        "<h1>Order {}</h1><p data-status=\"{}\">{}</p>",
        escape_html(&order.id),
        order.status.as_ref(),
        message
    );

    (StatusCode::OK, Html(page("Order confirmation", &body))).into_response()
}
