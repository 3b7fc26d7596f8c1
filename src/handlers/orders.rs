use axum::extract::{Extension, State};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::{OptionExt, Result, msg};
use crate::extractors::{Json, OrderId};
use crate::models::{Order, OrderPricing, OrderStatus, SessionUser};

#[derive(Debug, Serialize)]
pub struct OrderSummary {
    pub id: String,
    pub status: OrderStatus,
    pub subtotal: f64,
    pub shipping: f64,
    pub tax: f64,
    pub total: f64,
    pub amount_minor: i64,
    pub currency: String,
    pub payment_reference: Option<String>,
}

impl OrderSummary {
    pub fn new(order: &Order, currency: &str) -> Self {
        let OrderPricing {
            subtotal,
            shipping,
            tax,
            total,
            amount_minor,
        } = order.pricing();
        Self {
            id: order.id.clone(),
            status: order.status,
            subtotal,
            shipping,
            tax,
            total,
            amount_minor,
            currency: currency.to_string(),
            payment_reference: order.payment_reference.clone(),
        }
    }
}

/// Load an order owned by `user`. Orders belonging to someone else are
/// reported as not found.
pub fn load_user_order(conn: &Connection, user: &SessionUser, order_id: &str) -> Result<Order> {
    queries::get_order_for_user(conn, order_id, &user.id)?.or_not_found(msg::ORDER_NOT_FOUND)
}

/// GET /api/orders/{order_id}
pub async fn get_order(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    OrderId(order_id): OrderId,
) -> Result<Json<OrderSummary>> {
    let conn = state.db.get()?;
    let order = load_user_order(&conn, &user, &order_id)?;
    Ok(Json(OrderSummary::new(&order, &state.currency)))
}
