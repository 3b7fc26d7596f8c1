pub mod checkout;
pub mod orders;
pub mod payment;
pub mod public;
pub mod webhooks;

pub use checkout::{checkout_page, order_confirmation, pay_order};
pub use orders::get_order;
pub use payment::initialize_payment;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::db::AppState;
use crate::middleware::session_auth;

/// Routes that act on behalf of a signed-in storefront user.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/payment", post(initialize_payment))
        .route("/api/orders/{order_id}", get(get_order))
        .route("/checkout/{order_id}", get(checkout_page))
        .route("/checkout/{order_id}/pay", post(pay_order))
        .route("/order-confirmation/{order_id}", get(order_confirmation))
        .layer(middleware::from_fn_with_state(state, session_auth))
}

/// The complete application.
pub fn app(state: AppState) -> Router {
    Router::new()
        // Public endpoints (no auth)
        .merge(public::router())
        // Webhook endpoints (signature auth)
        .merge(webhooks::router())
        // Storefront endpoints (session auth)
        .merge(router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
