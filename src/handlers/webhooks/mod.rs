pub mod paystack;

pub use paystack::handle_paystack_webhook;

use axum::{Router, routing::post};

use crate::db::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/webhooks/paystack", post(handle_paystack_webhook))
}
