//! Identifier and payment reference generation.
//!
//! Orders and users are normally created by the storefront, so their IDs are
//! opaque strings here. Locally generated IDs (dev seed, tests) use a short
//! entity prefix: `{prefix}_{uuid_simple}`.

use uuid::Uuid;

/// Entity types that can be created locally.
#[derive(Debug, Clone, Copy)]
pub enum EntityType {
    User,
    Order,
}

impl EntityType {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::User => "usr",
            Self::Order => "ord",
        }
    }

    pub fn gen_id(&self) -> String {
        format!("{}_{}", self.prefix(), Uuid::new_v4().as_simple())
    }
}

/// Build the gateway reference for an order payment attempt.
///
/// Format: `order_{order_id}_{unix_millis}`, with every character outside
/// `[A-Za-z0-9._-]` replaced by `_` (Paystack's allowed reference charset).
pub fn payment_reference(order_id: &str, timestamp_millis: i64) -> String {
    format!("order_{}_{}", order_id, timestamp_millis)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
