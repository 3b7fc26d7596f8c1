use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Flat shipping fee in major currency units.
pub const SHIPPING_FEE: f64 = 10.0;

/// Tax applied to the order subtotal.
pub const TAX_RATE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    /// Subtotal before shipping and tax, in major units.
    pub total: f64,
    pub shipping_address_id: Option<String>,
    /// Gateway transaction reference, set once payment is confirmed.
    pub payment_reference: Option<String>,
    pub status: OrderStatus,
    /// Unix seconds when an initialization claimed this order; None when idle.
    #[serde(skip_serializing)]
    pub init_locked_at: Option<i64>,
    /// Reference sent to the gateway by the most recent successful initialization.
    pub last_init_reference: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    pub fn is_paid(&self) -> bool {
        self.payment_reference.is_some()
    }

    pub fn pricing(&self) -> OrderPricing {
        OrderPricing::from_subtotal(self.total)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateOrder {
    pub user_id: String,
    pub total: f64,
    #[serde(default)]
    pub shipping_address_id: Option<String>,
}

/// Priced breakdown of an order, in major units plus the charged minor-unit amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrderPricing {
    pub subtotal: f64,
    pub shipping: f64,
    pub tax: f64,
    pub total: f64,
    /// `round(total * 100)`: kobo for NGN, cents for USD.
    pub amount_minor: i64,
}

impl OrderPricing {
    pub fn from_subtotal(subtotal: f64) -> Self {
        let shipping = SHIPPING_FEE;
        let tax = subtotal * TAX_RATE;
        let total = subtotal + shipping + tax;
        Self {
            subtotal,
            shipping,
            tax,
            total,
            amount_minor: (total * 100.0).round() as i64,
        }
    }
}
