use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// User-facing error messages, kept in one place so handlers and tests agree.
pub mod msg {
    pub const ORDER_ID_REQUIRED: &str = "Order ID is required";
    pub const ORDER_NOT_FOUND: &str = "Order not found";
    pub const ORDER_ALREADY_PAID: &str = "Order is already paid";
    pub const PAYMENT_IN_PROGRESS: &str = "Payment initialization already in progress for this order";
    pub const PAYMENT_INIT_FAILED: &str = "Failed to initialize payment";
    pub const GATEWAY_UNAVAILABLE: &str = "Payment gateway unavailable";
    pub const MISSING_SIGNATURE: &str = "Missing x-paystack-signature";
    pub const INVALID_SIGNATURE: &str = "Invalid signature";
    pub const INVALID_WEBHOOK_SECRET: &str = "Invalid webhook secret";
    pub const INVALID_JSON: &str = "Invalid JSON";
    pub const WEBHOOK_HANDLER_FAILED: &str = "Webhook handler failed";
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),

    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::SignatureInvalid(_) | AppError::Json(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Pool(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to an end user. Internal failures are not leaked.
    pub fn public_message(&self) -> String {
        match self {
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::UpstreamFailure(msg)
            | AppError::SignatureInvalid(msg) => msg.clone(),
            AppError::Unauthorized => "Unauthorized".to_string(),
            AppError::Json(_) => msg::INVALID_JSON.to_string(),
            AppError::Database(_) | AppError::Pool(_) | AppError::Internal(_) => {
                "Internal error".to_string()
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (error, details) = match &self {
            AppError::NotFound(msg) => ("Not found", Some(msg.clone())),
            AppError::BadRequest(msg) => ("Bad request", Some(msg.clone())),
            AppError::Unauthorized => ("Unauthorized", None),
            AppError::UpstreamFailure(msg) => {
                tracing::warn!("Upstream failure: {}", msg);
                ("Bad gateway", Some(msg.clone()))
            }
            AppError::SignatureInvalid(msg) => ("Bad request", Some(msg.clone())),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                ("Internal server error", None)
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                ("Internal server error", None)
            }
            AppError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                ("Invalid JSON", Some(e.to_string()))
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal server error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (self.status(), Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Converts `Option<T>` lookups into `AppError::NotFound`.
pub trait OptionExt<T> {
    fn or_not_found(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, message: &str) -> Result<T> {
        self.ok_or_else(|| AppError::NotFound(message.to_string()))
    }
}
