use std::env;

use crate::error::{AppError, Result};

pub const DEFAULT_GATEWAY_BASE_URL: &str = "https://api.paystack.co";
pub const DEFAULT_CURRENCY: &str = "NGN";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Public URL the gateway redirects browsers back to. When unset the
    /// callback base is derived from the request's Host header.
    pub public_base_url: Option<String>,
    /// Paystack secret key. Authenticates API calls and signs webhooks.
    pub secret_key: String,
    pub currency: String,
    pub gateway_base_url: String,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("ORDERPAY_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let secret_key = env::var("PAYSTACK_SECRET_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::Internal("Missing PAYSTACK_SECRET_KEY".into()))?;

        let currency = env::var("PAYSTACK_CURRENCY")
            .ok()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .ok()
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());

        Ok(Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "orderpay.db".to_string()),
            public_base_url,
            secret_key,
            currency,
            gateway_base_url: env::var("PAYSTACK_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GATEWAY_BASE_URL.to_string()),
            dev_mode,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
