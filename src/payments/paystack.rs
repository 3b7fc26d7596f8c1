use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::crypto::verify_payload_signature;
use crate::error::{AppError, Result, msg};

/// Header carrying the hex HMAC-SHA512 of the webhook body.
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Event name for a completed charge.
pub const CHARGE_SUCCESS: &str = "charge.success";

/// Delays before each retry of a transient gateway failure.
const RETRY_DELAYS_MS: &[u64] = &[250, 1000, 4000];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionMetadata {
    pub order_id: String,
    pub user_id: String,
}

/// Body of `POST /transaction/initialize`. `amount` is in minor units.
#[derive(Debug, Clone, Serialize)]
pub struct InitializeTransaction {
    pub email: String,
    pub amount: i64,
    pub currency: String,
    pub reference: String,
    pub callback_url: String,
    pub metadata: TransactionMetadata,
}

/// A transaction the gateway accepted, ready for browser redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializedTransaction {
    pub authorization_url: String,
    pub reference: String,
}

#[derive(Debug, Deserialize)]
struct InitializeResponse {
    #[serde(default)]
    status: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<InitializeResponseData>,
}

#[derive(Debug, Deserialize)]
struct InitializeResponseData {
    #[serde(default)]
    authorization_url: Option<String>,
    #[serde(default)]
    reference: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaystackClient {
    client: Client,
    secret_key: String,
    base_url: String,
    retry_delays: Vec<Duration>,
}

impl PaystackClient {
    pub fn new(secret_key: &str, base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            secret_key: secret_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_delays: RETRY_DELAYS_MS
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
        }
    }

    /// Override the retry schedule. An empty schedule disables retries.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    /// Create a transaction and obtain the hosted checkout URL.
    ///
    /// Transport errors, 429 and 5xx responses are retried on the configured
    /// schedule with the same reference. Rejections (4xx, `status: false`,
    /// missing `authorization_url`) fail immediately.
    pub async fn initialize_transaction(
        &self,
        request: &InitializeTransaction,
    ) -> Result<InitializedTransaction> {
        let mut last_error: Option<AppError> = None;

        for (attempt, delay) in std::iter::once(Duration::ZERO)
            .chain(self.retry_delays.iter().copied())
            .enumerate()
        {
            if !delay.is_zero() {
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    reference = %request.reference,
                    "Retrying Paystack initialize after transient failure"
                );
                tokio::time::sleep(delay).await;
            }

            match self.send_initialize(request).await {
                Ok(transaction) => {
                    if attempt > 0 {
                        tracing::info!(
                            attempt,
                            reference = %transaction.reference,
                            "Paystack initialize succeeded after retry"
                        );
                    }
                    return Ok(transaction);
                }
                Err((error, true)) => last_error = Some(error),
                Err((error, false)) => return Err(error),
            }
        }

        tracing::error!(
            reference = %request.reference,
            attempts = self.retry_delays.len() + 1,
            "Paystack initialize failed after all retries"
        );

        Err(last_error
            .unwrap_or_else(|| AppError::UpstreamFailure(msg::GATEWAY_UNAVAILABLE.into())))
    }

    /// Single initialize attempt. The bool in the error marks it as transient.
    async fn send_initialize(
        &self,
        request: &InitializeTransaction,
    ) -> std::result::Result<InitializedTransaction, (AppError, bool)> {
        let response = self
            .client
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    timeout = e.is_timeout(),
                    "Failed to reach Paystack"
                );
                (AppError::UpstreamFailure(msg::GATEWAY_UNAVAILABLE.into()), true)
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<InitializeResponse>(&body).ok();
        let gateway_message = parsed
            .as_ref()
            .and_then(|r| r.message.clone())
            .filter(|m| !m.trim().is_empty());

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            tracing::warn!(status = %status, body = %body, "Paystack returned transient error");
            return Err((
                AppError::UpstreamFailure(
                    gateway_message.unwrap_or_else(|| msg::GATEWAY_UNAVAILABLE.into()),
                ),
                true,
            ));
        }

        let rejected = |message: Option<String>| {
            tracing::error!(status = %status, body = %body, "Paystack initialize failed");
            (
                AppError::UpstreamFailure(
                    message.unwrap_or_else(|| msg::PAYMENT_INIT_FAILED.into()),
                ),
                false,
            )
        };

        let Some(parsed) = parsed else {
            return Err(rejected(None));
        };

        let accepted = parsed.status && status.is_success();
        let Some(data) = parsed.data.filter(|_| accepted) else {
            return Err(rejected(gateway_message));
        };
        let Some(authorization_url) = data.authorization_url.filter(|u| !u.is_empty()) else {
            return Err(rejected(gateway_message));
        };

        Ok(InitializedTransaction {
            authorization_url,
            reference: data
                .reference
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| request.reference.clone()),
        })
    }

    /// Verify a webhook body against the `x-paystack-signature` value.
    /// Paystack signs with the account secret key.
    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<bool> {
        verify_payload_signature(&self.secret_key, payload, signature)
    }
}

/// Inbound webhook envelope. Only `charge.success` carries data we act on.
#[derive(Debug, Deserialize)]
pub struct PaystackWebhookEvent {
    /// Event name; anything other than a string is treated as an unknown event.
    #[serde(default)]
    pub event: serde_json::Value,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Fields of a `charge.success` event used to settle an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeSuccess {
    /// From `data.metadata.order_id`, falling back to `data.order_id`.
    pub order_id: Option<String>,
    pub reference: Option<String>,
}

impl PaystackWebhookEvent {
    pub fn parse(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }

    /// Returns the charge details for a `charge.success` event with a data object.
    pub fn charge_success(&self) -> Option<ChargeSuccess> {
        if self.event.as_str() != Some(CHARGE_SUCCESS) || !self.data.is_object() {
            return None;
        }

        // metadata may arrive as an object, an empty string, or not at all
        let order_id = id_field(&self.data["metadata"]["order_id"])
            .or_else(|| id_field(&self.data["order_id"]));

        Some(ChargeSuccess {
            order_id,
            reference: self.data["reference"]
                .as_str()
                .filter(|r| !r.is_empty())
                .map(String::from),
        })
    }
}

fn id_field(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
