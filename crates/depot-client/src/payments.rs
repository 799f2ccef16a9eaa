//! Typed client for the Stripe REST API.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST   | `/v1/payment_intents` | Create payment intent (form-encoded) |
//! | GET    | `/v1/checkout/sessions/{id}` | Retrieve checkout session |

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PaymentConfig;
use crate::error::ProviderError;

/// A payment intent as returned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Secret handed to the browser to confirm the payment.
    #[serde(default)]
    pub client_secret: Option<String>,
    pub amount: u64,
    pub currency: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Customer details attached to a completed checkout session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

/// A hosted checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// `open`, `complete` or `expired`.
    #[serde(default)]
    pub status: Option<String>,
    /// `paid`, `unpaid` or `no_payment_required`.
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub amount_total: Option<u64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
}

impl CheckoutSession {
    /// Email the customer entered at checkout, if any.
    pub fn customer_email(&self) -> Option<&str> {
        self.customer_details.as_ref()?.email.as_deref()
    }
}

/// Client for payment operations.
#[derive(Debug, Clone)]
pub struct PaymentClient {
    http: reqwest::Client,
    base_url: url::Url,
    default_currency: String,
}

impl PaymentClient {
    /// Create a client from configuration.
    pub fn new(config: &PaymentConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            http: crate::http_client(Some(&config.secret_key), config.timeout_secs)?,
            base_url: config.base_url.clone(),
            default_currency: config.default_currency.clone(),
        })
    }

    /// Currency used when the caller does not name one.
    pub fn default_currency(&self) -> &str {
        &self.default_currency
    }

    /// Create a payment intent for `amount` in the smallest currency unit.
    ///
    /// Calls `POST {base_url}/v1/payment_intents`. One idempotency key is
    /// generated per call and reused across transport retries, so a retry
    /// never creates a second intent.
    pub async fn create_payment_intent(
        &self,
        amount: u64,
        currency: Option<&str>,
    ) -> Result<PaymentIntent, ProviderError> {
        let endpoint = "POST /v1/payment_intents";
        let url = crate::endpoint_url(&self.base_url, &["v1", "payment_intents"])?;
        let currency = currency
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| self.default_currency.clone());
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("amount", &amount.to_string())
            .append_pair("currency", &currency)
            .append_pair("automatic_payment_methods[enabled]", "true")
            .finish();
        let idempotency_key = Uuid::new_v4().to_string();

        let resp = crate::retry::retry_send(endpoint, || {
            self.http
                .post(url.clone())
                .header(reqwest::header::CONTENT_TYPE, crate::FORM_CONTENT_TYPE)
                .header("Idempotency-Key", idempotency_key.as_str())
                .body(form.clone())
                .send()
        })
        .await
        .map_err(|e| ProviderError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;

        if !resp.status().is_success() {
            return Err(crate::api_error(endpoint, resp).await);
        }

        let intent: PaymentIntent =
            resp.json()
                .await
                .map_err(|e| ProviderError::Deserialization {
                    endpoint: endpoint.into(),
                    source: e,
                })?;
        tracing::info!(intent_id = %intent.id, amount, currency = %intent.currency, "payment intent created");
        Ok(intent)
    }

    /// Retrieve a checkout session by id.
    ///
    /// Calls `GET {base_url}/v1/checkout/sessions/{id}`. Returns `Ok(None)`
    /// when the provider does not know the session.
    pub async fn checkout_session(
        &self,
        session_id: &str,
    ) -> Result<Option<CheckoutSession>, ProviderError> {
        let endpoint = "GET /v1/checkout/sessions";
        let url = crate::endpoint_url(&self.base_url, &["v1", "checkout", "sessions", session_id])?;

        let resp = crate::retry::retry_send(endpoint, || self.http.get(url.clone()).send())
            .await
            .map_err(|e| ProviderError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !resp.status().is_success() {
            return Err(crate::api_error(endpoint, resp).await);
        }

        resp.json()
            .await
            .map(Some)
            .map_err(|e| ProviderError::Deserialization {
                endpoint: endpoint.into(),
                source: e,
            })
    }
}
