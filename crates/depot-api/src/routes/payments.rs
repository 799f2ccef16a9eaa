//! # Payment Routes
//!
//! Public endpoints the storefront calls: create a payment intent for the
//! embedded card form and read back a hosted checkout session.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use depot_client::PaymentClient;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, ErrorBody};
use crate::extractors::{extract_query, extract_validated_json, Validate};
use crate::state::AppState;

/// Helper: extract the payment client from AppState or return 503.
fn require_payments(state: &AppState) -> Result<&PaymentClient, AppError> {
    state.payments.as_ref().ok_or_else(|| {
        AppError::service_unavailable("Payment provider not configured. Set STRIPE_SECRET_KEY.")
    })
}

// -- DTOs ---------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentIntentRequest {
    /// Amount in the smallest currency unit (cents for USD).
    #[serde(default)]
    pub amount: Option<i64>,
    /// ISO 4217 code; defaults to the configured currency.
    #[serde(default)]
    pub currency: Option<String>,
}

impl Validate for CreatePaymentIntentRequest {
    fn validate(&self) -> Result<(), String> {
        match self.amount {
            Some(a) if a > 0 => {}
            _ => return Err("Invalid amount provided".into()),
        }
        if let Some(c) = &self.currency {
            if c.len() != 3 || !c.chars().all(|ch| ch.is_ascii_alphabetic()) {
                return Err("Invalid currency provided".into());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentResponse {
    pub client_secret: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CheckoutStatusQuery {
    /// Checkout session id from the return URL.
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderDetails {
    pub amount: Option<u64>,
    pub currency: Option<String>,
    pub payment_status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutStatusResponse {
    pub status: Option<String>,
    pub customer_email: Option<String>,
    pub order_details: OrderDetails,
}

// -- Handlers -----------------------------------------------------------------

/// POST /api/create-payment-intent
#[utoipa::path(
    post,
    path = "/api/create-payment-intent",
    tag = "payments",
    request_body = CreatePaymentIntentRequest,
    responses(
        (status = 200, description = "Payment intent created", body = CreatePaymentIntentResponse),
        (status = 400, description = "Invalid amount or currency", body = ErrorBody),
        (status = 500, description = "Provider fault", body = ErrorBody),
        (status = 503, description = "Payment provider not configured", body = ErrorBody),
    )
)]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    body: Result<Json<CreatePaymentIntentRequest>, JsonRejection>,
) -> Result<Json<CreatePaymentIntentResponse>, AppError> {
    const FAILED: &str = "Failed to create payment intent";

    let client = require_payments(&state)?;
    let req = extract_validated_json(body)?;
    let amount = req
        .amount
        .and_then(|a| u64::try_from(a).ok())
        .ok_or_else(|| AppError::Validation("Invalid amount provided".into()))?;

    let intent = client
        .create_payment_intent(amount, req.currency.as_deref())
        .await
        .map_err(|e| AppError::from_provider(e, FAILED))?;

    let client_secret = intent
        .client_secret
        .ok_or_else(|| AppError::internal(FAILED, format!("intent {} has no client secret", intent.id)))?;
    Ok(Json(CreatePaymentIntentResponse { client_secret }))
}

/// GET /api/checkout-status
#[utoipa::path(
    get,
    path = "/api/checkout-status",
    tag = "payments",
    params(CheckoutStatusQuery),
    responses(
        (status = 200, description = "Session status", body = CheckoutStatusResponse),
        (status = 400, description = "Missing session_id", body = ErrorBody),
        (status = 404, description = "Unknown session", body = ErrorBody),
        (status = 503, description = "Payment provider not configured", body = ErrorBody),
    )
)]
pub async fn checkout_status(
    State(state): State<AppState>,
    query: Result<Query<CheckoutStatusQuery>, QueryRejection>,
) -> Result<Json<CheckoutStatusResponse>, AppError> {
    let client = require_payments(&state)?;
    let session_id = extract_query(query)?
        .session_id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Session ID is required".into()))?;

    let session = client
        .checkout_session(&session_id)
        .await
        .map_err(|e| AppError::from_provider(e, "Failed to fetch checkout session"))?
        .ok_or_else(|| AppError::NotFound("Session not found".into()))?;

    Ok(Json(CheckoutStatusResponse {
        customer_email: session.customer_email().map(str::to_owned),
        status: session.status,
        order_details: OrderDetails {
            amount: session.amount_total,
            currency: session.currency,
            payment_status: session.payment_status,
        },
    }))
}
