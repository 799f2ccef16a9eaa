//! Contract tests for PaymentClient against the Stripe REST API.
//!
//! | Method | Path | Test |
//! |--------|------|------|
//! | POST   | `/v1/payment_intents` | `create_payment_intent_*` |
//! | GET    | `/v1/checkout/sessions/{id}` | `checkout_session_*` |

use depot_client::{PaymentClient, PaymentConfig, ProviderError};
use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(mock_server: &MockServer) -> PaymentClient {
    let config = PaymentConfig {
        base_url: mock_server.uri().parse().unwrap(),
        secret_key: "sk_test_123".to_string().into(),
        default_currency: "usd".into(),
        timeout_secs: 5,
    };
    PaymentClient::new(&config).unwrap()
}

// ── POST /v1/payment_intents ─────────────────────────────────────────

#[tokio::test]
async fn create_payment_intent_posts_form_with_defaults() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .and(header("authorization", "Bearer sk_test_123"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(header_exists("idempotency-key"))
        .and(body_string_contains("amount=2500"))
        .and(body_string_contains("currency=usd"))
        .and(body_string_contains(
            "automatic_payment_methods%5Benabled%5D=true",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "pi_123",
            "object": "payment_intent",
            "client_secret": "pi_123_secret_abc",
            "amount": 2500,
            "currency": "usd",
            "status": "requires_payment_method"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let intent = test_client(&mock_server)
        .create_payment_intent(2500, None)
        .await
        .unwrap();
    assert_eq!(intent.id, "pi_123");
    assert_eq!(intent.client_secret.as_deref(), Some("pi_123_secret_abc"));
    assert_eq!(intent.amount, 2500);
}

#[tokio::test]
async fn create_payment_intent_lowercases_explicit_currency() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .and(body_string_contains("currency=eur"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "pi_9", "client_secret": "s", "amount": 100, "currency": "eur"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let intent = test_client(&mock_server)
        .create_payment_intent(100, Some("EUR"))
        .await
        .unwrap();
    assert_eq!(intent.currency, "eur");
}

#[tokio::test]
async fn create_payment_intent_handles_card_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .respond_with(ResponseTemplate::new(402).set_body_json(serde_json::json!({
            "error": { "type": "card_error", "message": "declined" }
        })))
        .mount(&mock_server)
        .await;

    let err = test_client(&mock_server)
        .create_payment_intent(100, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::ApiError { status: 402, .. }));
}

#[tokio::test]
async fn create_payment_intent_retries_unavailable_with_same_idempotency_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .respond_with(
            ResponseTemplate::new(503)
                .insert_header("Retry-After", "0")
                .set_body_json(serde_json::json!({
                    "error": { "type": "api_error", "message": "overloaded" }
                })),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "pi_once", "client_secret": "pi_once_secret", "amount": 500, "currency": "usd"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let intent = test_client(&mock_server)
        .create_payment_intent(500, None)
        .await
        .unwrap();
    assert_eq!(intent.id, "pi_once");

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let keys: Vec<_> = requests
        .iter()
        .map(|r| r.headers.get("idempotency-key").unwrap().to_str().unwrap().to_owned())
        .collect();
    assert_eq!(keys[0], keys[1], "a retry must reuse the idempotency key");
}

#[tokio::test]
async fn create_payment_intent_gives_up_after_repeated_throttling() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .expect(4)
        .mount(&mock_server)
        .await;

    let err = test_client(&mock_server)
        .create_payment_intent(500, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::ApiError { status: 429, .. }));
}

// ── GET /v1/checkout/sessions/{id} ───────────────────────────────────

#[tokio::test]
async fn checkout_session_returns_session() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_test_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "cs_test_1",
            "status": "complete",
            "payment_status": "paid",
            "amount_total": 4200,
            "currency": "usd",
            "customer_details": { "email": "buyer@example.com" }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = test_client(&mock_server)
        .checkout_session("cs_test_1")
        .await
        .unwrap()
        .expect("session should exist");
    assert_eq!(session.status.as_deref(), Some("complete"));
    assert_eq!(session.payment_status.as_deref(), Some("paid"));
    assert_eq!(session.customer_email(), Some("buyer@example.com"));
}

#[tokio::test]
async fn checkout_session_returns_none_on_404() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": { "type": "invalid_request_error", "code": "resource_missing" }
        })))
        .mount(&mock_server)
        .await;

    let session = test_client(&mock_server)
        .checkout_session("cs_missing")
        .await
        .unwrap();
    assert!(session.is_none());
}

#[tokio::test]
async fn checkout_session_handles_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_test_1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&mock_server)
        .await;

    let err = test_client(&mock_server)
        .checkout_session("cs_test_1")
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::ApiError { status: 500, .. }));
}
