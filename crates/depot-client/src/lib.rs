//! # depot-client -- Typed clients for hosted services
//!
//! Depot owns the current-build slot and nothing else. Accounts live in the
//! identity provider and payments in the payment provider; this crate is the
//! only path the rest of the workspace uses to reach them.
//!
//! - **Identity** via the Identity Toolkit admin REST API (the backend of
//!   Firebase Authentication): account listing and enable/disable.
//! - **Payments** via the Stripe REST API: payment intents and checkout
//!   session status.
//!
//! The identity client signs in as a service account and refreshes its own
//! access tokens; the payment client uses a static secret key.
//!
//! Each client is configured independently (see [`config`]) so a deployment
//! can run with only one provider wired up.

pub mod config;
pub mod error;
pub mod identity;
pub mod payments;
pub(crate) mod retry;
mod token;

pub use config::{ConfigError, IdentityConfig, PaymentConfig};
pub use error::ProviderError;
pub use identity::IdentityClient;
pub use payments::PaymentClient;

use std::time::Duration;

use url::Url;

pub(crate) const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Build an HTTP client with a request timeout and, for static
/// credentials, a default bearer token.
pub(crate) fn http_client(
    token: Option<&str>,
    timeout_secs: u64,
) -> Result<reqwest::Client, ProviderError> {
    let mut headers = reqwest::header::HeaderMap::new();
    if let Some(token) = token {
        headers.insert(reqwest::header::AUTHORIZATION, bearer_header(token)?);
    }

    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .default_headers(headers)
        .build()
        .map_err(|e| ProviderError::Http {
            endpoint: "client_init".into(),
            source: e,
        })
}

/// Sensitive `Authorization: Bearer` header value.
pub(crate) fn bearer_header(token: &str) -> Result<reqwest::header::HeaderValue, ProviderError> {
    let mut value = reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| ProviderError::Config(ConfigError::InvalidToken))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Append path segments to `base`, percent-encoding each one.
pub(crate) fn endpoint_url(base: &Url, segments: &[&str]) -> Result<Url, ProviderError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| {
            ProviderError::Config(ConfigError::InvalidUrl(
                base.to_string(),
                "URL cannot be a base".into(),
            ))
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Turn a non-2xx response into [`ProviderError::ApiError`].
pub(crate) async fn api_error(endpoint: &str, resp: reqwest::Response) -> ProviderError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    ProviderError::ApiError {
        endpoint: endpoint.to_string(),
        status,
        body,
    }
}
