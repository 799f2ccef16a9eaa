//! Typed client for the Identity Toolkit admin API.
//!
//! Base URL: `identitytoolkit.googleapis.com`
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/v1/projects/{project}/accounts:batchGet` | List accounts |
//! | POST   | `/v1/projects/{project}/accounts:update` | Update account (enable / disable) |
//!
//! Requests carry an access token minted from the service account. A
//! `401` is answered once by discarding the cached token and retrying with
//! a freshly minted one.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::IdentityConfig;
use crate::error::ProviderError;
use crate::token::TokenSource;

/// Provider error code returned when `localId` names no account.
const USER_NOT_FOUND: &str = "USER_NOT_FOUND";

/// Provider id reported when an account has no linked federated provider.
const DEFAULT_PROVIDER_ID: &str = "password";

/// One account, as exposed to the admin console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub email_verified: bool,
    pub disabled: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub provider_id: String,
}

/// One page of accounts.
#[derive(Debug, Clone, Default)]
pub struct UserPage {
    pub users: Vec<UserRecord>,
    /// Present when the provider holds more accounts than were returned.
    pub next_page_token: Option<String>,
}

impl UserPage {
    /// Whether the provider reported further pages.
    pub fn has_more(&self) -> bool {
        self.next_page_token.is_some()
    }
}

// -- Wire types ---------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    users: Vec<WireUser>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    disabled: bool,
    /// Milliseconds since the epoch, as a decimal string.
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    last_login_at: Option<String>,
    #[serde(default)]
    provider_user_info: Vec<WireProviderInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProviderInfo {
    provider_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAccountRequest<'a> {
    local_id: &'a str,
    disable_user: bool,
}

fn millis_to_utc(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| s.parse::<i64>().ok())
        .and_then(DateTime::from_timestamp_millis)
}

impl From<WireUser> for UserRecord {
    fn from(w: WireUser) -> Self {
        let provider_id = w
            .provider_user_info
            .into_iter()
            .next()
            .map(|p| p.provider_id)
            .unwrap_or_else(|| DEFAULT_PROVIDER_ID.to_string());
        Self {
            created_at: millis_to_utc(w.created_at.as_deref()),
            last_login_at: millis_to_utc(w.last_login_at.as_deref()),
            uid: w.local_id,
            email: w.email,
            display_name: w.display_name,
            email_verified: w.email_verified,
            disabled: w.disabled,
            provider_id,
        }
    }
}

// -- Client -------------------------------------------------------------------

/// Client for account administration.
#[derive(Debug, Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    tokens: Arc<TokenSource>,
    base_url: url::Url,
    project_id: String,
}

impl IdentityClient {
    /// Create a client from configuration.
    ///
    /// Fails if the service-account key cannot be parsed. No token is
    /// minted until the first request.
    pub fn new(config: &IdentityConfig) -> Result<Self, ProviderError> {
        let http = crate::http_client(None, config.timeout_secs)?;
        Ok(Self {
            tokens: Arc::new(TokenSource::new(http.clone(), config)?),
            http,
            base_url: config.base_url.clone(),
            project_id: config.project_id.clone(),
        })
    }

    async fn send_once<F>(
        &self,
        endpoint: &str,
        build: &F,
        token: &str,
    ) -> Result<reqwest::Response, ProviderError>
    where
        F: Fn(&str) -> reqwest::RequestBuilder,
    {
        crate::retry::retry_send(endpoint, || build(token).send())
            .await
            .map_err(|e| ProviderError::Http {
                endpoint: endpoint.into(),
                source: e,
            })
    }

    /// Send with the cached access token, refreshing it once on `401`.
    async fn send_authorized<F>(
        &self,
        endpoint: &str,
        build: F,
    ) -> Result<reqwest::Response, ProviderError>
    where
        F: Fn(&str) -> reqwest::RequestBuilder,
    {
        let token = self.tokens.access_token().await?;
        let resp = self.send_once(endpoint, &build, &token).await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        tracing::warn!(endpoint, "identity provider rejected access token, minting a new one");
        self.tokens.invalidate().await;
        let token = self.tokens.access_token().await?;
        self.send_once(endpoint, &build, &token).await
    }

    fn accounts_url(&self, verb: &str) -> Result<url::Url, ProviderError> {
        crate::endpoint_url(
            &self.base_url,
            &["v1", "projects", &self.project_id, &format!("accounts:{verb}")],
        )
    }

    /// List up to `max_results` accounts.
    ///
    /// Calls `GET {base_url}/v1/projects/{project}/accounts:batchGet?maxResults=N`.
    pub async fn list_users(&self, max_results: u32) -> Result<UserPage, ProviderError> {
        let endpoint = "GET accounts:batchGet";
        let mut url = self.accounts_url("batchGet")?;
        url.query_pairs_mut()
            .append_pair("maxResults", &max_results.to_string());

        let resp = self
            .send_authorized(endpoint, |token| {
                self.http.get(url.clone()).bearer_auth(token)
            })
            .await?;

        if !resp.status().is_success() {
            return Err(crate::api_error(endpoint, resp).await);
        }

        let page: BatchGetResponse =
            resp.json()
                .await
                .map_err(|e| ProviderError::Deserialization {
                    endpoint: endpoint.into(),
                    source: e,
                })?;

        tracing::debug!(endpoint, count = page.users.len(), "listed accounts");
        Ok(UserPage {
            users: page.users.into_iter().map(UserRecord::from).collect(),
            next_page_token: page.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    /// Enable or disable the account `uid`.
    ///
    /// Calls `POST {base_url}/v1/projects/{project}/accounts:update`.
    pub async fn set_disabled(&self, uid: &str, disabled: bool) -> Result<(), ProviderError> {
        let endpoint = "POST accounts:update";
        let url = self.accounts_url("update")?;
        let body = UpdateAccountRequest {
            local_id: uid,
            disable_user: disabled,
        };

        let resp = self
            .send_authorized(endpoint, |token| {
                self.http.post(url.clone()).bearer_auth(token).json(&body)
            })
            .await?;

        if !resp.status().is_success() {
            return match crate::api_error(endpoint, resp).await {
                ProviderError::ApiError { body, .. } if body.contains(USER_NOT_FOUND) => {
                    Err(ProviderError::UserNotFound(uid.to_string()))
                }
                other => Err(other),
            };
        }

        tracing::info!(uid, disabled, "account status updated");
        Ok(())
    }
}
