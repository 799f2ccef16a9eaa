//! Service-account access tokens for the identity provider.
//!
//! Tokens are minted with the OAuth2 JWT-bearer grant: an RS256-signed
//! assertion naming the service account is exchanged at the token
//! endpoint for a bearer token that lives about an hour. The token is
//! cached and replaced once it is within [`REFRESH_MARGIN`] of expiry, or
//! when the provider rejects it.

use std::time::{Duration, Instant};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use url::Url;
use zeroize::Zeroizing;

use crate::config::{ConfigError, IdentityConfig};
use crate::error::ProviderError;

/// Scopes requested for account administration.
const SCOPES: &str = "https://www.googleapis.com/auth/identitytoolkit \
                      https://www.googleapis.com/auth/cloud-platform";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime claimed by each signed assertion. The provider caps it at one hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Assumed token lifetime when the response omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

/// Tokens closer than this to expiry are refreshed before use.
pub(crate) const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    value: Zeroizing<String>,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at > now + REFRESH_MARGIN
    }
}

/// Mints and caches access tokens for one service account.
pub(crate) struct TokenSource {
    http: reqwest::Client,
    token_uri: Url,
    client_email: String,
    key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSource")
            .field("token_uri", &self.token_uri)
            .field("client_email", &self.client_email)
            .finish_non_exhaustive()
    }
}

impl TokenSource {
    /// Parse the service-account key. Fails fast on a malformed key so a
    /// bad deployment is caught at startup, not on the first admin request.
    pub(crate) fn new(http: reqwest::Client, config: &IdentityConfig) -> Result<Self, ProviderError> {
        let key = EncodingKey::from_rsa_pem(config.private_key.as_bytes())
            .map_err(|e| ConfigError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self {
            http,
            token_uri: config.token_uri.clone(),
            client_email: config.client_email.clone(),
            key,
            cached: Mutex::new(None),
        })
    }

    /// Return a token valid for at least [`REFRESH_MARGIN`], minting one if needed.
    ///
    /// Concurrent callers wait on the same refresh rather than each
    /// exchanging their own assertion.
    pub(crate) async fn access_token(&self) -> Result<Zeroizing<String>, ProviderError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return Ok(token.value.clone());
        }
        let token = self.exchange().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// Drop the cached token so the next call mints a new one.
    pub(crate) async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    fn sign_assertion(&self) -> Result<String, ProviderError> {
        let iat = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: SCOPES,
            aud: self.token_uri.as_str(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| ProviderError::Credentials(e.to_string()))
    }

    async fn exchange(&self) -> Result<CachedToken, ProviderError> {
        let endpoint = "POST oauth2 token";
        let assertion = Zeroizing::new(self.sign_assertion()?);
        let form = Zeroizing::new(
            url::form_urlencoded::Serializer::new(String::new())
                .append_pair("grant_type", JWT_BEARER_GRANT)
                .append_pair("assertion", &assertion)
                .finish(),
        );

        let resp = crate::retry::retry_send(endpoint, || {
            self.http
                .post(self.token_uri.clone())
                .header(reqwest::header::CONTENT_TYPE, crate::FORM_CONTENT_TYPE)
                .body(form.as_str().to_owned())
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

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Deserialization {
                endpoint: endpoint.into(),
                source: e,
            })?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS));
        tracing::debug!(
            client_email = %self.client_email,
            expires_in_secs = lifetime.as_secs(),
            "minted identity access token"
        );
        Ok(CachedToken {
            value: Zeroizing::new(token.access_token),
            expires_at: Instant::now() + lifetime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_in: Duration) -> CachedToken {
        CachedToken {
            value: Zeroizing::new("t".into()),
            expires_at: Instant::now() + expires_in,
        }
    }

    #[test]
    fn token_inside_refresh_margin_is_stale() {
        let now = Instant::now();
        assert!(token(Duration::from_secs(3600)).is_fresh(now));
        assert!(!token(Duration::from_secs(30)).is_fresh(now));
        assert!(!token(Duration::ZERO).is_fresh(now));
    }

    #[test]
    fn malformed_private_key_is_a_config_error() {
        let config = IdentityConfig {
            base_url: Url::parse(crate::config::DEFAULT_IDENTITY_BASE_URL).unwrap(),
            project_id: "demo".into(),
            client_email: "depot@demo.iam.gserviceaccount.com".into(),
            private_key: Zeroizing::new("not a pem".into()),
            token_uri: Url::parse(crate::config::DEFAULT_TOKEN_URI).unwrap(),
            timeout_secs: 5,
        };
        let err = TokenSource::new(reqwest::Client::new(), &config).unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Config(ConfigError::InvalidPrivateKey(_))
        ));
    }
}
