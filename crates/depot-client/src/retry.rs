//! Retries for provider calls.
//!
//! Both providers shed load with `429 Too Many Requests` or
//! `503 Service Unavailable` and ask callers to come back later. Those
//! responses, dropped connections and timeouts are retried. A numeric
//! `Retry-After` header overrides the exponential backoff, capped at
//! `MAX_DELAY`. Any other response goes back to the caller untouched.
//!
//! Callers must make every attempt safe to repeat. Account updates are
//! naturally idempotent; payment intents carry one `Idempotency-Key` for
//! all attempts.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;

/// Total attempts per call, including the first.
const MAX_ATTEMPTS: u32 = 4;

/// First backoff step; doubles per attempt.
const BASE_DELAY: Duration = Duration::from_millis(250);

/// Upper bound on any single wait, including provider-requested ones.
const MAX_DELAY: Duration = Duration::from_secs(5);

fn is_throttled(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE
}

/// `Retry-After` in delta-seconds form. HTTP-dates fall back to backoff.
fn retry_after(resp: &reqwest::Response) -> Option<Duration> {
    let raw = resp.headers().get(RETRY_AFTER)?.to_str().ok()?;
    raw.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn backoff(attempt: u32) -> Duration {
    BASE_DELAY.saturating_mul(1u32 << attempt.min(16)).min(MAX_DELAY)
}

/// Send a provider request, retrying throttling and transport failures.
///
/// `f` builds and sends a fresh request each time it is called. On the
/// last attempt a throttled response is returned as-is so the caller can
/// report the provider's status.
pub(crate) async fn retry_send<F, Fut>(
    endpoint: &str,
    f: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let mut attempt = 0;
    loop {
        let last = attempt + 1 >= MAX_ATTEMPTS;
        let delay = match f().await {
            Ok(resp) if !last && is_throttled(resp.status()) => {
                let delay = retry_after(&resp)
                    .map(|d| d.min(MAX_DELAY))
                    .unwrap_or_else(|| backoff(attempt));
                tracing::warn!(
                    endpoint,
                    status = resp.status().as_u16(),
                    attempt = attempt + 1,
                    "provider throttled request, retrying in {delay:?}"
                );
                delay
            }
            Err(e) if !last && (e.is_connect() || e.is_timeout()) => {
                let delay = backoff(attempt);
                tracing::warn!(
                    endpoint,
                    attempt = attempt + 1,
                    "provider unreachable, retrying in {delay:?}: {e}"
                );
                delay
            }
            other => return other,
        };
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn get(server: &MockServer) -> Result<reqwest::Response, reqwest::Error> {
        let url = format!("{}/v1/ping", server.uri());
        let client = reqwest::Client::new();
        retry_send("GET /v1/ping", || client.get(&url).send()).await
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff(0), Duration::from_millis(250));
        assert_eq!(backoff(1), Duration::from_millis(500));
        assert_eq!(backoff(2), Duration::from_millis(1000));
        assert_eq!(backoff(10), MAX_DELAY);
        assert_eq!(backoff(40), MAX_DELAY);
    }

    #[tokio::test]
    async fn throttled_then_ok_returns_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/ping"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/ping"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let resp = get(&server).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn persistent_unavailability_returns_last_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/ping"))
            .respond_with(ResponseTemplate::new(503).insert_header("Retry-After", "0"))
            .expect(u64::from(MAX_ATTEMPTS))
            .mount(&server)
            .await;

        let resp = get(&server).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/ping"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let resp = get(&server).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn connection_refused_exhausts_attempts() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let calls = AtomicU32::new(0);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();

        // Port 1 is closed: connection refused.
        let result = retry_send("GET closed", || {
            calls.fetch_add(1, Ordering::SeqCst);
            client.get("http://127.0.0.1:1/").send()
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }
}
