//! # Prometheus Metrics
//!
//! Request metrics backed by a `prometheus` registry.
//!
//! HTTP counters and latency are recorded in middleware, labelled with the
//! matched route template so `/uploads/:file_name` stays one series no
//! matter which build is downloaded. The build-slot gauge is refreshed on
//! each `/metrics` scrape (pull model).

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use depot_core::SlotState;
use prometheus::core::Collector;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::state::AppState;

/// Path label for requests that matched no route.
const UNMATCHED_PATH: &str = "unmatched";

/// Every state the slot gauge reports, so absent states read 0 rather than vanish.
const SLOT_STATES: [&str; 3] = ["empty", "present", "dangling"];

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,
    build_slot_state: IntGaugeVec,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("depot_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        // Downloads of large builds run long; the top buckets cover them.
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "depot_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 120.0,
            ]),
            &["method", "path"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new("depot_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let build_slot_state = IntGaugeVec::new(
            Opts::new(
                "depot_build_slot_state",
                "1 for the current state of the build slot, 0 otherwise",
            ),
            &["state"],
        )
        .expect("metric can be created");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_errors_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(build_slot_state.clone()))
            .expect("metric can be registered");

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                build_slot_state,
            }),
        }
    }

    /// Total request count across all labels.
    pub fn requests(&self) -> u64 {
        sum_counter(&self.inner.http_requests_total)
    }

    /// Total 4xx and 5xx responses across all labels.
    pub fn errors(&self) -> u64 {
        sum_counter(&self.inner.http_errors_total)
    }

    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let is_error = status >= 400;
        let status = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
        if is_error {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status])
                .inc();
        }
    }

    /// Set the slot gauge to `state`, or to all zeros when it is unknown.
    pub fn set_slot_state(&self, state: Option<&SlotState>) {
        let current = state.map(|s| match s {
            SlotState::Empty => "empty",
            SlotState::Present(_) => "present",
            SlotState::Dangling(_) => "dangling",
        });
        for label in SLOT_STATES {
            let value = i64::from(current == Some(label));
            self.inner.build_slot_state.with_label_values(&[label]).set(value);
        }
    }

    /// Gather all metrics and encode them in the Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer).map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn sum_counter(counter: &IntCounterVec) -> u64 {
    counter
        .collect()
        .iter()
        .flat_map(|family| family.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

/// Middleware that records HTTP request metrics.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_PATH.to_owned());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let duration = start.elapsed().as_secs_f64();
        m.record_request(&method, &path, response.status().as_u16(), duration);
    }

    response
}

/// GET /metrics
///
/// Refreshes the build-slot gauge, then encodes the registry. A slot that
/// cannot be inspected reports all states as 0 rather than failing the scrape.
pub async fn metrics_handler(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> Response {
    let slot = state.slot.clone();
    match tokio::task::spawn_blocking(move || slot.state()).await {
        Ok(Ok(slot_state)) => metrics.set_slot_state(Some(&slot_state)),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "failed to inspect build slot for metrics");
            metrics.set_slot_state(None);
        }
        Err(e) => {
            tracing::warn!(error = %e, "build slot inspection task failed");
            metrics.set_slot_state(None);
        }
    }

    match metrics.gather_and_encode() {
        Ok(body) => ([(header::CONTENT_TYPE, TextEncoder::new().format_type().to_owned())], body)
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
