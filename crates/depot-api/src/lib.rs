//! # depot-api -- Axum HTTP service for Depot
//!
//! Serves the one current game build to the storefront and lets operators
//! replace or remove it. Account administration and payments are thin
//! fronts over hosted providers via `depot-client`.
//!
//! ## API Surface
//!
//! | Route | Auth | Module |
//! |-------|------|--------|
//! | `GET /api/current-file` | public | [`routes::builds`] |
//! | `GET /uploads/{fileName}` | public | [`routes::builds`] |
//! | `POST /api/upload` | admin | [`routes::builds`] |
//! | `DELETE /api/Delete` (alias `/api/delete`) | admin | [`routes::builds`] |
//! | `GET /api/get-users` | admin | [`routes::users`] |
//! | `POST /api/archive-user` | admin | [`routes::users`] |
//! | `POST /api/create-payment-intent` | public | [`routes::payments`] |
//! | `GET /api/checkout-status` | public | [`routes::payments`] |
//! | `GET /openapi.json`, `GET /metrics` | public | [`openapi`], [`middleware::metrics`] |
//! | `GET /health/*` | public | health checks |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware (admin routes only) → Handler
//! ```

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use state::{AppConfig, AppState};

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::{delete, get, post};
use axum::Router;
use depot_store::ArtifactStorage;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;

/// Assemble the full application router with all routes and middleware.
///
/// Health checks (`/health/*`) are mounted outside the metrics and trace
/// layers so health-check traffic does not show up in request counts.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.admin_token.clone(),
    };
    let metrics = ApiMetrics::new();
    let max_upload = state.config.max_upload_bytes;

    let public = Router::new()
        .route("/api/current-file", get(routes::builds::current_file))
        .route("/uploads/:file_name", get(routes::builds::download))
        .route(
            "/api/create-payment-intent",
            post(routes::payments::create_payment_intent),
        )
        .route("/api/checkout-status", get(routes::payments::checkout_status))
        .route("/metrics", get(middleware::metrics::metrics_handler))
        .merge(openapi::router());

    let admin = Router::new()
        .route(
            "/api/upload",
            post(routes::builds::upload).layer(DefaultBodyLimit::max(max_upload)),
        )
        .route("/api/Delete", delete(routes::builds::delete_current))
        .route("/api/delete", delete(routes::builds::delete_current))
        .route("/api/get-users", get(routes::users::get_users))
        .route("/api/archive-user", post(routes::users::archive_user))
        .route_layer(from_fn(auth::auth_middleware));

    let api = Router::new()
        .merge(public)
        .merge(admin)
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(metrics))
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .with_state(state);

    Router::new().merge(health).merge(api)
}

/// Liveness check: always 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness check: 200 once the uploads directory exists or can be created.
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    let slot = state.slot.clone();
    let ready = tokio::task::spawn_blocking(move || slot.storage().ensure_root())
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false);
    if ready {
        (StatusCode::OK, "ready")
    } else {
        tracing::warn!(dir = %state.config.uploads_dir.display(), "uploads directory not writable");
        (StatusCode::SERVICE_UNAVAILABLE, "uploads directory unavailable")
    }
}
