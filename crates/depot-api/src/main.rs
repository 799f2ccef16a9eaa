//! # depot-api -- Binary Entry Point
//!
//! Starts the Axum HTTP server. Binds to `PORT` (default 8080).

use depot_api::AppConfig;
use depot_client::{IdentityClient, IdentityConfig, PaymentClient, PaymentConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();

    // Initialize structured tracing.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(?config, "loaded configuration");
    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN not set: upload, delete and account routes are unauthenticated");
    }

    let mut state = depot_api::AppState::new(config.clone());

    match IdentityConfig::from_env() {
        Ok(identity_config) => {
            let client = IdentityClient::new(&identity_config).map_err(|e| {
                tracing::error!("Failed to create identity client: {e}");
                e
            })?;
            tracing::info!(project = %identity_config.project_id, "identity provider configured");
            state = state.with_identity(client);
        }
        Err(e) => {
            tracing::warn!("Identity provider not configured: {e}. Account endpoints will return 503.");
        }
    }

    match PaymentConfig::from_env() {
        Ok(payment_config) => {
            let client = PaymentClient::new(&payment_config).map_err(|e| {
                tracing::error!("Failed to create payment client: {e}");
                e
            })?;
            tracing::info!("payment provider configured");
            state = state.with_payments(client);
        }
        Err(e) => {
            tracing::warn!("Payment provider not configured: {e}. Payment endpoints will return 503.");
        }
    }

    let app = depot_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Depot API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
