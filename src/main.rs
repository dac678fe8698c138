use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tracing::{info, warn};

use grit_platform_server::api::create_router_with_rate_limit;
use grit_platform_server::app::{AppConfig, AppState};
use grit_platform_server::infra::{
    ApiKeyVerifier, PepperedPasswordEncoder, PostgresClient, PostgresConfig, init_metrics,
    init_tracing,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let verifier = ApiKeyVerifier::new(&config.security.api_keys);
    if verifier.is_empty() {
        warn!("No API keys configured; every protected route will answer 401");
    }
    let encoder = PepperedPasswordEncoder::new(config.security.password_pepper);

    let mut state = AppState::new(Arc::new(verifier), Arc::new(encoder)).with_policy(config.policy);

    match init_metrics() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => warn!(error = %e, "Metrics recorder not installed"),
    }

    if let Some(url) = &config.database_url {
        let db = PostgresClient::connect_lazy(url, PostgresConfig::default())
            .context("invalid DATABASE_URL")?;
        state = state.with_database(Arc::new(db));
    } else {
        info!("DATABASE_URL not set; readiness ignores the database");
    }

    if state.policy.maintenance_mode {
        warn!("Maintenance mode is on");
    }

    let router = create_router_with_rate_limit(Arc::new(state), config.rate_limit);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "Server listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
