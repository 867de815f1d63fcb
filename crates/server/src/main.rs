use std::sync::Arc;

use anyhow::Context;
use selfstudy_server::{
    api::{AppState, cors_layer, create_router},
    auth::TokenIssuer,
    config::AppConfig,
    db,
    service::ensure_admin,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    info!("starting selfstudy server");
    let config = AppConfig::load().context("failed to load app config")?;
    let threshold = config.threshold()?;
    let cors = cors_layer(&config.cors_allowed_origins)?;

    let db = db::connect_and_migrate(config.database_url()?).await?;
    let state = Arc::new(AppState::new(
        db,
        threshold,
        TokenIssuer::from_config(&config.auth),
    ));

    if let Some(admin) = &config.bootstrap_admin {
        ensure_admin(state.users.as_ref(), admin)
            .await
            .context("failed to bootstrap admin user")?;
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(
        addr = %config.bind_addr,
        pass_threshold = threshold.value(),
        "server is ready, press Ctrl+C to shut down"
    );

    axum::serve(listener, create_router(state, cors))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received, stopping server");
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}
