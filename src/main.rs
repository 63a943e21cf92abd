use anyhow::Context;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use theatre_tix::{
    app,
    config::{Config, LogFormat},
    controllers::auth::ensure_default_admin,
    services::cleanup::{spawn_price_refresh, CleanupService},
    AppState,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.app.rust_log));
    let registry = tracing_subscriber::registry().with(filter);

    match config.app.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("invalid configuration")?;
    init_tracing(&config);

    info!("Starting Theatre Tix API ({})", config.app.environment);

    let state = AppState::new(config.clone()).await.context("failed to initialize state")?;

    ensure_default_admin(&state.db, &config.auth)
        .await
        .context("failed to create default admin")?;

    state.cache.warmup_cache().await;
    state.pricing.refresh().await;
    info!("Section prices loaded");

    // --- Фоновые задачи ---
    spawn_price_refresh(
        state.clone(),
        Duration::from_secs(config.pricing.refresh_interval_seconds.max(1)),
    );
    CleanupService::new(state.clone())
        .spawn(Duration::from_secs(config.checkout.cleanup_interval_seconds.max(1)));

    // --- Веб-сервер ---
    let ip = config.app.host.parse::<std::net::IpAddr>().context("invalid HOST")?;
    let addr = SocketAddr::from((ip, config.app.port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state).into_make_service()).await?;
    Ok(())
}
