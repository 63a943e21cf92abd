pub mod booking;
pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod services;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use services::{
    checkout_sessions::CheckoutSessions,
    pricing::{PriceSource, PricingResolver},
};

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub cache: cache::CacheService,
    pub config: config::Config,
    pub pricing: PricingResolver,
    pub checkout: CheckoutSessions,
}

impl AppState {
    /// Подключается к БД и Redis, прогоняет миграции.
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::new(&config.database.url, config.database.pool_size).await?;
        info!("Database connected");
        db.run_migrations().await?;

        let redis = match &config.redis.url {
            Some(url) => match redis_client::RedisClient::new(url).await {
                Ok(client) => {
                    if client.ping().await {
                        info!("Redis connected");
                    } else {
                        warn!("Redis did not answer PING, cache reads will fall back to the database");
                    }
                    Some(client)
                }
                Err(e) => {
                    warn!("Redis unavailable, cache disabled: {}", e);
                    None
                }
            },
            None => None,
        };

        Self::from_parts(config, db, redis)
    }

    /// Собирает состояние из готовых подключений.
    pub fn from_parts(
        config: config::Config,
        db: database::Database,
        redis: Option<redis_client::RedisClient>,
    ) -> anyhow::Result<Arc<Self>> {
        let cache = cache::CacheService::new(redis, db.clone());
        let source = PriceSource::from_config(&config.pricing, &config.circuit_breaker, cache.clone())?;
        let checkout = CheckoutSessions::new(config.checkout.session_ttl_minutes);

        Ok(Arc::new(Self {
            db,
            cache,
            pricing: PricingResolver::new(source),
            checkout,
            config,
        }))
    }
}

/// Полный роутер приложения.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Theatre Tix API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
