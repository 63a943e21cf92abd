use crate::{database::Database, redis_client::RedisClient};
use tracing::{info, warn};

pub mod auth;
pub mod sections;

/// Кеш поверх Redis. Если Redis не настроен, все чтения идут в БД.
#[derive(Clone)]
pub struct CacheService {
    redis: Option<RedisClient>,
    db: Database,
}

impl CacheService {
    pub fn new(redis: Option<RedisClient>, db: Database) -> Self {
        Self { redis, db }
    }

    pub fn is_enabled(&self) -> bool {
        self.redis.is_some()
    }

    // Прогрев кеша при старте
    pub async fn warmup_cache(&self) {
        if !self.is_enabled() {
            info!("Redis is not configured, cache warmup skipped");
            return;
        }
        info!("Starting cache warmup...");

        match self.get_sections().await {
            Ok(sections) => info!("Loaded {} ticket sections", sections.len()),
            Err(e) => warn!("Cache warmup failed to load sections: {:?}", e),
        }

        info!("Cache warmup done");
    }
}
