use crate::cache::CacheService;
use crate::models::TicketSection;
use redis::AsyncCommands;
use tracing::{debug, info};

const SECTIONS_KEY: &str = "sections";
const SECTIONS_TTL_SECONDS: u64 = 3600;

impl CacheService {
    /// Секции с ценами: сначала кеш, потом БД.
    pub async fn get_sections(&self) -> Result<Vec<TicketSection>, sqlx::Error> {
        if let Ok(sections) = self.get_sections_from_cache().await {
            return Ok(sections);
        }

        let sections = self.load_sections_from_db().await?;
        if let Err(e) = self.save_sections_to_cache(&sections).await {
            debug!("Failed to cache sections: {:?}", e);
        }
        Ok(sections)
    }

    pub async fn invalidate_sections(&self) {
        let Some(redis) = &self.redis else { return };
        let mut conn = redis.conn.clone();
        let _: Result<(), _> = conn.del(SECTIONS_KEY).await;
        info!("Invalidated ticket sections cache");
    }

    async fn load_sections_from_db(&self) -> Result<Vec<TicketSection>, sqlx::Error> {
        sqlx::query_as::<_, TicketSection>(
            "SELECT section_id, name_en, name_ua, price
             FROM ticket_sections
             ORDER BY id"
        )
        .fetch_all(&self.db.pool)
        .await
    }

    // === Работа с кешем ===

    async fn get_sections_from_cache(&self) -> Result<Vec<TicketSection>, redis::RedisError> {
        let redis = self.redis.as_ref().ok_or_else(cache_disabled)?;
        let mut conn = redis.conn.clone();
        let data: String = conn.get(SECTIONS_KEY).await?;
        serde_json::from_str(&data).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Parse error"))
        })
    }

    async fn save_sections_to_cache(&self, sections: &[TicketSection]) -> Result<(), redis::RedisError> {
        let redis = self.redis.as_ref().ok_or_else(cache_disabled)?;
        let data = serde_json::to_string(sections).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = redis.conn.clone();
        conn.set_ex(SECTIONS_KEY, data, SECTIONS_TTL_SECONDS).await
    }
}

pub(crate) fn cache_disabled() -> redis::RedisError {
    redis::RedisError::from((redis::ErrorKind::ClientError, "Cache disabled"))
}
