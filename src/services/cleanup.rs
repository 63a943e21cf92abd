use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::AppState;

/// Фоновые задачи обслуживания: чистка просроченных сессий покупки
/// и периодическое обновление цен.
pub struct CleanupService {
    state: Arc<AppState>,
}

impl CleanupService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Удаляет брошенные сессии покупки
    pub async fn cleanup_expired_sessions(&self) -> usize {
        let removed = self.state.checkout.purge_expired().await;
        if removed > 0 {
            info!("🧹 Removed {} expired checkout sessions", removed);
        } else {
            debug!("No expired checkout sessions");
        }
        removed
    }

    pub fn spawn(self, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::task::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                self.cleanup_expired_sessions().await;
            }
        })
    }
}

/// Периодически перечитывает цены секций.
pub fn spawn_price_refresh(state: Arc<AppState>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            state.pricing.refresh().await;
        }
    })
}
