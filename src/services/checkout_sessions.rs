use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::booking::CheckoutSession;

/// Сессии покупки в памяти процесса. Каждая сессия принадлежит одному посетителю,
/// общих данных между сессиями нет.
#[derive(Clone)]
pub struct CheckoutSessions {
    inner: Arc<RwLock<HashMap<Uuid, CheckoutSession>>>,
    ttl: Duration,
}

impl CheckoutSessions {
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub async fn insert(&self, session: CheckoutSession) -> Uuid {
        let id = session.id;
        self.inner.write().await.insert(id, session);
        id
    }

    /// Выполняет `f` над сессией под блокировкой записи.
    /// Просроченная сессия удаляется и считается несуществующей.
    pub async fn with_session<F, R>(&self, id: Uuid, f: F) -> Option<R>
    where
        F: FnOnce(&mut CheckoutSession) -> R,
    {
        let mut sessions = self.inner.write().await;
        let now = Utc::now();

        let expired = sessions.get(&id).map(|s| now - s.last_activity > self.ttl)?;
        if expired {
            sessions.remove(&id);
            return None;
        }

        let session = sessions.get_mut(&id)?;
        session.last_activity = now;
        Some(f(session))
    }

    /// Как `with_session`, но успешный шаг закрывает сессию: она удаляется
    /// под той же блокировкой, второй вызов получит `None`.
    pub async fn take_with<F, T, E>(&self, id: Uuid, f: F) -> Option<Result<T, E>>
    where
        F: FnOnce(&mut CheckoutSession) -> Result<T, E>,
    {
        let mut sessions = self.inner.write().await;
        let now = Utc::now();

        let session = sessions.get_mut(&id)?;
        if now - session.last_activity > self.ttl {
            sessions.remove(&id);
            return None;
        }
        session.last_activity = now;

        let result = f(session);
        if result.is_ok() {
            sessions.remove(&id);
        }
        Some(result)
    }

    /// Удаляет сессии без активности дольше TTL, возвращает их количество.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.inner.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| now - s.last_activity <= self.ttl);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::PriceTable;
    use rand::{rngs::StdRng, SeedableRng};

    fn session() -> CheckoutSession {
        CheckoutSession::new(1, "Hamlet", &PriceTable::default(), &mut StdRng::seed_from_u64(1))
    }

    #[tokio::test]
    async fn mutations_are_kept_between_calls() {
        let store = CheckoutSessions::new(30);
        let id = store.insert(session()).await;

        store
            .with_session(id, |s| s.set_privilege_enabled(true))
            .await
            .unwrap()
            .unwrap();
        let enabled = store.with_session(id, |s| s.privilege.enabled()).await;
        assert_eq!(enabled, Some(true));
    }

    #[tokio::test]
    async fn unknown_session_is_none() {
        let store = CheckoutSessions::new(30);
        assert!(store.with_session(Uuid::new_v4(), |_| ()).await.is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_purged() {
        let store = CheckoutSessions::new(30);
        let mut old = session();
        old.last_activity = Utc::now() - Duration::minutes(31);
        let old_id = store.insert(old).await;
        store.insert(session()).await;

        assert!(store.with_session(old_id, |_| ()).await.is_none());
        assert_eq!(store.len().await, 1);

        let mut stale = session();
        stale.last_activity = Utc::now() - Duration::hours(2);
        store.insert(stale).await;
        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn successful_take_closes_session() {
        let store = CheckoutSessions::new(30);
        let id = store.insert(session()).await;

        let failed = store.take_with(id, |_| Err::<(), _>("declined")).await;
        assert_eq!(failed, Some(Err("declined")));
        assert_eq!(store.len().await, 1);

        let taken = store.take_with(id, |s| Ok::<_, ()>(s.performance_id)).await;
        assert_eq!(taken, Some(Ok(1)));
        assert!(store.is_empty().await);
        assert!(store.take_with(id, |_| Ok::<_, ()>(())).await.is_none());
    }
}
