//! pricing.rs
//!
//! Определение цен секций зала.
//!
//! Ключевые компоненты:
//! 1.  **CircuitBreaker**: "Автоматический выключатель" для удалённого хранилища цен.
//!     После серии сбоев запросы временно не отправляются.
//! 2.  **RemotePricingClient**: HTTP-клиент к внешнему сервису цен
//!     (`GET {base}/api/ticket-sections`).
//! 3.  **PricingResolver**: хранит последнюю удачную таблицу цен. При ошибке источника
//!     ошибка только логируется, таблица остаётся прежней (изначально - дефолты).

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::booking::PriceTable;
use crate::cache::CacheService;
use crate::config::{CircuitBreakerConfig, PricingConfig};
use crate::models::TicketSection;

/// Состояния "Автоматического выключателя".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Нормальный режим, запросы разрешены.
    Closed,
    /// Запросы запрещены до истечения таймаута.
    Open,
    /// Разрешён пробный запрос.
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    opened_at: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    failure_threshold: u32,
    timeout_duration: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, timeout_seconds: u64) -> Self {
        Self {
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                opened_at: None,
            }),
            failure_threshold: failure_threshold.max(1),
            timeout_duration: Duration::from_secs(timeout_seconds),
        }
    }

    /// Проверяет, можно ли выполнить следующий запрос.
    pub fn can_execute(&self) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let expired = inner
                    .opened_at
                    .map(|t| t.elapsed() >= self.timeout_duration)
                    .unwrap_or(true);
                if expired {
                    inner.state = CircuitState::HalfOpen;
                    info!("Circuit breaker transitioning to HalfOpen state");
                }
                expired
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.state == CircuitState::HalfOpen {
            info!("Circuit breaker recovered - transitioning to Closed state");
        }
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.failure_count += 1;

        match inner.state {
            CircuitState::Closed if inner.failure_count >= self.failure_threshold => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                error!(
                    "Circuit breaker OPENED - {} failures reached threshold {}",
                    inner.failure_count, self.failure_threshold
                );
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                warn!("Circuit breaker test failed - returning to Open state");
            }
            _ => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).state
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("Circuit breaker is open - pricing store temporarily unavailable")]
    CircuitOpen,
    #[error("Pricing store request failed: {0}")]
    Remote(#[from] reqwest::Error),
    #[error("Pricing store query failed: {0}")]
    Store(#[from] sqlx::Error),
}

/// Клиент к удалённому хранилищу цен.
#[derive(Clone)]
pub struct RemotePricingClient {
    base_url: String,
    http_client: reqwest::Client,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl RemotePricingClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        breaker: &CircuitBreakerConfig,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client: reqwest::Client::builder().timeout(timeout).build()?,
            circuit_breaker: Arc::new(CircuitBreaker::new(
                breaker.failure_threshold,
                breaker.timeout_seconds,
            )),
        })
    }

    pub async fn fetch_sections(&self) -> Result<Vec<TicketSection>, PricingError> {
        if !self.circuit_breaker.can_execute() {
            warn!("Circuit breaker is OPEN - skipping pricing store request");
            return Err(PricingError::CircuitOpen);
        }

        let result = async {
            self.http_client
                .get(format!("{}/api/ticket-sections", self.base_url))
                .send()
                .await?
                .error_for_status()?
                .json::<Vec<TicketSection>>()
                .await
        }
        .await;

        match result {
            Ok(sections) => {
                self.circuit_breaker.record_success();
                Ok(sections)
            }
            Err(e) => {
                self.circuit_breaker.record_failure();
                Err(PricingError::Remote(e))
            }
        }
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }
}

/// Источник цен: своя БД (через кеш) или удалённый сервис.
#[derive(Clone)]
pub enum PriceSource {
    Local(CacheService),
    Remote(RemotePricingClient),
}

impl PriceSource {
    pub fn from_config(
        pricing: &PricingConfig,
        breaker: &CircuitBreakerConfig,
        cache: CacheService,
    ) -> Result<Self, reqwest::Error> {
        match &pricing.remote_url {
            Some(url) => {
                info!("Using remote pricing store at {}", url);
                Ok(PriceSource::Remote(RemotePricingClient::new(
                    url.clone(),
                    Duration::from_secs(pricing.request_timeout_seconds),
                    breaker,
                )?))
            }
            None => Ok(PriceSource::Local(cache)),
        }
    }

    pub async fn fetch_sections(&self) -> Result<Vec<TicketSection>, PricingError> {
        match self {
            PriceSource::Local(cache) => Ok(cache.get_sections().await?),
            PriceSource::Remote(client) => client.fetch_sections().await,
        }
    }
}

/// Последняя удачно полученная таблица цен.
#[derive(Clone)]
pub struct PricingResolver {
    source: PriceSource,
    table: Arc<RwLock<PriceTable>>,
}

impl PricingResolver {
    pub fn new(source: PriceSource) -> Self {
        Self {
            source,
            table: Arc::new(RwLock::new(PriceTable::default())),
        }
    }

    pub async fn current(&self) -> PriceTable {
        self.table.read().await.clone()
    }

    /// Перечитывает цены. Ошибка источника не пробрасывается: остаются старые цены.
    pub async fn refresh(&self) -> PriceTable {
        let result = self.source.fetch_sections().await;
        self.apply(result).await
    }

    async fn apply(&self, result: Result<Vec<TicketSection>, PricingError>) -> PriceTable {
        match result {
            Ok(rows) => {
                let resolved = PriceTable::resolve(&rows);
                let mut table = self.table.write().await;
                *table = resolved.clone();
                resolved
            }
            Err(e) => {
                error!("Error loading ticket section prices: {}", e);
                self.current().await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::SectionId;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn breaker_config(failure_threshold: u32) -> CircuitBreakerConfig {
        CircuitBreakerConfig { failure_threshold, timeout_seconds: 60 }
    }

    fn remote(server: &MockServer, failure_threshold: u32) -> RemotePricingClient {
        RemotePricingClient::new(server.uri(), Duration::from_secs(2), &breaker_config(failure_threshold)).unwrap()
    }

    #[test]
    fn breaker_opens_after_threshold() {
        let breaker = CircuitBreaker::new(2, 60);
        breaker.record_failure();
        assert!(breaker.can_execute());
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.can_execute());
    }

    #[test]
    fn breaker_half_opens_after_timeout() {
        let breaker = CircuitBreaker::new(1, 0);
        breaker.record_failure();
        assert!(breaker.can_execute());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn remote_prices_are_resolved() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ticket-sections"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "section_id": "parterre", "name_en": "Parterre", "name_ua": "Партер", "price": 1250.0 },
                { "section_id": "mezzanine", "name_en": "Mezzanine", "name_ua": "Бельєтаж", "price": null }
            ])))
            .mount(&server)
            .await;

        let resolver = PricingResolver::new(PriceSource::Remote(remote(&server, 5)));
        let table = resolver.refresh().await;

        assert_eq!(table.price(SectionId::Parterre), 1250.0);
        assert_eq!(table.price(SectionId::Mezzanine), 800.0);
        assert_eq!(resolver.current().await, table);
    }

    #[tokio::test]
    async fn store_failure_keeps_previous_prices() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ticket-sections"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "section_id": "thirdTier", "name_en": "3rd Tier", "name_ua": "3-й ярус", "price": 250.0 }
            ])))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/ticket-sections"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let resolver = PricingResolver::new(PriceSource::Remote(remote(&server, 5)));
        let first = resolver.refresh().await;
        assert_eq!(first.price(SectionId::ThirdTier), 250.0);

        let second = resolver.refresh().await;
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn failure_before_any_success_yields_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = remote(&server, 1);
        let resolver = PricingResolver::new(PriceSource::Remote(client.clone()));
        assert_eq!(resolver.refresh().await, PriceTable::default());
        assert_eq!(client.circuit_state(), CircuitState::Open);

        // выключатель разомкнут - до сервера запрос не доходит
        assert!(matches!(client.fetch_sections().await, Err(PricingError::CircuitOpen)));
    }
}
