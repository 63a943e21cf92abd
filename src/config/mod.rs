use serde::Deserialize;
use std::env;
use std::ops::RangeInclusive;
use std::str::FromStr;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub auth: AuthConfig,
    pub pricing: PricingConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub checkout: CheckoutConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format {other}")),
        }
    }
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Redis необязателен: без него кеш просто выключен
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
}

// Настройки JWT
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub bcrypt_cost: u32,
    pub admin_password: String,
}

// Откуда брать цены секций
#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    /// Если задан - цены берутся с удалённого сервиса, иначе из своей БД.
    pub remote_url: Option<String>,
    pub refresh_interval_seconds: u64,
    pub request_timeout_seconds: u64,
}

// Настройки Circuit Breaker
#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutConfig {
    pub session_ttl_minutes: i64,
    pub cleanup_interval_seconds: u64,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Собирает конфиг из произвольного источника переменных (нужно для тестов).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));
        let optional = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &'static str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            app: AppConfig {
                host: or("HOST", "0.0.0.0"),
                port: parse("PORT", or("PORT", "4000"))?,
                environment: or("ENVIRONMENT", "development"),
                rust_log: or("RUST_LOG", "theatre_tix=debug,tower_http=debug"),
                log_format: parse("LOG_FORMAT", or("LOG_FORMAT", "pretty"))?,
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                pool_size: parse("DB_POOL_SIZE", or("DB_POOL_SIZE", "10"))?,
            },
            redis: RedisConfig {
                url: optional("REDIS_URL"),
            },
            jwt: JwtConfig {
                secret: required("JWT_SECRET")?,
                expires_in_hours: parse_in(
                    "JWT_EXPIRES_IN_HOURS",
                    or("JWT_EXPIRES_IN_HOURS", "24"),
                    JWT_HOURS_RANGE,
                )?,
            },
            auth: AuthConfig {
                bcrypt_cost: parse("BCRYPT_COST", or("BCRYPT_COST", "10"))?,
                admin_password: or("ADMIN_PASSWORD", "admin"),
            },
            pricing: PricingConfig {
                remote_url: optional("PRICING_SOURCE_URL"),
                refresh_interval_seconds: parse("PRICE_REFRESH_SECONDS", or("PRICE_REFRESH_SECONDS", "60"))?,
                request_timeout_seconds: parse("PRICING_TIMEOUT_SECONDS", or("PRICING_TIMEOUT_SECONDS", "5"))?,
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: parse(
                    "CIRCUIT_BREAKER_FAILURE_THRESHOLD",
                    or("CIRCUIT_BREAKER_FAILURE_THRESHOLD", "5"),
                )?,
                timeout_seconds: parse(
                    "CIRCUIT_BREAKER_TIMEOUT_SECONDS",
                    or("CIRCUIT_BREAKER_TIMEOUT_SECONDS", "60"),
                )?,
            },
            checkout: CheckoutConfig {
                session_ttl_minutes: parse_in(
                    "CHECKOUT_SESSION_TTL_MINUTES",
                    or("CHECKOUT_SESSION_TTL_MINUTES", "30"),
                    SESSION_TTL_RANGE,
                )?,
                cleanup_interval_seconds: parse(
                    "CHECKOUT_CLEANUP_SECONDS",
                    or("CHECKOUT_CLEANUP_SECONDS", "60"),
                )?,
            },
        })
    }
}

// Длительности уходят в chrono::Duration, который паникует на переполнении
const JWT_HOURS_RANGE: RangeInclusive<i64> = 1..=24 * 365;
const SESSION_TTL_RANGE: RangeInclusive<i64> = 1..=24 * 60;

fn parse_in(key: &'static str, value: String, range: RangeInclusive<i64>) -> Result<i64, ConfigError> {
    match parse::<i64>(key, value.clone())? {
        n if range.contains(&n) => Ok(n),
        _ => Err(ConfigError::Invalid { key, value }),
    }
}

fn parse<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}
