use crate::cache::{sections::cache_disabled, CacheService};
use crate::middleware::AuthUser;
use redis::AsyncCommands;
use sha2::{Digest, Sha256};
use tracing::info;

/// Сколько живёт успешная Basic-авторизация в кеше.
pub const AUTH_TTL_SECONDS: u64 = 300;

// Пароль в ключе не храним, только его sha256
fn auth_key(username: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{}{:x}", user_prefix(username), hasher.finalize())
}

fn user_prefix(username: &str) -> String {
    format!("auth:{}:", username)
}

/// Шаблон KEYS для всех ключей пользователя. Спецсимволы glob в имени экранируются.
fn user_keys_pattern(username: &str) -> String {
    let mut pattern = String::from("auth:");
    for c in username.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\' | '^') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push_str(":*");
    pattern
}

// "a:*" совпадает и с ключами пользователя "a:b", их отсекаем по длине хеша
fn is_user_key(key: &str, username: &str) -> bool {
    key.strip_prefix(&user_prefix(username))
        .is_some_and(|hash| hash.len() == 64 && hash.bytes().all(|b| b.is_ascii_hexdigit()))
}

impl CacheService {
    /// Сохранить данные авторизованного пользователя в кеш
    pub async fn cache_auth_user(
        &self,
        username: &str,
        password: &str,
        user: &AuthUser,
    ) -> Result<(), redis::RedisError> {
        let redis = self.redis.as_ref().ok_or_else(cache_disabled)?;
        let data = serde_json::to_string(user).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = redis.conn.clone();
        conn.set_ex(auth_key(username, password), data, AUTH_TTL_SECONDS).await
    }

    /// Получить данные пользователя из кеша авторизации
    pub async fn get_cached_auth_user(&self, username: &str, password: &str) -> Option<AuthUser> {
        let redis = self.redis.as_ref()?;
        let mut conn = redis.conn.clone();
        let data: Option<String> = conn.get(auth_key(username, password)).await.ok()?;
        data.and_then(|d| serde_json::from_str(&d).ok())
    }

    /// Инвалидировать все закешированные сессии пользователя
    pub async fn invalidate_user_auth(&self, username: &str) {
        let Some(redis) = &self.redis else { return };
        let mut conn = redis.conn.clone();
        let mut keys: Vec<String> = redis::cmd("KEYS")
            .arg(user_keys_pattern(username))
            .query_async(&mut conn)
            .await
            .unwrap_or_default();
        keys.retain(|key| is_user_key(key, username));
        if !keys.is_empty() {
            let _: Result<(), _> = conn.del(keys).await;
            info!("Invalidated cached auth for user {}", username);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{auth_key, is_user_key, user_keys_pattern};

    #[test]
    fn key_hides_password() {
        let key = auth_key("john_doe", "hunter22");
        assert!(key.starts_with("auth:john_doe:"));
        assert!(!key.contains("hunter22"));
        assert_eq!(key.len(), "auth:john_doe:".len() + 64);
    }

    #[test]
    fn keys_pattern_escapes_glob() {
        assert_eq!(user_keys_pattern("john_doe"), "auth:john_doe:*");
        assert_eq!(user_keys_pattern("*"), r"auth:\*:*");
        assert_eq!(user_keys_pattern(r"a?[b]\"), r"auth:a\?\[b\]\\:*");
    }

    #[test]
    fn other_users_keys_are_not_matched() {
        let own = auth_key("a", "secret1");
        let neighbour = auth_key("a:b", "secret1");
        assert!(is_user_key(&own, "a"));
        assert!(!is_user_key(&neighbour, "a"));
        assert!(is_user_key(&neighbour, "a:b"));
        assert!(!is_user_key("auth:a:", "a"));
    }
}
