use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    // Найти пользователя по логину
    pub async fn find_by_username(
        username: &str,
        db: &crate::database::Database,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, role, first_name, last_name, email, created_at
             FROM users WHERE username = $1"
        )
        .bind(username)
        .fetch_optional(&db.pool)
        .await
    }

    pub async fn find_by_id(id: i64, db: &crate::database::Database) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, role, first_name, last_name, email, created_at
             FROM users WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&db.pool)
        .await
    }

    // Пароли храним только в виде bcrypt-хеша
    pub fn verify_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }

    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}
