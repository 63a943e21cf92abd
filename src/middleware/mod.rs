use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::config::JwtConfig;
use crate::error::AppError;
use crate::models::user::{User, ROLE_ADMIN};
use crate::AppState;

/// Авторизованный пользователь запроса.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        AuthUser {
            id: user.id,
            username: user.username.clone(),
            role: user.role.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub uid: i64,
    pub role: String,
    pub exp: usize,
}

pub fn issue_token(user: &AuthUser, jwt: &JwtConfig) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = (Utc::now() + Duration::hours(jwt.expires_in_hours)).timestamp().max(0) as usize;
    let claims = Claims {
        sub: user.username.clone(),
        uid: user.id,
        role: user.role.clone(),
        exp,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(jwt.secret.as_bytes()))
}

pub fn verify_token(token: &str, secret: &str) -> Result<AuthUser, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(AuthUser {
        id: data.claims.uid,
        username: data.claims.sub,
        role: data.claims.role,
    })
}

#[derive(Debug, PartialEq)]
enum Credentials {
    Bearer(String),
    Basic { username: String, password: String },
}

fn parse_authorization(value: &str) -> Option<Credentials> {
    if let Some(token) = value.strip_prefix("Bearer ") {
        let token = token.trim();
        return (!token.is_empty()).then(|| Credentials::Bearer(token.to_string()));
    }

    let encoded = value.strip_prefix("Basic ")?;
    let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    // username:password, пароль может содержать ':'
    let (username, password) = credentials.split_once(':')?;
    if username.is_empty() {
        return None;
    }
    Some(Credentials::Basic {
        username: username.to_string(),
        password: password.to_string(),
    })
}

fn unauthorized() -> AppError {
    AppError::Unauthorized("Authentication required".to_string())
}

/// `None` - данные не подошли. Ошибка только если упала БД.
async fn authenticate(parts: &Parts, state: &AppState) -> Result<Option<AuthUser>, AppError> {
    let Some(credentials) = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_authorization)
    else {
        return Ok(None);
    };

    match credentials {
        Credentials::Bearer(token) => match verify_token(&token, &state.config.jwt.secret) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                debug!("Rejected bearer token: {}", e);
                Ok(None)
            }
        },
        Credentials::Basic { username, password } => {
            if let Some(user) = state.cache.get_cached_auth_user(&username, &password).await {
                return Ok(Some(user));
            }

            let Some(user) = User::find_by_username(&username, &state.db).await? else {
                return Ok(None);
            };
            if !user.verify_password(&password) {
                return Ok(None);
            }

            let auth_user = AuthUser::from(&user);
            if let Err(e) = state.cache.cache_auth_user(&username, &password, &auth_user).await {
                debug!("Auth cache skipped: {:?}", e);
            }
            Ok(Some(auth_user))
        }
    }
}

// Bearer JWT или Basic auth
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await?.ok_or_else(unauthorized)
    }
}

/// Пользователь с ролью admin.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(AdminUser(user))
    }
}

/// Необязательная авторизация: неверные данные дают `None`, а не 401.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl FromRequestParts<Arc<AppState>> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(authenticate(parts, state).await?))
    }
}
