use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::config::AuthConfig;
use crate::database::Database;
use crate::error::{AppError, AppResult};
use crate::middleware::{issue_token, AdminUser, AuthUser};
use crate::models::user::{User, ROLE_ADMIN, ROLE_USER};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/profile", get(profile))
        .route("/update-profile", post(update_profile))
        .route("/update-username", post(update_username))
        .route("/update-password", post(update_password))
        .route("/delete-profile", post(delete_profile))
        .route("/admin/change-password", post(admin_change_password))
}

/* ---------- helpers ---------- */

fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    bcrypt::hash(password, cost).map_err(|e| AppError::Internal(format!("bcrypt: {}", e)))
}

async fn username_taken(db: &Database, username: &str) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
        .bind(username)
        .fetch_one(&db.pool)
        .await
}

async fn current_user(state: &AppState, user: &AuthUser) -> AppResult<User> {
    User::find_by_id(user.id, &state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Создаёт учётку admin, если её ещё нет.
pub async fn ensure_default_admin(db: &Database, auth: &AuthConfig) -> AppResult<()> {
    if User::find_by_username("admin", db).await?.is_some() {
        return Ok(());
    }

    let hash = hash_password(&auth.admin_password, auth.bcrypt_cost)?;
    sqlx::query(
        "INSERT INTO users (username, password_hash, role, first_name, last_name, email)
         VALUES ('admin', $1, $2, 'Admin', '', '')
         ON CONFLICT (username) DO NOTHING"
    )
    .bind(hash)
    .bind(ROLE_ADMIN)
    .execute(&db.pool)
    .await?;

    info!("Default admin account created");
    Ok(())
}

/* ---------- REGISTER / LOGIN ---------- */

// POST /api/register
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, message = "must be at least 3 characters"))]
    pub username: String,
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "is required"))]
    pub last_name: String,
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;

    if username_taken(&state.db, &req.username).await? {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let hash = hash_password(&req.password, state.config.auth.bcrypt_cost)?;
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO users (username, password_hash, role, first_name, last_name, email)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING id"
    )
    .bind(&req.username)
    .bind(hash)
    .bind(ROLE_USER)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.email)
    .fetch_one(&state.db.pool)
    .await?;

    info!("User {} registered with id {}", req.username, id);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "User registered successfully" })),
    ))
}

// POST /api/login
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;

    let user = User::find_by_username(&req.username, &state.db)
        .await?
        .filter(|u| u.verify_password(&req.password))
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    let token = issue_token(&AuthUser::from(&user), &state.config.jwt)
        .map_err(|e| AppError::Internal(format!("jwt: {}", e)))?;

    Ok(Json(json!({
        "success": true,
        "token": token,
        "role": user.role,
        "first_name": user.first_name,
        "last_name": user.last_name,
        "email": user.email,
    })))
}

/* ---------- PROFILE ---------- */

// GET /api/profile
async fn profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<User>> {
    Ok(Json(current_user(&state, &user).await?))
}

// POST /api/update-profile
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "is required"))]
    pub last_name: String,
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;

    let updated = sqlx::query_as::<_, User>(
        "UPDATE users SET first_name = $1, last_name = $2, email = $3
         WHERE id = $4
         RETURNING id, username, password_hash, role, first_name, last_name, email, created_at"
    )
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.email)
    .bind(user.id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({ "success": true, "user": updated })))
}

// POST /api/update-username
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUsernameRequest {
    #[validate(length(min = 3, message = "must be at least 3 characters"))]
    pub new_username: String,
}

async fn update_username(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<UpdateUsernameRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;

    if req.new_username != user.username && username_taken(&state.db, &req.new_username).await? {
        return Err(AppError::Conflict("Username already taken".to_string()));
    }

    sqlx::query("UPDATE users SET username = $1 WHERE id = $2")
        .bind(&req.new_username)
        .bind(user.id)
        .execute(&state.db.pool)
        .await?;
    state.cache.invalidate_user_auth(&user.username).await;

    // старый токен содержит прежний логин, выдаём новый
    let renamed = AuthUser { username: req.new_username, ..user };
    let token = issue_token(&renamed, &state.config.jwt)
        .map_err(|e| AppError::Internal(format!("jwt: {}", e)))?;

    Ok(Json(json!({ "success": true, "username": renamed.username, "token": token })))
}

// POST /api/update-password
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub old_password: String,
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub new_password: String,
}

async fn change_password(state: &AppState, user: &AuthUser, req: ChangePasswordRequest) -> AppResult<()> {
    req.validate()?;

    let stored = current_user(state, user).await?;
    if !stored.verify_password(&req.old_password) {
        return Err(AppError::Unauthorized("Old password is incorrect".to_string()));
    }

    let hash = hash_password(&req.new_password, state.config.auth.bcrypt_cost)?;
    sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
        .bind(hash)
        .bind(user.id)
        .execute(&state.db.pool)
        .await?;
    state.cache.invalidate_user_auth(&user.username).await;
    Ok(())
}

async fn update_password(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> AppResult<impl IntoResponse> {
    change_password(&state, &user, req).await?;
    Ok(Json(json!({ "success": true, "message": "Password updated" })))
}

// POST /api/admin/change-password
async fn admin_change_password(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(req): Json<ChangePasswordRequest>,
) -> AppResult<impl IntoResponse> {
    change_password(&state, &admin, req).await?;
    info!("Admin password changed");
    Ok(Json(json!({ "success": true, "message": "Admin password updated" })))
}

// POST /api/delete-profile
async fn delete_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user.id)
        .execute(&state.db.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    state.cache.invalidate_user_auth(&user.username).await;

    info!("User {} deleted their profile", user.username);
    Ok(Json(json!({ "success": true })))
}
