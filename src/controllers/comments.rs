use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{Comment, Performance, User};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/comments", post(create_comment))
        // для GET {id} - это id спектакля, для PUT/DELETE - id отзыва
        .route(
            "/comments/{id}",
            get(list_comments).put(update_comment).delete(delete_comment),
        )
}

const COMMENT_COLUMNS: &str = "id, performance_id, user_id, user_name, text, rating, date";

fn display_name(user: &User) -> String {
    let full = format!("{} {}", user.first_name.trim(), user.last_name.trim());
    let full = full.trim();
    if full.is_empty() {
        user.username.clone()
    } else {
        full.to_string()
    }
}

async fn find_comment(state: &AppState, id: i64) -> AppResult<Comment> {
    sqlx::query_as::<_, Comment>(&format!("SELECT {} FROM comments WHERE id = $1", COMMENT_COLUMNS))
        .bind(id)
        .fetch_optional(&state.db.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", id)))
}

/// Отзыв из одних пробелов после trim оказался бы пустым.
fn not_blank(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("is required".into()));
    }
    Ok(())
}

/// Менять отзыв может автор или администратор.
fn ensure_can_edit(user: &AuthUser, comment: &Comment) -> AppResult<()> {
    if user.id == comment.user_id || user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("You can only modify your own comments".to_string()))
    }
}

// GET /api/comments/{performance_id}
async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(performance_id): Path<i64>,
) -> AppResult<Json<Vec<Comment>>> {
    let comments = sqlx::query_as::<_, Comment>(&format!(
        "SELECT {} FROM comments WHERE performance_id = $1 ORDER BY date DESC, id DESC",
        COMMENT_COLUMNS
    ))
    .bind(performance_id)
    .fetch_all(&state.db.pool)
    .await?;
    Ok(Json(comments))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    pub performance_id: i64,
    #[validate(custom(function = "not_blank"))]
    pub text: String,
    #[validate(range(min = 1, max = 5, message = "must be between 1 and 5"))]
    pub rating: i32,
}

// POST /api/comments
async fn create_comment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;

    if Performance::find(req.performance_id, &state.db).await?.is_none() {
        return Err(AppError::NotFound(format!("Performance {} not found", req.performance_id)));
    }
    let author = User::find_by_id(user.id, &state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;

    let comment = sqlx::query_as::<_, Comment>(&format!(
        "INSERT INTO comments (performance_id, user_id, user_name, text, rating)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {}",
        COMMENT_COLUMNS
    ))
    .bind(req.performance_id)
    .bind(author.id)
    .bind(display_name(&author))
    .bind(req.text.trim())
    .bind(req.rating)
    .fetch_one(&state.db.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(custom(function = "not_blank"))]
    pub text: String,
    #[validate(range(min = 1, max = 5, message = "must be between 1 and 5"))]
    pub rating: i32,
}

// PUT /api/comments/{id}
async fn update_comment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateCommentRequest>,
) -> AppResult<Json<Comment>> {
    req.validate()?;
    let comment = find_comment(&state, id).await?;
    ensure_can_edit(&user, &comment)?;

    let updated = sqlx::query_as::<_, Comment>(&format!(
        "UPDATE comments SET text = $1, rating = $2 WHERE id = $3 RETURNING {}",
        COMMENT_COLUMNS
    ))
    .bind(req.text.trim())
    .bind(req.rating)
    .bind(id)
    .fetch_one(&state.db.pool)
    .await?;

    Ok(Json(updated))
}

// DELETE /api/comments/{id}
async fn delete_comment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let comment = find_comment(&state, id).await?;
    ensure_can_edit(&user, &comment)?;

    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
