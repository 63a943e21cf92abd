use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AdminUser;
use crate::models::NewsArticle;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/news", get(list_news).post(create_news))
        .route("/news/{id}", put(update_news).delete(delete_news))
}

const NEWS_COLUMNS: &str =
    "id, title_ua, title_en, summary_ua, summary_en, content_ua, content_en, date, image";

// GET /api/news
async fn list_news(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<NewsArticle>>> {
    let news = sqlx::query_as::<_, NewsArticle>(&format!(
        "SELECT {} FROM news ORDER BY date DESC, id DESC",
        NEWS_COLUMNS
    ))
    .fetch_all(&state.db.pool)
    .await?;
    Ok(Json(news))
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewsRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub title_ua: String,
    #[validate(length(min = 1, message = "is required"))]
    pub title_en: String,
    pub summary_ua: Option<String>,
    pub summary_en: Option<String>,
    #[validate(length(min = 1, message = "is required"))]
    pub content_ua: String,
    #[validate(length(min = 1, message = "is required"))]
    pub content_en: String,
    pub date: NaiveDate,
    pub image: Option<String>,
}

// POST /api/news
async fn create_news(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Json(req): Json<NewsRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;

    let article = sqlx::query_as::<_, NewsArticle>(&format!(
        "INSERT INTO news (title_ua, title_en, summary_ua, summary_en, content_ua, content_en, date, image)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING {}",
        NEWS_COLUMNS
    ))
    .bind(&req.title_ua)
    .bind(&req.title_en)
    .bind(&req.summary_ua)
    .bind(&req.summary_en)
    .bind(&req.content_ua)
    .bind(&req.content_en)
    .bind(req.date)
    .bind(&req.image)
    .fetch_one(&state.db.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(article)))
}

// PUT /api/news/{id}
async fn update_news(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
    Json(req): Json<NewsRequest>,
) -> AppResult<Json<NewsArticle>> {
    req.validate()?;

    let article = sqlx::query_as::<_, NewsArticle>(&format!(
        "UPDATE news
         SET title_ua = $1, title_en = $2, summary_ua = $3, summary_en = $4,
             content_ua = $5, content_en = $6, date = $7, image = $8
         WHERE id = $9
         RETURNING {}",
        NEWS_COLUMNS
    ))
    .bind(&req.title_ua)
    .bind(&req.title_en)
    .bind(&req.summary_ua)
    .bind(&req.summary_en)
    .bind(&req.content_ua)
    .bind(&req.content_en)
    .bind(req.date)
    .bind(&req.image)
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("News {} not found", id)))?;

    Ok(Json(article))
}

// DELETE /api/news/{id}
async fn delete_news(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let result = sqlx::query("DELETE FROM news WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("News {} not found", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
