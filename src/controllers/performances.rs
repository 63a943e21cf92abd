use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AdminUser;
use crate::models::{comment::average_rating, Performance};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/performances", get(list_performances).post(create_performance))
        .route(
            "/performances/{id}",
            get(get_performance).put(update_performance).delete(delete_performance),
        )
}

const MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct PerformancesQuery {
    pub query: Option<String>,
    pub page: Option<u32>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<u32>,
}

/// Шаблон ILIKE для поиска по подстроке, спецсимволы экранируются.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// LIMIT и OFFSET для страницы. Считаем в i64: номер страницы приходит от клиента.
fn page_window(page: u32, page_size: u32) -> (i64, i64) {
    let page = i64::from(page.max(1));
    let limit = i64::from(page_size.clamp(1, MAX_PAGE_SIZE));
    (limit, (page - 1) * limit)
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Performance {} not found", id))
}

// GET /api/performances - предстоящие спектакли
async fn list_performances(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PerformancesQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, page_size) = (params.page.unwrap_or(1), params.page_size.unwrap_or(20));
    let (limit, offset) = page_window(page, page_size);
    let pattern = like_pattern(params.query.as_deref().unwrap_or_default());

    let performances = sqlx::query_as::<_, Performance>(
        "SELECT id, title, description, director, date, start_time, end_time, main_image
         FROM performances
         WHERE date >= CURRENT_DATE AND title ILIKE $1
         ORDER BY date, start_time
         LIMIT $2 OFFSET $3"
    )
    .bind(pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(json!({
        "performances": performances,
        "count": performances.len(),
        "page": page.max(1),
        "pageSize": limit,
    })))
}

#[derive(Debug, Serialize)]
pub struct PerformanceDetails {
    #[serde(flatten)]
    pub performance: Performance,
    pub average_rating: f64,
    pub reviews_count: usize,
}

// GET /api/performances/{id}
async fn get_performance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<PerformanceDetails>> {
    let performance = Performance::find(id, &state.db).await?.ok_or_else(|| not_found(id))?;

    let ratings = sqlx::query_scalar::<_, i32>("SELECT rating FROM comments WHERE performance_id = $1")
        .bind(id)
        .fetch_all(&state.db.pool)
        .await?;

    Ok(Json(PerformanceDetails {
        performance,
        average_rating: average_rating(&ratings),
        reviews_count: ratings.len(),
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PerformanceRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub director: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    pub main_image: Option<String>,
}

// POST /api/performances
async fn create_performance(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(req): Json<PerformanceRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;

    let performance = sqlx::query_as::<_, Performance>(
        "INSERT INTO performances (title, description, director, date, start_time, end_time, main_image)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING id, title, description, director, date, start_time, end_time, main_image"
    )
    .bind(&req.title)
    .bind(&req.description)
    .bind(&req.director)
    .bind(req.date)
    .bind(req.start_time)
    .bind(req.end_time)
    .bind(&req.main_image)
    .fetch_one(&state.db.pool)
    .await?;

    info!("{} created performance {} ({})", admin.username, performance.id, performance.title);
    Ok((StatusCode::CREATED, Json(performance)))
}

// PUT /api/performances/{id}
async fn update_performance(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
    Json(req): Json<PerformanceRequest>,
) -> AppResult<Json<Performance>> {
    req.validate()?;

    let performance = sqlx::query_as::<_, Performance>(
        "UPDATE performances
         SET title = $1, description = $2, director = $3, date = $4,
             start_time = $5, end_time = $6, main_image = $7
         WHERE id = $8
         RETURNING id, title, description, director, date, start_time, end_time, main_image"
    )
    .bind(&req.title)
    .bind(&req.description)
    .bind(&req.director)
    .bind(req.date)
    .bind(req.start_time)
    .bind(req.end_time)
    .bind(&req.main_image)
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or_else(|| not_found(id))?;

    Ok(Json(performance))
}

// DELETE /api/performances/{id}
async fn delete_performance(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let result = sqlx::query("DELETE FROM performances WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }

    info!("{} deleted performance {}", admin.username, id);
    Ok(StatusCode::NO_CONTENT)
}
