use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::booking::SectionId;
use crate::error::{AppError, AppResult};
use crate::middleware::AdminUser;
use crate::models::TicketSection;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ticket-sections", get(list_sections).post(upsert_section))
        .route("/ticket-sections/{section_id}", put(update_price))
}

fn parse_section(raw: &str) -> AppResult<SectionId> {
    raw.parse()
        .map_err(|e: crate::booking::section::UnknownSection| AppError::NotFound(e.to_string()))
}

/// После изменения цен сбрасываем кеш и сразу перечитываем таблицу.
async fn prices_changed(state: &AppState) {
    state.cache.invalidate_sections().await;
    state.pricing.refresh().await;
}

// GET /api/ticket-sections
async fn list_sections(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<TicketSection>>> {
    Ok(Json(state.cache.get_sections().await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertSectionRequest {
    pub section_id: String,
    #[validate(length(min = 1, message = "is required"))]
    pub name_en: String,
    #[validate(length(min = 1, message = "is required"))]
    pub name_ua: String,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub price: Option<f64>,
}

// POST /api/ticket-sections
async fn upsert_section(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(req): Json<UpsertSectionRequest>,
) -> AppResult<Json<TicketSection>> {
    req.validate()?;
    let section = parse_section(&req.section_id)
        .map_err(|_| AppError::Validation(format!("section_id: unknown section {}", req.section_id)))?;

    let row = sqlx::query_as::<_, TicketSection>(
        "INSERT INTO ticket_sections (section_id, name_en, name_ua, price)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (section_id) DO UPDATE
            SET name_en = EXCLUDED.name_en, name_ua = EXCLUDED.name_ua, price = EXCLUDED.price
         RETURNING section_id, name_en, name_ua, price"
    )
    .bind(section.as_str())
    .bind(&req.name_en)
    .bind(&req.name_ua)
    .bind(req.price)
    .fetch_one(&state.db.pool)
    .await?;

    info!("{} set section {} price to {:?}", admin.username, section, row.price);
    prices_changed(&state).await;
    Ok(Json(row))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePriceRequest {
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub price: Option<f64>,
}

// PUT /api/ticket-sections/{section_id}
async fn update_price(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(section_id): Path<String>,
    Json(req): Json<UpdatePriceRequest>,
) -> AppResult<Json<TicketSection>> {
    req.validate()?;
    let section = parse_section(&section_id)?;

    let row = sqlx::query_as::<_, TicketSection>(
        "UPDATE ticket_sections SET price = $1
         WHERE section_id = $2
         RETURNING section_id, name_en, name_ua, price"
    )
    .bind(req.price)
    .bind(section.as_str())
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Section {} not found", section)))?;

    info!("{} set section {} price to {:?}", admin.username, section, row.price);
    prices_changed(&state).await;
    Ok(Json(row))
}
