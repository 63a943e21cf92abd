use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::booking::{ProfitReport, SectionId};
use crate::error::{AppError, AppResult};
use crate::middleware::AdminUser;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sold-tickets", get(get_sold_tickets).post(save_sold_tickets))
        .route("/last-profit", get(get_last_profit).post(save_last_profit))
        .route("/reports/profit", post(calculate_profit))
}

/* ---------- helpers ---------- */

type SoldMap = BTreeMap<SectionId, i64>;
type ProfitMap = BTreeMap<SectionId, f64>;

fn ensure_non_negative(sold: &SoldMap) -> AppResult<()> {
    match sold.iter().find(|(_, count)| **count < 0) {
        Some((section, _)) => Err(AppError::Validation(format!(
            "sold.{}: must not be negative",
            section
        ))),
        None => Ok(()),
    }
}

/// Строки `(section_id, value)` в карту; неизвестные секции пропускаются.
fn collect_rows<T>(rows: Vec<(String, T)>) -> BTreeMap<SectionId, T> {
    rows.into_iter()
        .filter_map(|(id, value)| id.parse::<SectionId>().ok().map(|id| (id, value)))
        .collect()
}

async fn store_sold(tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, sold: &SoldMap) -> sqlx::Result<()> {
    for (section, count) in sold {
        sqlx::query(
            "INSERT INTO sold_tickets (section_id, sold) VALUES ($1, $2)
             ON CONFLICT (section_id) DO UPDATE SET sold = EXCLUDED.sold"
        )
        .bind(section.as_str())
        .bind(*count)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn store_profit(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    profits: &ProfitMap,
    total: f64,
) -> sqlx::Result<()> {
    // прошлый отчёт заменяется целиком
    sqlx::query("DELETE FROM last_profit").execute(&mut **tx).await?;
    for (section, profit) in profits {
        sqlx::query("INSERT INTO last_profit (section_id, profit) VALUES ($1, $2)")
            .bind(section.as_str())
            .bind(*profit)
            .execute(&mut **tx)
            .await?;
    }
    sqlx::query(
        "INSERT INTO last_total_profit (id, total) VALUES (1, $1)
         ON CONFLICT (id) DO UPDATE SET total = EXCLUDED.total"
    )
    .bind(total)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/* ---------- SOLD TICKETS ---------- */

// GET /api/sold-tickets
async fn get_sold_tickets(State(state): State<Arc<AppState>>) -> AppResult<Json<SoldMap>> {
    let rows = sqlx::query_as::<_, (String, i64)>("SELECT section_id, sold FROM sold_tickets")
        .fetch_all(&state.db.pool)
        .await?;
    Ok(Json(collect_rows(rows)))
}

#[derive(Debug, Deserialize)]
pub struct SoldTicketsRequest {
    pub sold: SoldMap,
}

// POST /api/sold-tickets
async fn save_sold_tickets(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Json(req): Json<SoldTicketsRequest>,
) -> AppResult<Json<SoldMap>> {
    ensure_non_negative(&req.sold)?;

    let mut tx = state.db.pool.begin().await?;
    store_sold(&mut tx, &req.sold).await?;
    tx.commit().await?;

    Ok(Json(req.sold))
}

/* ---------- PROFIT ---------- */

#[derive(Debug, Serialize, Deserialize)]
pub struct LastProfit {
    pub profits: ProfitMap,
    pub total: f64,
}

// GET /api/last-profit
async fn get_last_profit(State(state): State<Arc<AppState>>) -> AppResult<Json<LastProfit>> {
    let rows = sqlx::query_as::<_, (String, f64)>("SELECT section_id, profit FROM last_profit")
        .fetch_all(&state.db.pool)
        .await?;
    let total = sqlx::query_scalar::<_, f64>("SELECT total FROM last_total_profit WHERE id = 1")
        .fetch_optional(&state.db.pool)
        .await?
        .unwrap_or(0.0);

    Ok(Json(LastProfit { profits: collect_rows(rows), total }))
}

// POST /api/last-profit
async fn save_last_profit(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Json(req): Json<LastProfit>,
) -> AppResult<Json<LastProfit>> {
    let mut tx = state.db.pool.begin().await?;
    store_profit(&mut tx, &req.profits, req.total).await?;
    tx.commit().await?;
    Ok(Json(req))
}

// POST /api/reports/profit - выручка по актуальным ценам
async fn calculate_profit(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(req): Json<SoldTicketsRequest>,
) -> AppResult<Json<ProfitReport>> {
    ensure_non_negative(&req.sold)?;

    let prices = state.pricing.refresh().await;
    let report = prices.profit(&req.sold);

    let mut tx = state.db.pool.begin().await?;
    store_sold(&mut tx, &report.sold).await?;
    store_profit(&mut tx, &report.profits, report.total).await?;
    tx.commit().await?;

    info!("{} calculated profit report, total {:.2}", admin.username, report.total);
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_counts_are_rejected() {
        let sold = SoldMap::from([(SectionId::Parterre, 2), (SectionId::Mezzanine, -1)]);
        let err = ensure_non_negative(&sold).unwrap_err();
        assert_eq!(err.to_string(), "sold.mezzanine: must not be negative");
    }

    #[test]
    fn sold_request_parses_section_keys() {
        let req: SoldTicketsRequest =
            serde_json::from_str(r#"{"sold": {"parterre": 3, "firstTier": 5}}"#).unwrap();
        assert_eq!(req.sold[&SectionId::FirstTier], 5);
        assert!(serde_json::from_str::<SoldTicketsRequest>(r#"{"sold": {"balcony": 1}}"#).is_err());
    }

    #[test]
    fn unknown_rows_are_skipped() {
        let map = collect_rows(vec![("parterre".to_string(), 1i64), ("balcony".to_string(), 9)]);
        assert_eq!(map.len(), 1);
    }
}
