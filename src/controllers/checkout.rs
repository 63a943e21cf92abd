//! HTTP-обёртка над сессией покупки. Вся логика живёт в `booking::checkout`,
//! здесь только поиск сессии, сериализация и перевод ошибок.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::booking::{
    CheckoutError, CheckoutPhase, CheckoutSession, PaymentDraftPatch, PrivilegeStatus, SectionId,
};
use crate::error::{AppError, AppResult};
use crate::middleware::MaybeAuthUser;
use crate::models::Performance;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/performances/{id}/checkout", post(start_checkout))
        .route("/checkout/{session_id}", get(get_checkout))
        .route("/checkout/{session_id}/sections/{section_id}", get(get_section))
        .route("/checkout/{session_id}/seats/{seat_id}/toggle", post(toggle_seat))
        .route(
            "/checkout/{session_id}/privilege",
            axum::routing::put(set_privilege_enabled).patch(set_privilege_number),
        )
        .route("/checkout/{session_id}/privilege/verify", post(verify_privilege))
        .route("/checkout/{session_id}/refresh-prices", post(refresh_prices))
        .route("/checkout/{session_id}/proceed", post(proceed))
        .route("/checkout/{session_id}/back", post(back))
        .route("/checkout/{session_id}/payment", axum::routing::patch(update_payment))
        .route("/checkout/{session_id}/complete", post(complete))
}

/* ---------- views ---------- */

#[derive(Debug, Serialize)]
pub struct SeatView {
    pub id: String,
    pub label: String,
    pub row: char,
    pub number: u32,
    pub price: f64,
    pub available: bool,
    pub selected: bool,
}

#[derive(Debug, Serialize)]
pub struct SectionView {
    pub id: SectionId,
    pub name_en: &'static str,
    pub name_ua: &'static str,
    pub price: f64,
    pub seats: Vec<SeatView>,
}

#[derive(Debug, Serialize)]
pub struct SelectedSeatView {
    pub id: String,
    pub section: SectionId,
    pub label: String,
    pub price: f64,
}

#[derive(Debug, Serialize)]
pub struct PrivilegeView {
    pub enabled: bool,
    pub document_number: String,
    pub status: PrivilegeStatus,
    pub discount_applied: bool,
}

/// Данные карты назад не отдаём, только список незаполненных полей.
#[derive(Debug, Serialize)]
pub struct PaymentView {
    pub missing_fields: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutView {
    pub session_id: Uuid,
    pub performance_id: i64,
    pub performance_title: String,
    pub phase: CheckoutPhase,
    pub sections: Vec<SectionView>,
    pub selected: Vec<SelectedSeatView>,
    pub subtotal: f64,
    pub total: f64,
    pub privilege: PrivilegeView,
    pub payment: PaymentView,
}

fn section_view(session: &CheckoutSession, id: SectionId) -> SectionView {
    let seats = session.seat_map.section(id);
    SectionView {
        id,
        name_en: id.name_en(),
        name_ua: id.name_ua(),
        price: seats.first().map(|s| s.price).unwrap_or_else(|| id.default_price()),
        seats: seats
            .iter()
            .map(|seat| SeatView {
                id: seat.id.clone(),
                label: seat.label.clone(),
                row: seat.row,
                number: seat.number,
                price: seat.price,
                available: seat.available,
                selected: session.selection.contains(&seat.id),
            })
            .collect(),
    }
}

fn checkout_view(session: &CheckoutSession) -> CheckoutView {
    CheckoutView {
        session_id: session.id,
        performance_id: session.performance_id,
        performance_title: session.performance_title.clone(),
        phase: session.phase(),
        sections: SectionId::ALL.into_iter().map(|id| section_view(session, id)).collect(),
        selected: session
            .selection
            .seats()
            .iter()
            .map(|seat| SelectedSeatView {
                id: seat.id.clone(),
                section: seat.section,
                label: seat.label.clone(),
                price: seat.price,
            })
            .collect(),
        subtotal: session.selection.subtotal(),
        total: session.total(),
        privilege: PrivilegeView {
            enabled: session.privilege.enabled(),
            document_number: session.privilege.document_number().to_string(),
            status: session.privilege.status(),
            discount_applied: session.privilege.discount_applies(),
        },
        payment: PaymentView {
            missing_fields: session.payment.missing_fields(),
        },
    }
}

/* ---------- helpers ---------- */

fn session_not_found() -> AppError {
    AppError::NotFound("Checkout session not found".to_string())
}

/// Выполняет шаг над сессией и переводит ошибки в HTTP.
async fn with_session<R>(
    state: &AppState,
    id: Uuid,
    step: impl FnOnce(&mut CheckoutSession) -> Result<R, CheckoutError>,
) -> AppResult<R> {
    state
        .checkout
        .with_session(id, step)
        .await
        .ok_or_else(session_not_found)?
        .map_err(AppError::from)
}

/* ---------- handlers ---------- */

// POST /api/performances/{id}/checkout
async fn start_checkout(
    State(state): State<Arc<AppState>>,
    Path(performance_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let performance = Performance::find(performance_id, &state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Performance {} not found", performance_id)))?;

    let prices = state.pricing.current().await;
    let session = {
        let mut rng = rand::rng();
        CheckoutSession::new(performance.id, performance.title, &prices, &mut rng)
    };
    let view = checkout_view(&session);
    let id = state.checkout.insert(session).await;

    info!("Checkout session {} started for performance {}", id, performance_id);
    Ok((StatusCode::CREATED, Json(view)))
}

// GET /api/checkout/{session_id}
async fn get_checkout(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<CheckoutView>> {
    let view = with_session(&state, session_id, |s| Ok(checkout_view(s))).await?;
    Ok(Json(view))
}

// GET /api/checkout/{session_id}/sections/{section_id}
async fn get_section(
    State(state): State<Arc<AppState>>,
    Path((session_id, section_id)): Path<(Uuid, String)>,
) -> AppResult<Json<SectionView>> {
    let section: SectionId = section_id
        .parse()
        .map_err(|e: crate::booking::section::UnknownSection| AppError::NotFound(e.to_string()))?;
    let view = with_session(&state, session_id, |s| Ok(section_view(s, section))).await?;
    Ok(Json(view))
}

// POST /api/checkout/{session_id}/seats/{seat_id}/toggle
async fn toggle_seat(
    State(state): State<Arc<AppState>>,
    Path((session_id, seat_id)): Path<(Uuid, String)>,
) -> AppResult<impl IntoResponse> {
    let (outcome, view) = with_session(&state, session_id, |s| {
        let outcome = s.toggle_seat(&seat_id)?;
        Ok((outcome, checkout_view(s)))
    })
    .await?;

    Ok(Json(json!({ "outcome": outcome, "checkout": view })))
}

#[derive(Debug, Deserialize)]
pub struct PrivilegeToggleRequest {
    pub enabled: bool,
}

// PUT /api/checkout/{session_id}/privilege
async fn set_privilege_enabled(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<PrivilegeToggleRequest>,
) -> AppResult<Json<CheckoutView>> {
    let view = with_session(&state, session_id, |s| {
        s.set_privilege_enabled(req.enabled)?;
        Ok(checkout_view(s))
    })
    .await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
pub struct PrivilegeNumberRequest {
    pub document_number: String,
}

// PATCH /api/checkout/{session_id}/privilege
async fn set_privilege_number(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<PrivilegeNumberRequest>,
) -> AppResult<Json<CheckoutView>> {
    let view = with_session(&state, session_id, |s| {
        s.set_privilege_number(req.document_number)?;
        Ok(checkout_view(s))
    })
    .await?;
    Ok(Json(view))
}

// POST /api/checkout/{session_id}/privilege/verify
async fn verify_privilege(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let (status, view) = with_session(&state, session_id, |s| {
        let status = s.verify_privilege()?;
        Ok((status, checkout_view(s)))
    })
    .await?;
    Ok(Json(json!({ "status": status, "checkout": view })))
}

// POST /api/checkout/{session_id}/refresh-prices
async fn refresh_prices(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<CheckoutView>> {
    let prices = state.pricing.refresh().await;
    let view = with_session(&state, session_id, |s| {
        s.apply_prices(&prices);
        Ok(checkout_view(s))
    })
    .await?;
    Ok(Json(view))
}

// POST /api/checkout/{session_id}/proceed
async fn proceed(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<CheckoutView>> {
    let view = with_session(&state, session_id, |s| {
        s.proceed(user.is_some())?;
        Ok(checkout_view(s))
    })
    .await?;
    Ok(Json(view))
}

// POST /api/checkout/{session_id}/back
async fn back(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<CheckoutView>> {
    let view = with_session(&state, session_id, |s| {
        s.back()?;
        Ok(checkout_view(s))
    })
    .await?;
    Ok(Json(view))
}

// PATCH /api/checkout/{session_id}/payment
async fn update_payment(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(patch): Json<PaymentDraftPatch>,
) -> AppResult<Json<CheckoutView>> {
    let view = with_session(&state, session_id, |s| {
        s.update_payment(patch)?;
        Ok(checkout_view(s))
    })
    .await?;
    Ok(Json(view))
}

// POST /api/checkout/{session_id}/complete - тело с данными карты необязательно
async fn complete(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let patch = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        let patch: PaymentDraftPatch = serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("invalid payment data: {}", e)))?;
        Some(patch)
    };

    let confirmation = state
        .checkout
        .take_with(session_id, |s| s.complete(patch))
        .await
        .ok_or_else(session_not_found)?
        .map_err(AppError::from)?;

    info!(
        "Checkout {} completed: {} seats, total {:.2}",
        session_id, confirmation.seat_count, confirmation.total
    );
    Ok(Json(confirmation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::PriceTable;
    use rand::{rngs::StdRng, SeedableRng};

    fn session() -> CheckoutSession {
        CheckoutSession::new(3, "Hamlet", &PriceTable::default(), &mut StdRng::seed_from_u64(11))
    }

    #[test]
    fn view_marks_selected_seats() {
        let mut s = session();
        let seat = s
            .seat_map
            .section(SectionId::Mezzanine)
            .iter()
            .find(|seat| seat.available)
            .map(|seat| seat.id.clone())
            .unwrap();
        s.toggle_seat(&seat).unwrap();

        let view = checkout_view(&s);
        assert_eq!(view.sections.len(), 5);
        assert_eq!(view.selected.len(), 1);
        assert_eq!(view.total, 800.0);
        let mezzanine = view.sections.iter().find(|v| v.id == SectionId::Mezzanine).unwrap();
        assert_eq!(mezzanine.seats.iter().filter(|v| v.selected).count(), 1);
    }

    #[test]
    fn view_never_echoes_card_data() {
        let mut s = session();
        let seat = s
            .seat_map
            .section(SectionId::ThirdTier)
            .iter()
            .find(|seat| seat.available)
            .map(|seat| seat.id.clone())
            .unwrap();
        s.toggle_seat(&seat).unwrap();
        s.proceed(true).unwrap();
        s.update_payment(PaymentDraftPatch {
            card_number: Some("4111111111111111".into()),
            ..Default::default()
        })
        .unwrap();

        let json = serde_json::to_string(&checkout_view(&s)).unwrap();
        assert!(!json.contains("4111111111111111"));
        assert!(json.contains("cardholder_name"));
    }
}
