//! Сессия покупки билетов: выбор мест -> форма оплаты -> подтверждение.
//!
//! Сессия живёт только в памяти процесса. Покупка нигде не сохраняется,
//! оплата не проводится, места не блокируются для других посетителей.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::pricing::PriceTable;
use super::privilege::{PrivilegeDocument, PrivilegeStatus};
use super::seat_map::SeatMap;
use super::selection::{Selection, ToggleOutcome};

pub const LOGIN_REDIRECT: &str = "/login";
pub const PROFILE_REDIRECT: &str = "/profile";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutPhase {
    Selecting,
    Paying,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CheckoutError {
    #[error("Please log in to purchase tickets.")]
    LoginRequired,
    #[error("Please select at least one seat to continue.")]
    EmptySelection,
    #[error("Seat {0} does not exist")]
    UnknownSeat(String),
    #[error("Action is not allowed while checkout is {actual:?}")]
    WrongPhase { actual: CheckoutPhase },
    #[error("Please fill in all payment fields: {}", .0.join(", "))]
    IncompletePayment(Vec<&'static str>),
}

/// Черновик платёжных данных. Проверяется только на непустоту.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentDraft {
    #[serde(default)]
    pub cardholder_name: String,
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub expiry: String,
    #[serde(default)]
    pub cvv: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentDraftPatch {
    pub cardholder_name: Option<String>,
    pub card_number: Option<String>,
    pub expiry: Option<String>,
    pub cvv: Option<String>,
}

impl PaymentDraft {
    pub fn apply(&mut self, patch: PaymentDraftPatch) {
        if let Some(v) = patch.cardholder_name {
            self.cardholder_name = v;
        }
        if let Some(v) = patch.card_number {
            self.card_number = v;
        }
        if let Some(v) = patch.expiry {
            self.expiry = v;
        }
        if let Some(v) = patch.cvv {
            self.cvv = v;
        }
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("cardholder_name", &self.cardholder_name),
            ("card_number", &self.card_number),
            ("expiry", &self.expiry),
            ("cvv", &self.cvv),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseConfirmation {
    pub performance_id: i64,
    pub seat_count: usize,
    pub seats: Vec<String>,
    pub total: f64,
    pub discount_applied: bool,
    pub message: String,
    pub redirect: &'static str,
}

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: Uuid,
    pub performance_id: i64,
    pub performance_title: String,
    pub seat_map: SeatMap,
    pub selection: Selection,
    pub privilege: PrivilegeDocument,
    pub payment: PaymentDraft,
    phase: CheckoutPhase,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl CheckoutSession {
    pub fn new<R: Rng + ?Sized>(
        performance_id: i64,
        performance_title: impl Into<String>,
        prices: &PriceTable,
        rng: &mut R,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            performance_id,
            performance_title: performance_title.into(),
            seat_map: SeatMap::generate(prices, rng),
            selection: Selection::default(),
            privilege: PrivilegeDocument::default(),
            payment: PaymentDraft::default(),
            phase: CheckoutPhase::Selecting,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn phase(&self) -> CheckoutPhase {
        self.phase
    }

    fn require(&self, phase: CheckoutPhase) -> Result<(), CheckoutError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(CheckoutError::WrongPhase { actual: self.phase })
        }
    }

    pub fn toggle_seat(&mut self, seat_id: &str) -> Result<ToggleOutcome, CheckoutError> {
        self.require(CheckoutPhase::Selecting)?;
        let seat = self
            .seat_map
            .find(seat_id)
            .ok_or_else(|| CheckoutError::UnknownSeat(seat_id.to_string()))?;
        Ok(self.selection.toggle(seat))
    }

    pub fn set_privilege_enabled(&mut self, enabled: bool) -> Result<(), CheckoutError> {
        self.require(CheckoutPhase::Selecting)?;
        self.privilege.set_enabled(enabled);
        Ok(())
    }

    pub fn set_privilege_number(&mut self, number: String) -> Result<(), CheckoutError> {
        self.require(CheckoutPhase::Selecting)?;
        self.privilege.set_document_number(number);
        Ok(())
    }

    pub fn verify_privilege(&mut self) -> Result<PrivilegeStatus, CheckoutError> {
        self.require(CheckoutPhase::Selecting)?;
        Ok(self.privilege.verify())
    }

    /// Новые цены применяются к плану и к уже выбранным местам.
    /// Доступность мест при этом не перегенерируется.
    pub fn apply_prices(&mut self, prices: &PriceTable) {
        self.seat_map.reprice(prices);
        self.selection.reprice(prices);
    }

    pub fn total(&self) -> f64 {
        self.privilege.apply(self.selection.subtotal())
    }

    /// selecting -> paying. Авторизация проверяется раньше пустого выбора.
    pub fn proceed(&mut self, authenticated: bool) -> Result<(), CheckoutError> {
        self.require(CheckoutPhase::Selecting)?;
        if !authenticated {
            return Err(CheckoutError::LoginRequired);
        }
        if self.selection.is_empty() {
            return Err(CheckoutError::EmptySelection);
        }
        self.phase = CheckoutPhase::Paying;
        Ok(())
    }

    /// paying -> selecting, ничего не теряется.
    pub fn back(&mut self) -> Result<(), CheckoutError> {
        self.require(CheckoutPhase::Paying)?;
        self.phase = CheckoutPhase::Selecting;
        Ok(())
    }

    pub fn update_payment(&mut self, patch: PaymentDraftPatch) -> Result<(), CheckoutError> {
        self.require(CheckoutPhase::Paying)?;
        self.payment.apply(patch);
        Ok(())
    }

    pub fn complete(
        &mut self,
        patch: Option<PaymentDraftPatch>,
    ) -> Result<PurchaseConfirmation, CheckoutError> {
        self.require(CheckoutPhase::Paying)?;
        if let Some(patch) = patch {
            self.payment.apply(patch);
        }

        let missing = self.payment.missing_fields();
        if !missing.is_empty() {
            return Err(CheckoutError::IncompletePayment(missing));
        }

        let seat_count = self.selection.len();
        Ok(PurchaseConfirmation {
            performance_id: self.performance_id,
            seat_count,
            seats: self.selection.labels(),
            total: self.total(),
            discount_applied: self.privilege.discount_applies(),
            message: format!(
                "You have successfully purchased {} tickets for {}. An email receipt has been sent to your email address.",
                seat_count, self.performance_title
            ),
            redirect: PROFILE_REDIRECT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::section::SectionId;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn session(seed: u64) -> CheckoutSession {
        CheckoutSession::new(1, "Hamlet", &PriceTable::default(), &mut StdRng::seed_from_u64(seed))
    }

    /// Первые n свободных мест партера.
    fn free_parterre(session: &CheckoutSession, n: usize) -> Vec<String> {
        session
            .seat_map
            .section(SectionId::Parterre)
            .iter()
            .filter(|s| s.available)
            .take(n)
            .map(|s| s.id.clone())
            .collect()
    }

    /// Сессия, где A1 и A2 партера гарантированно свободны.
    fn session_with_free_a1_a2() -> CheckoutSession {
        (0..)
            .map(session)
            .find(|s| {
                let a1 = s.seat_map.find("parterre_A1").map(|x| x.available);
                let a2 = s.seat_map.find("parterre_A2").map(|x| x.available);
                a1 == Some(true) && a2 == Some(true)
            })
            .unwrap()
    }

    fn filled_draft() -> PaymentDraftPatch {
        PaymentDraftPatch {
            cardholder_name: Some("Ivan Franko".into()),
            card_number: Some("4111 1111 1111 1111".into()),
            expiry: Some("12/27".into()),
            cvv: Some("123".into()),
        }
    }

    #[test]
    fn two_parterre_seats_cost_2000() {
        let mut s = session_with_free_a1_a2();
        s.toggle_seat("parterre_A1").unwrap();
        s.toggle_seat("parterre_A2").unwrap();
        assert_eq!(s.total(), 2000.0);
    }

    #[test]
    fn verified_privilege_gives_1600() {
        let mut s = session_with_free_a1_a2();
        s.toggle_seat("parterre_A1").unwrap();
        s.toggle_seat("parterre_A2").unwrap();
        s.set_privilege_enabled(true).unwrap();
        s.set_privilege_number("ABC123".into()).unwrap();
        assert_eq!(s.verify_privilege().unwrap(), PrivilegeStatus::Valid);
        assert_eq!(s.total(), 1600.0);
    }

    #[test]
    fn unauthenticated_proceed_requires_login() {
        let mut s = session(1);
        let seat = free_parterre(&s, 1).remove(0);
        s.toggle_seat(&seat).unwrap();
        assert_eq!(s.proceed(false), Err(CheckoutError::LoginRequired));
        assert_eq!(s.phase(), CheckoutPhase::Selecting);
    }

    #[test]
    fn empty_selection_blocks_proceed() {
        let mut s = session(2);
        assert_eq!(s.proceed(true), Err(CheckoutError::EmptySelection));
        assert_eq!(s.phase(), CheckoutPhase::Selecting);
    }

    #[test]
    fn unknown_seat_is_rejected() {
        let mut s = session(3);
        assert_eq!(
            s.toggle_seat("parterre_Z99"),
            Err(CheckoutError::UnknownSeat("parterre_Z99".into()))
        );
    }

    #[test]
    fn back_keeps_selection_and_draft() {
        let mut s = session(4);
        for id in free_parterre(&s, 3) {
            s.toggle_seat(&id).unwrap();
        }
        s.proceed(true).unwrap();
        s.update_payment(PaymentDraftPatch {
            cardholder_name: Some("Lesya".into()),
            ..Default::default()
        })
        .unwrap();

        s.back().unwrap();
        assert_eq!(s.phase(), CheckoutPhase::Selecting);
        assert_eq!(s.selection.len(), 3);
        assert_eq!(s.payment.cardholder_name, "Lesya");
    }

    #[test]
    fn seats_are_frozen_while_paying() {
        let mut s = session(5);
        let ids = free_parterre(&s, 2);
        s.toggle_seat(&ids[0]).unwrap();
        s.proceed(true).unwrap();
        assert_eq!(
            s.toggle_seat(&ids[1]),
            Err(CheckoutError::WrongPhase { actual: CheckoutPhase::Paying })
        );
    }

    #[test]
    fn complete_requires_every_field() {
        let mut s = session(6);
        let id = free_parterre(&s, 1).remove(0);
        s.toggle_seat(&id).unwrap();
        s.proceed(true).unwrap();

        let partial = PaymentDraftPatch {
            cardholder_name: Some("Taras".into()),
            card_number: Some("   ".into()),
            ..Default::default()
        };
        match s.complete(Some(partial)) {
            Err(CheckoutError::IncompletePayment(missing)) => {
                assert_eq!(missing, vec!["card_number", "expiry", "cvv"]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(s.phase(), CheckoutPhase::Paying);
    }

    #[test]
    fn complete_returns_confirmation() {
        let mut s = session(7);
        for id in free_parterre(&s, 2) {
            s.toggle_seat(&id).unwrap();
        }
        s.proceed(true).unwrap();
        let confirmation = s.complete(Some(filled_draft())).unwrap();

        assert_eq!(confirmation.seat_count, 2);
        assert_eq!(confirmation.total, 2000.0);
        assert!(!confirmation.discount_applied);
        assert_eq!(confirmation.redirect, "/profile");
        assert!(confirmation.message.contains("2 tickets"));
    }

    #[test]
    fn complete_before_paying_is_rejected() {
        let mut s = session(8);
        assert_eq!(
            s.complete(Some(filled_draft())),
            Err(CheckoutError::WrongPhase { actual: CheckoutPhase::Selecting })
        );
    }

    #[test]
    fn price_refresh_updates_selected_seats_only_by_price() {
        let mut s = session(9);
        let id = free_parterre(&s, 1).remove(0);
        s.toggle_seat(&id).unwrap();

        let rows = vec![crate::models::TicketSection {
            section_id: "parterre".into(),
            name_en: "Parterre".into(),
            name_ua: "Партер".into(),
            price: Some(1500.0),
        }];
        s.apply_prices(&PriceTable::resolve(&rows));

        assert!(s.selection.contains(&id));
        assert_eq!(s.total(), 1500.0);
        assert!(s.seat_map.find(&id).unwrap().available);
    }

    proptest! {
        #[test]
        fn total_matches_formula(picks in proptest::collection::vec(0usize..500, 0..25), privileged in any::<bool>()) {
            let mut s = session(11);
            let all: Vec<String> = SectionId::ALL
                .iter()
                .flat_map(|id| s.seat_map.section(*id).iter().map(|seat| seat.id.clone()).collect::<Vec<_>>())
                .collect();
            for i in picks {
                s.toggle_seat(&all[i % all.len()]).unwrap();
            }
            if privileged {
                s.set_privilege_enabled(true).unwrap();
                s.set_privilege_number("ABC123".into()).unwrap();
                s.verify_privilege().unwrap();
            }

            let sum: f64 = s.selection.seats().iter().map(|seat| seat.price).sum();
            let expected = if privileged { sum * 0.8 } else { sum };
            prop_assert!((s.total() - expected).abs() < 1e-9);
        }
    }
}
