use serde::Serialize;

use super::pricing::PriceTable;
use super::seat_map::Seat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// Место занято, клик игнорируется.
    Unavailable,
}

/// Выбранные посетителем места в порядке кликов.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Selection {
    seats: Vec<Seat>,
}

impl Selection {
    pub fn toggle(&mut self, seat: &Seat) -> ToggleOutcome {
        if !seat.available {
            return ToggleOutcome::Unavailable;
        }

        if let Some(pos) = self.seats.iter().position(|s| s.id == seat.id) {
            self.seats.remove(pos);
            ToggleOutcome::Removed
        } else {
            self.seats.push(seat.clone());
            ToggleOutcome::Added
        }
    }

    pub fn contains(&self, seat_id: &str) -> bool {
        self.seats.iter().any(|s| s.id == seat_id)
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn subtotal(&self) -> f64 {
        self.seats.iter().map(|s| s.price).sum()
    }

    pub fn reprice(&mut self, prices: &PriceTable) {
        for seat in self.seats.iter_mut() {
            seat.price = prices.price(seat.section);
        }
    }

    pub fn labels(&self) -> Vec<String> {
        self.seats.iter().map(|s| s.label.clone()).collect()
    }
}
