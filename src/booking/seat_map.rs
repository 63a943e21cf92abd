use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;

use super::pricing::PriceTable;
use super::section::SectionId;

/// Вероятность того, что сгенерированное место свободно.
pub const AVAILABILITY_RATE: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Seat {
    pub id: String,
    pub section: SectionId,
    pub row: char,
    pub number: u32,
    pub label: String,
    pub price: f64,
    pub available: bool,
}

impl Seat {
    pub fn seat_id(section: SectionId, row: char, number: u32) -> String {
        format!("{}_{}{}", section, row, number)
    }
}

/// Генерирует сетку мест секции. Форма сетки фиксирована, доступность случайна.
pub fn generate_section<R: Rng + ?Sized>(section: SectionId, price: f64, rng: &mut R) -> Vec<Seat> {
    let (rows, per_row) = section.dimensions();
    let mut seats = Vec::with_capacity(rows as usize * per_row as usize);

    for row_idx in 0..rows {
        let row = char::from(b'A' + row_idx);
        for number in 1..=per_row {
            seats.push(Seat {
                id: Seat::seat_id(section, row, number),
                section,
                row,
                number,
                label: format!("{}{}", row, number),
                price,
                available: rng.random_bool(AVAILABILITY_RATE),
            });
        }
    }

    seats
}

/// План зала для одной сессии покупки: все пять секций.
#[derive(Debug, Clone, Serialize)]
pub struct SeatMap {
    sections: BTreeMap<SectionId, Vec<Seat>>,
}

impl SeatMap {
    pub fn generate<R: Rng + ?Sized>(prices: &PriceTable, rng: &mut R) -> Self {
        let sections = SectionId::ALL
            .into_iter()
            .map(|id| (id, generate_section(id, prices.price(id), rng)))
            .collect();
        Self { sections }
    }

    pub fn section(&self, id: SectionId) -> &[Seat] {
        self.sections.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find(&self, seat_id: &str) -> Option<&Seat> {
        // префикс id совпадает с секцией, так что ищем только в ней
        let (section, _) = seat_id.split_once('_')?;
        let section: SectionId = section.parse().ok()?;
        self.section(section).iter().find(|seat| seat.id == seat_id)
    }

    /// Обновляет цены мест, не трогая доступность.
    pub fn reprice(&mut self, prices: &PriceTable) {
        for (id, seats) in self.sections.iter_mut() {
            let price = prices.price(*id);
            for seat in seats.iter_mut() {
                seat.price = price;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sections.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn available_count(&self) -> usize {
        self.sections
            .values()
            .flatten()
            .filter(|seat| seat.available)
            .count()
    }
}
