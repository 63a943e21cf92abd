use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::section::SectionId;
use crate::models::TicketSection;

/// Итоговые цены по всем пяти секциям. Пропусков не бывает.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    prices: BTreeMap<SectionId, f64>,
}

impl Default for PriceTable {
    fn default() -> Self {
        Self {
            prices: SectionId::ALL
                .into_iter()
                .map(|id| (id, id.default_price()))
                .collect(),
        }
    }
}

impl PriceTable {
    /// Строит таблицу из строк хранилища: неизвестные секции игнорируются,
    /// отсутствующие или NULL цены заменяются дефолтами.
    pub fn resolve(rows: &[TicketSection]) -> Self {
        let mut table = Self::default();
        for row in rows {
            let Ok(id) = row.section_id.parse::<SectionId>() else {
                tracing::debug!("Skipping unknown section {}", row.section_id);
                continue;
            };
            if let Some(price) = row.price {
                table.prices.insert(id, price);
            }
        }
        table
    }

    pub fn price(&self, section: SectionId) -> f64 {
        self.prices
            .get(&section)
            .copied()
            .unwrap_or_else(|| section.default_price())
    }

    pub fn iter(&self) -> impl Iterator<Item = (SectionId, f64)> + '_ {
        self.prices.iter().map(|(id, price)| (*id, *price))
    }
}

/// Выручка по секциям: цена секции × проданные билеты.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitReport {
    pub sold: BTreeMap<SectionId, i64>,
    pub profits: BTreeMap<SectionId, f64>,
    pub total: f64,
}

impl PriceTable {
    pub fn profit(&self, sold: &BTreeMap<SectionId, i64>) -> ProfitReport {
        let profits: BTreeMap<SectionId, f64> = sold
            .iter()
            .map(|(id, count)| (*id, self.price(*id) * *count as f64))
            .collect();
        let total = profits.values().sum();
        ProfitReport {
            sold: sold.clone(),
            profits,
            total,
        }
    }
}
