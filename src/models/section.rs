use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Строка хранилища цен. Цена может быть не задана.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct TicketSection {
    pub section_id: String,
    pub name_en: String,
    pub name_ua: String,
    pub price: Option<f64>,
}
