use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct NewsArticle {
    pub id: i64,
    pub title_ua: String,
    pub title_en: String,
    pub summary_ua: Option<String>,
    pub summary_en: Option<String>,
    pub content_ua: String,
    pub content_en: String,
    pub date: NaiveDate,
    pub image: Option<String>,
}
