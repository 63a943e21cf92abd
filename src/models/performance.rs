use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Performance {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub director: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    pub main_image: Option<String>,
}

impl Performance {
    pub async fn find(id: i64, db: &crate::database::Database) -> Result<Option<Performance>, sqlx::Error> {
        sqlx::query_as::<_, Performance>(
            "SELECT id, title, description, director, date, start_time, end_time, main_image
             FROM performances WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&db.pool)
        .await
    }
}
