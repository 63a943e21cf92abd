use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub position: String,
    pub hourly_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SalaryEstimate {
    pub daily: f64,
    pub monthly: f64,
}

impl Employee {
    pub fn salary(&self, hours_per_day: f64, working_days: u32) -> SalaryEstimate {
        let daily = self.hourly_rate * hours_per_day;
        SalaryEstimate {
            daily,
            monthly: daily * working_days as f64,
        }
    }
}
