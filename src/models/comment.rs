use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub performance_id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub text: String,
    pub rating: i32,
    pub date: NaiveDate,
}

/// Средняя оценка с округлением до десятых; 0 если отзывов нет.
pub fn average_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: i32 = ratings.iter().sum();
    (sum as f64 / ratings.len() as f64 * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::average_rating;

    #[test]
    fn rounds_to_one_decimal() {
        assert_eq!(average_rating(&[]), 0.0);
        assert_eq!(average_rating(&[5, 4, 5, 4, 5]), 4.6);
        assert_eq!(average_rating(&[5, 4, 4]), 4.3);
    }
}
