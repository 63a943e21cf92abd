pub mod auth;
pub mod checkout;
pub mod comments;
pub mod employees;
pub mod news;
pub mod performances;
pub mod reports;
pub mod sections;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(auth::routes())
        .merge(sections::routes())
        .merge(performances::routes())
        .merge(checkout::routes())
        .merge(comments::routes())
        .merge(news::routes())
        .merge(employees::routes())
        .merge(reports::routes())
}
