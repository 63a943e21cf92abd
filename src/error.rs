use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::booking::{checkout::LOGIN_REDIRECT, CheckoutError};

/// Ошибка HTTP-слоя. Тело ответа всегда `{ "error": ... }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    LoginRequired(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized(_) | AppError::LoginRequired(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::LoginRequired(msg) => json!({ "error": msg, "redirect": LOGIN_REDIRECT }),
            AppError::Database(e) => {
                // детали SQL наружу не отдаём
                tracing::error!("database error: {:?}", e);
                json!({ "error": "Internal server error" })
            }
            AppError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                json!({ "error": "Internal server error" })
            }
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::LoginRequired => AppError::LoginRequired(err.to_string()),
            CheckoutError::UnknownSeat(_) => AppError::NotFound(err.to_string()),
            CheckoutError::WrongPhase { .. } => AppError::Conflict(err.to_string()),
            CheckoutError::EmptySelection | CheckoutError::IncompletePayment(_) => {
                AppError::Validation(err.to_string())
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let reason = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "invalid".to_string());
                format!("{}: {}", field, reason)
            })
            .collect();
        fields.sort();
        AppError::Validation(fields.join("; "))
    }
}
