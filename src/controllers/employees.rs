use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AdminUser;
use crate::models::{employee::SalaryEstimate, Employee};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/employees", get(list_employees).post(create_employee))
        .route("/employees/{id}", put(update_employee).delete(delete_employee))
        .route("/employees/{id}/salary", post(calculate_salary))
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Employee {} not found", id))
}

// GET /api/employees
async fn list_employees(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> AppResult<Json<Vec<Employee>>> {
    let employees = sqlx::query_as::<_, Employee>(
        "SELECT id, name, position, hourly_rate FROM employees ORDER BY name"
    )
    .fetch_all(&state.db.pool)
    .await?;
    Ok(Json(employees))
}

#[derive(Debug, Deserialize, Validate)]
pub struct EmployeeRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "is required"))]
    pub position: String,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub hourly_rate: f64,
}

// POST /api/employees
async fn create_employee(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Json(req): Json<EmployeeRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;

    let employee = sqlx::query_as::<_, Employee>(
        "INSERT INTO employees (name, position, hourly_rate)
         VALUES ($1, $2, $3)
         RETURNING id, name, position, hourly_rate"
    )
    .bind(&req.name)
    .bind(&req.position)
    .bind(req.hourly_rate)
    .fetch_one(&state.db.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(employee)))
}

// PUT /api/employees/{id}
async fn update_employee(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
    Json(req): Json<EmployeeRequest>,
) -> AppResult<Json<Employee>> {
    req.validate()?;

    let employee = sqlx::query_as::<_, Employee>(
        "UPDATE employees SET name = $1, position = $2, hourly_rate = $3
         WHERE id = $4
         RETURNING id, name, position, hourly_rate"
    )
    .bind(&req.name)
    .bind(&req.position)
    .bind(req.hourly_rate)
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or_else(|| not_found(id))?;

    Ok(Json(employee))
}

// DELETE /api/employees/{id}
async fn delete_employee(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let result = sqlx::query("DELETE FROM employees WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
pub struct SalaryRequest {
    #[validate(range(exclusive_min = 0.0, max = 24.0, message = "must be between 0 and 24"))]
    pub hours_per_day: f64,
    #[validate(range(min = 1, max = 31, message = "must be between 1 and 31"))]
    pub working_days: u32,
}

#[derive(Debug, Serialize)]
pub struct SalaryResponse {
    pub employee: Employee,
    #[serde(flatten)]
    pub salary: SalaryEstimate,
}

// POST /api/employees/{id}/salary
async fn calculate_salary(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
    Json(req): Json<SalaryRequest>,
) -> AppResult<Json<SalaryResponse>> {
    req.validate()?;

    let employee = sqlx::query_as::<_, Employee>(
        "SELECT id, name, position, hourly_rate FROM employees WHERE id = $1"
    )
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or_else(|| not_found(id))?;

    let salary = employee.salary(req.hours_per_day, req.working_days);
    Ok(Json(SalaryResponse { employee, salary }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salary_inputs_must_be_positive() {
        assert!(SalaryRequest { hours_per_day: 8.0, working_days: 22 }.validate().is_ok());
        assert!(SalaryRequest { hours_per_day: 0.0, working_days: 22 }.validate().is_err());
        assert!(SalaryRequest { hours_per_day: 8.0, working_days: 0 }.validate().is_err());
    }
}
