use axum::{extract::State, response::Json};
use sea_orm::ConnectionTrait;
use serde::Serialize;

use super::ApiResponse;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub database: bool,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    let backend = state.db.get_database_backend();
    let database = state
        .db
        .execute(sea_orm::Statement::from_string(backend, "SELECT 1".to_owned()))
        .await
        .map_err(|e| tracing::warn!("Database ping failed: {}", e))
        .is_ok();

    Json(ApiResponse::success(HealthStatus {
        status: if database { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
    }))
}
