//! Liveness check.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::config;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /api/health`
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    // verify the db answers
    let conn = ctx.db()?;
    crate::db::count_tables(&conn)?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: config::APP_VERSION,
    }))
}
