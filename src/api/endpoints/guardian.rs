//! Guardian contact configuration endpoints.

use axum::extract::State;
use axum::Extension;
use axum::Json;
use chrono::Local;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CallerIdentity};
use crate::db;
use crate::models::GuardianContact;

/// `GET /api/guardian`
pub async fn get(State(ctx): State<ApiContext>) -> Result<Json<GuardianContact>, ApiError> {
    let conn = ctx.db()?;
    let guardian = db::get_guardian(&conn)?
        .ok_or_else(|| ApiError::NotFound("guardian contact not configured".into()))?;
    Ok(Json(guardian))
}

#[derive(Deserialize)]
pub struct GuardianUpdate {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub owner_name: String,
    #[serde(default)]
    pub owner_email: String,
}

/// `PUT /api/guardian` — create-if-absent singleton write.
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(_caller): Extension<CallerIdentity>,
    Json(update): Json<GuardianUpdate>,
) -> Result<Json<GuardianContact>, ApiError> {
    if update.email.trim().is_empty() {
        return Err(ApiError::BadRequest("guardian email must not be empty".into()));
    }

    let guardian = GuardianContact {
        name: update.name,
        email: update.email,
        phone: update.phone,
        owner_name: update.owner_name,
        owner_email: update.owner_email,
        updated_at: Local::now().naive_local(),
    };

    let conn = ctx.db()?;
    db::upsert_guardian(&conn, &guardian)?;
    Ok(Json(guardian))
}
