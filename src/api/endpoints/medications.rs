//! Medication endpoints.
//!
//! Create/update/delete run the schedule expander inside the request's
//! transaction; GETs are plain reads. Detail includes the expanded
//! obligations and the confirmation audit trail.

use axum::extract::{Path, State};
use axum::Extension;
use axum::Json;
use chrono::Local;
use serde::Serialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CallerIdentity};
use crate::db;
use crate::ledger;
use crate::models::enums::DoseSource;
use crate::models::{DoseEvent, DoseObligation, Medication};
use crate::schedule::{self, MedicationInput};

#[derive(Serialize)]
pub struct MedicationsResponse {
    pub medications: Vec<Medication>,
}

/// `GET /api/medications` — all medications, newest first.
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<MedicationsResponse>, ApiError> {
    let conn = ctx.db()?;
    let medications = db::get_all_medications(&conn)?;
    Ok(Json(MedicationsResponse { medications }))
}

#[derive(Serialize)]
pub struct MedicationDetailResponse {
    pub medication: Medication,
    pub obligations: Vec<DoseObligation>,
    pub events: Vec<DoseEvent>,
}

/// `GET /api/medications/:id` — medication with its expansion and audit log.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<MedicationDetailResponse>, ApiError> {
    let conn = ctx.db()?;
    let medication = db::get_medication(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound(format!("medication {id}")))?;
    let obligations = db::get_obligations_for_medication(&conn, &id)?;
    let events = db::get_dose_events(&conn, &id)?;
    Ok(Json(MedicationDetailResponse {
        medication,
        obligations,
        events,
    }))
}

/// `POST /api/medications` — create and expand. Caller becomes the owner.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerIdentity>,
    Json(input): Json<MedicationInput>,
) -> Result<Json<Medication>, ApiError> {
    let conn = ctx.db()?;
    let med = schedule::create_medication(&conn, caller.user_id, &input, Local::now().naive_local())?;
    Ok(Json(med))
}

/// `PUT /api/medications/:id` — edit and reconcile the expansion.
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(_caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
    Json(input): Json<MedicationInput>,
) -> Result<Json<Medication>, ApiError> {
    let conn = ctx.db()?;
    let med = schedule::update_medication(&conn, &id, &input, Local::now().naive_local())?;
    Ok(Json(med))
}

/// `DELETE /api/medications/:id` — hard delete, obligations and events cascade.
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(_caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = ctx.db()?;
    schedule::delete_medication(&conn, &id)?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}

/// `POST /api/medications/:id/confirm` — manual confirmation of today's dose.
pub async fn confirm(
    State(ctx): State<ApiContext>,
    Extension(_caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
) -> Result<Json<DoseObligation>, ApiError> {
    let conn = ctx.db()?;
    let now = Local::now().naive_local();
    let obligation = ledger::confirm_by_medication(&conn, &id, DoseSource::Manual, now.date(), now)?;
    Ok(Json(obligation))
}
