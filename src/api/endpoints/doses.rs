//! Dose obligation endpoints: list/filter by date, per-day quantity edits,
//! and direct confirmation of a single obligation.

use axum::extract::{Path, Query, State};
use axum::Extension;
use axum::Json;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CallerIdentity};
use crate::db;
use crate::ledger;
use crate::models::DoseObligation;

#[derive(Deserialize)]
pub struct DoseListQuery {
    /// `YYYY-MM-DD`; omitted = all obligations.
    pub date: Option<String>,
}

#[derive(Serialize)]
pub struct DosesResponse {
    pub obligations: Vec<DoseObligation>,
}

/// `GET /api/doses?date=YYYY-MM-DD`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<DoseListQuery>,
) -> Result<Json<DosesResponse>, ApiError> {
    let conn = ctx.db()?;
    let obligations = match query.date {
        Some(raw) => {
            let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|e| ApiError::BadRequest(format!("Invalid date '{raw}': {e}")))?;
            db::get_obligations_on(&conn, date)?
        }
        None => db::get_all_obligations(&conn)?,
    };
    Ok(Json(DosesResponse { obligations }))
}

#[derive(Deserialize)]
pub struct TodayQuery {
    pub medication_id: Uuid,
}

/// `GET /api/doses/today?medication_id=` — the obligation a sensor device
/// polls before signalling a confirmation.
pub async fn today(
    State(ctx): State<ApiContext>,
    Query(query): Query<TodayQuery>,
) -> Result<Json<DoseObligation>, ApiError> {
    let conn = ctx.db()?;
    let today = Local::now().date_naive();
    let obligation = db::get_obligation_for_date(&conn, &query.medication_id, today)?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "no dose scheduled today for medication {}",
                query.medication_id
            ))
        })?;
    Ok(Json(obligation))
}

#[derive(Deserialize)]
pub struct QuantityPatch {
    pub quantity: i64,
}

/// `PATCH /api/doses/:id` — edit one day's quantity independently of the
/// medication (the next medication save re-syncs it).
pub async fn patch_quantity(
    State(ctx): State<ApiContext>,
    Extension(_caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
    Json(patch): Json<QuantityPatch>,
) -> Result<Json<DoseObligation>, ApiError> {
    if patch.quantity < 1 {
        return Err(ApiError::BadRequest(format!(
            "quantity must be at least 1, got {}",
            patch.quantity
        )));
    }
    let conn = ctx.db()?;
    db::set_obligation_quantity(&conn, &id, patch.quantity)?;
    let obligation = db::get_obligation(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound(format!("dose_obligation {id}")))?;
    Ok(Json(obligation))
}

/// `POST /api/doses/:id/take` — confirm a specific obligation. Idempotent.
pub async fn take(
    State(ctx): State<ApiContext>,
    Extension(_caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
) -> Result<Json<DoseObligation>, ApiError> {
    let conn = ctx.db()?;
    let obligation = ledger::confirm_obligation(&conn, &id, Local::now().naive_local())?;
    Ok(Json(obligation))
}
