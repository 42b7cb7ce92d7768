//! Sensor-device confirmation endpoint.
//!
//! The pillbox sensor posts the medication id it detected; the ledger marks
//! today's obligation taken and tags the audit event as device-sourced.

use axum::extract::State;
use axum::Extension;
use axum::Json;
use chrono::Local;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CallerIdentity};
use crate::ledger;
use crate::models::enums::DoseSource;
use crate::models::DoseObligation;

#[derive(Deserialize)]
pub struct DeviceConfirmRequest {
    pub medication_id: Uuid,
}

/// `POST /api/device/confirm`
pub async fn confirm(
    State(ctx): State<ApiContext>,
    Extension(_caller): Extension<CallerIdentity>,
    Json(req): Json<DeviceConfirmRequest>,
) -> Result<Json<DoseObligation>, ApiError> {
    let conn = ctx.db()?;
    let now = Local::now().naive_local();
    let obligation = ledger::confirm_by_medication(
        &conn,
        &req.medication_id,
        DoseSource::Device,
        now.date(),
        now,
    )?;
    Ok(Json(obligation))
}
