//! On-demand missed-dose evaluation trigger.
//!
//! The external cron invoker hits this once per period. Runs are serialized
//! through the shared run lock; a trigger while a run is active gets 409
//! instead of a second concurrent run (overlap could double-send alerts).

use axum::extract::State;
use axum::Json;
use chrono::Local;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::evaluator::{self, EvaluationReport};

/// `POST /api/evaluation/run`
pub async fn run(State(ctx): State<ApiContext>) -> Result<Json<EvaluationReport>, ApiError> {
    let _run_guard = ctx.run_lock.try_lock().map_err(|_| ApiError::EvaluationBusy)?;

    let conn = ctx.db()?;
    let report = evaluator::run_evaluation(&conn, ctx.notifier.as_ref(), Local::now().naive_local())
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(report))
}
