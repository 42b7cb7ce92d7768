//! Missed-Dose Evaluator — scans the trailing three-day window and alerts
//! the guardian about medications with no confirmed dose.
//!
//! Per medication the run resolves to one of: skip because a dose in the
//! window was taken, skip because some alarm's grace period has not elapsed
//! yet, or notify. A single take anywhere in the window clears the alert;
//! a single not-yet-due date blocks it. There is no persisted notified
//! marker, so the condition re-notifies on every run while it persists
//! (bounded by the run cadence; see DESIGN.md).

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime};
use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::models::{DoseObligation, Medication};
use crate::notifier::{MissedDoseAlert, Notifier};

/// Days before today included in the evaluation window.
pub const WINDOW_TRAILING_DAYS: i64 = 2;

/// Minutes after the scheduled alarm before a dose counts as overdue.
pub const GRACE_MINUTES: i64 = 30;

#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    /// Guardian contact missing or has no email; nothing was evaluated.
    SkippedNoGuardian,
}

/// A delivery failure for one medication. Never aborts the rest of the run.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryFailure {
    pub medication_id: Uuid,
    pub medication_name: String,
    pub error: String,
}

/// Summary of one evaluation run.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub outcome: RunOutcome,
    pub medications_checked: usize,
    pub notified: Vec<String>,
    pub failures: Vec<DeliveryFailure>,
}

impl EvaluationReport {
    fn skipped() -> Self {
        Self {
            outcome: RunOutcome::SkippedNoGuardian,
            medications_checked: 0,
            notified: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// Run one missed-dose evaluation at `now` (local wall-clock time).
///
/// Callers must not run this concurrently with itself; the HTTP layer and
/// the periodic loop both serialize runs through a shared lock.
pub fn run_evaluation(
    conn: &Connection,
    notifier: &dyn Notifier,
    now: NaiveDateTime,
) -> Result<EvaluationReport, EvaluationError> {
    let today = now.date();
    let window_start = today - Duration::days(WINDOW_TRAILING_DAYS);

    let guardian = match db::get_guardian(conn)? {
        Some(g) if !g.email.trim().is_empty() => g,
        _ => {
            tracing::warn!("No guardian contact configured, skipping missed-dose run");
            return Ok(EvaluationReport::skipped());
        }
    };

    tracing::info!(window_start = %window_start, window_end = %today, "Missed-dose evaluation started");

    let rows = db::get_obligations_in_window(conn, window_start, today)?;

    // group by medication, keeping the joined medication row
    let mut groups: BTreeMap<Uuid, (Medication, Vec<DoseObligation>)> = BTreeMap::new();
    for (obligation, medication) in rows {
        groups
            .entry(medication.id)
            .or_insert_with(|| (medication, Vec::new()))
            .1
            .push(obligation);
    }

    let mut report = EvaluationReport {
        outcome: RunOutcome::Completed,
        medications_checked: groups.len(),
        notified: Vec::new(),
        failures: Vec::new(),
    };

    for (med, obligations) in groups.into_values() {
        if obligations.iter().any(|o| o.taken) {
            tracing::debug!(medication = %med.name, "Dose taken within window, no alert");
            continue;
        }

        // conservative: one date whose grace window has not elapsed blocks
        // the whole medication for this run
        let grace = Duration::minutes(GRACE_MINUTES);
        let pending = obligations
            .iter()
            .find(|o| now < o.date.and_time(med.alarm_time) + grace);
        if let Some(o) = pending {
            tracing::debug!(medication = %med.name, date = %o.date, "Grace period not elapsed, no alert");
            continue;
        }

        let alert = MissedDoseAlert {
            guardian_email: guardian.email.clone(),
            owner_name: guardian.owner_name.clone(),
            medication_name: med.name.clone(),
            alarm_time: med.alarm_time,
        };

        match notifier.send(&alert) {
            Ok(()) => {
                tracing::info!(medication = %med.name, "Guardian notified of missed doses");
                report.notified.push(med.name);
            }
            Err(e) => {
                tracing::error!(medication = %med.name, error = %e, "Guardian notification failed");
                report.failures.push(DeliveryFailure {
                    medication_id: med.id,
                    medication_name: med.name,
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        checked = report.medications_checked,
        notified = report.notified.len(),
        failed = report.failures.len(),
        "Missed-dose evaluation finished"
    );
    Ok(report)
}
