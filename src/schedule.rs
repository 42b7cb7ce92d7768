//! Schedule Expander — materializes a medication's active date range into
//! per-day dose obligations and keeps the expansion reconciled on edits.
//!
//! Every create/update runs the reconcile inside one transaction: a failure
//! partway must never leave obligations mismatched with the medication's
//! current range.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::models::enums::{IntakeTiming, MedicationKind};
use crate::models::{DoseObligation, Medication};

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Client-supplied medication fields. `user_id` comes from the caller
/// identity, never from the payload.
#[derive(Debug, Clone, Deserialize)]
pub struct MedicationInput {
    pub name: String,
    pub kind: MedicationKind,
    pub quantity: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub intake_timing: IntakeTiming,
    pub alarm_time: NaiveTime,
}

impl MedicationInput {
    fn validate(&self) -> Result<(), ScheduleError> {
        if self.name.trim().is_empty() {
            return Err(ScheduleError::Validation("medication name must not be empty".into()));
        }
        if self.quantity < 1 {
            return Err(ScheduleError::Validation(format!(
                "quantity must be at least 1, got {}",
                self.quantity
            )));
        }
        if self.end_date < self.start_date {
            return Err(ScheduleError::Validation(format!(
                "end_date {} is before start_date {}",
                self.end_date, self.start_date
            )));
        }
        Ok(())
    }
}

/// Every date from start to end, inclusive on both ends.
pub fn expand_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut date = start;
    while date <= end {
        dates.push(date);
        match date.checked_add_days(Days::new(1)) {
            Some(next) => date = next,
            None => break,
        }
    }
    dates
}

/// Validate, insert the medication, and expand its obligations.
/// One transaction; `caller` becomes the owner.
pub fn create_medication(
    conn: &Connection,
    caller: Uuid,
    input: &MedicationInput,
    now: NaiveDateTime,
) -> Result<Medication, ScheduleError> {
    input.validate()?;

    let med = Medication {
        id: Uuid::new_v4(),
        user_id: caller,
        name: input.name.trim().to_string(),
        kind: input.kind,
        quantity: input.quantity,
        start_date: input.start_date,
        end_date: input.end_date,
        intake_timing: input.intake_timing,
        alarm_time: input.alarm_time,
        created_at: now,
        updated_at: now,
    };

    let tx = conn.unchecked_transaction().map_err(DatabaseError::Sqlite)?;
    db::insert_medication(&tx, &med)?;
    reconcile_obligations(&tx, &med)?;
    tx.commit().map_err(DatabaseError::Sqlite)?;

    tracing::info!(
        medication_id = %med.id,
        start = %med.start_date,
        end = %med.end_date,
        "Medication created and expanded"
    );
    Ok(med)
}

/// Validate, apply the edit, and reconcile the existing expansion against
/// the (possibly changed) range and quantity. One transaction.
pub fn update_medication(
    conn: &Connection,
    id: &Uuid,
    input: &MedicationInput,
    now: NaiveDateTime,
) -> Result<Medication, ScheduleError> {
    input.validate()?;

    let existing = db::get_medication(conn, id)?
        .ok_or_else(|| DatabaseError::not_found("medication", id))?;

    let med = Medication {
        name: input.name.trim().to_string(),
        kind: input.kind,
        quantity: input.quantity,
        start_date: input.start_date,
        end_date: input.end_date,
        intake_timing: input.intake_timing,
        alarm_time: input.alarm_time,
        updated_at: now,
        ..existing
    };

    let tx = conn.unchecked_transaction().map_err(DatabaseError::Sqlite)?;
    db::update_medication(&tx, &med)?;
    reconcile_obligations(&tx, &med)?;
    tx.commit().map_err(DatabaseError::Sqlite)?;

    Ok(med)
}

/// Hard delete; obligations and events cascade.
pub fn delete_medication(conn: &Connection, id: &Uuid) -> Result<(), ScheduleError> {
    db::delete_medication_cascade(conn, id)?;
    tracing::info!(medication_id = %id, "Medication deleted");
    Ok(())
}

/// Bring the obligation set in line with the medication row:
/// 1. drop obligations dated outside [start_date, end_date] — taken ones
///    included, their history goes with them;
/// 2. re-sync quantity on the survivors (taken/taken_at untouched);
/// 3. create an untaken obligation for every date still missing.
///
/// Caller supplies the transaction; this function never commits.
fn reconcile_obligations(conn: &Connection, med: &Medication) -> Result<(), DatabaseError> {
    let dropped =
        db::delete_obligations_outside_range(conn, &med.id, med.start_date, med.end_date)?;
    if dropped > 0 {
        tracing::warn!(
            medication_id = %med.id,
            dropped,
            "Range shrink discarded dose history for out-of-range dates"
        );
    }

    db::sync_obligation_quantities(conn, &med.id, med.quantity)?;

    let existing: std::collections::HashSet<NaiveDate> =
        db::get_obligations_for_medication(conn, &med.id)?
            .into_iter()
            .map(|o| o.date)
            .collect();

    for date in expand_range(med.start_date, med.end_date) {
        if existing.contains(&date) {
            continue;
        }
        db::insert_obligation(
            conn,
            &DoseObligation {
                id: Uuid::new_v4(),
                medication_id: med.id,
                date,
                quantity: med.quantity,
                taken: false,
                taken_at: None,
            },
        )?;
    }

    Ok(())
}
