use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::Medication;

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M:%S";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

pub fn insert_medication(conn: &Connection, med: &Medication) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medications (id, user_id, name, kind, quantity, start_date, end_date,
         intake_timing, alarm_time, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            med.id.to_string(),
            med.user_id.to_string(),
            med.name,
            med.kind.as_str(),
            med.quantity,
            med.start_date.to_string(),
            med.end_date.to_string(),
            med.intake_timing.as_str(),
            med.alarm_time.format(TIME_FMT).to_string(),
            med.created_at.format(DATETIME_FMT).to_string(),
            med.updated_at.format(DATETIME_FMT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn update_medication(conn: &Connection, med: &Medication) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE medications SET name = ?2, kind = ?3, quantity = ?4, start_date = ?5,
         end_date = ?6, intake_timing = ?7, alarm_time = ?8, updated_at = ?9
         WHERE id = ?1",
        params![
            med.id.to_string(),
            med.name,
            med.kind.as_str(),
            med.quantity,
            med.start_date.to_string(),
            med.end_date.to_string(),
            med.intake_timing.as_str(),
            med.alarm_time.format(TIME_FMT).to_string(),
            med.updated_at.format(DATETIME_FMT).to_string(),
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("medication", med.id));
    }
    Ok(())
}

pub fn get_medication(conn: &Connection, id: &Uuid) -> Result<Option<Medication>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, kind, quantity, start_date, end_date,
         intake_timing, alarm_time, created_at, updated_at
         FROM medications WHERE id = ?1",
    )?;

    let mut rows = stmt.query_map(params![id.to_string()], |row| Ok(medication_row_from_rusqlite(row)))?;
    match rows.next() {
        Some(row) => Ok(Some(medication_from_row(row??)?)),
        None => Ok(None),
    }
}

/// All medications, newest first.
pub fn get_all_medications(conn: &Connection) -> Result<Vec<Medication>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, kind, quantity, start_date, end_date,
         intake_timing, alarm_time, created_at, updated_at
         FROM medications ORDER BY created_at DESC",
    )?;

    let rows = stmt.query_map([], |row| Ok(medication_row_from_rusqlite(row)))?;

    let mut meds = Vec::new();
    for row in rows {
        meds.push(medication_from_row(row??)?);
    }
    Ok(meds)
}

/// Hard delete. Obligations and events go with it (FK cascade).
pub fn delete_medication_cascade(conn: &Connection, med_id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM medications WHERE id = ?1",
        params![med_id.to_string()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("medication", med_id));
    }
    Ok(())
}

// Internal row type for Medication mapping
struct MedicationRow {
    id: String,
    user_id: String,
    name: String,
    kind: String,
    quantity: i64,
    start_date: String,
    end_date: String,
    intake_timing: String,
    alarm_time: String,
    created_at: String,
    updated_at: String,
}

fn medication_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<MedicationRow, rusqlite::Error> {
    Ok(MedicationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        kind: row.get(3)?,
        quantity: row.get(4)?,
        start_date: row.get(5)?,
        end_date: row.get(6)?,
        intake_timing: row.get(7)?,
        alarm_time: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn medication_from_row(row: MedicationRow) -> Result<Medication, DatabaseError> {
    Ok(Medication {
        id: Uuid::parse_str(&row.id).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        user_id: Uuid::parse_str(&row.user_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        name: row.name,
        kind: MedicationKind::from_str(&row.kind)?,
        quantity: row.quantity,
        start_date: NaiveDate::parse_from_str(&row.start_date, DATE_FMT)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        end_date: NaiveDate::parse_from_str(&row.end_date, DATE_FMT)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        intake_timing: IntakeTiming::from_str(&row.intake_timing)?,
        alarm_time: NaiveTime::parse_from_str(&row.alarm_time, TIME_FMT)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        created_at: NaiveDateTime::parse_from_str(&row.created_at, DATETIME_FMT).unwrap_or_default(),
        updated_at: NaiveDateTime::parse_from_str(&row.updated_at, DATETIME_FMT).unwrap_or_default(),
    })
}
