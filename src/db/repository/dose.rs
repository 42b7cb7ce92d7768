use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::{DoseEvent, DoseObligation, Medication};

const DATE_FMT: &str = "%Y-%m-%d";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

const OBLIGATION_COLS: &str = "id, medication_id, date, quantity, taken, taken_at";

pub fn insert_obligation(conn: &Connection, ob: &DoseObligation) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO dose_obligations (id, medication_id, date, quantity, taken, taken_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            ob.id.to_string(),
            ob.medication_id.to_string(),
            ob.date.to_string(),
            ob.quantity,
            ob.taken as i32,
            ob.taken_at.map(|t| t.format(DATETIME_FMT).to_string()),
        ],
    )?;
    Ok(())
}

pub fn get_obligation(conn: &Connection, id: &Uuid) -> Result<Option<DoseObligation>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {OBLIGATION_COLS} FROM dose_obligations WHERE id = ?1"
    ))?;
    let mut rows = stmt.query_map(params![id.to_string()], obligation_from_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// The obligation for a given medication on a given date, if the date lies
/// inside the medication's expanded range.
pub fn get_obligation_for_date(
    conn: &Connection,
    med_id: &Uuid,
    date: NaiveDate,
) -> Result<Option<DoseObligation>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {OBLIGATION_COLS} FROM dose_obligations WHERE medication_id = ?1 AND date = ?2"
    ))?;
    let mut rows = stmt.query_map(params![med_id.to_string(), date.to_string()], obligation_from_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn get_obligations_for_medication(
    conn: &Connection,
    med_id: &Uuid,
) -> Result<Vec<DoseObligation>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {OBLIGATION_COLS} FROM dose_obligations WHERE medication_id = ?1 ORDER BY date"
    ))?;
    let rows = stmt.query_map(params![med_id.to_string()], obligation_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Obligations for one calendar date across all medications.
pub fn get_obligations_on(conn: &Connection, date: NaiveDate) -> Result<Vec<DoseObligation>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {OBLIGATION_COLS} FROM dose_obligations WHERE date = ?1 ORDER BY medication_id"
    ))?;
    let rows = stmt.query_map(params![date.to_string()], obligation_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn get_all_obligations(conn: &Connection) -> Result<Vec<DoseObligation>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {OBLIGATION_COLS} FROM dose_obligations ORDER BY date, medication_id"
    ))?;
    let rows = stmt.query_map([], obligation_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Obligations in [start, end] inclusive, joined to their medication.
/// Ordered by medication so the evaluator can group in one pass.
pub fn get_obligations_in_window(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<(DoseObligation, Medication)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT o.id, o.medication_id, o.date, o.quantity, o.taken, o.taken_at,
                m.id, m.user_id, m.name, m.kind, m.quantity, m.start_date, m.end_date,
                m.intake_timing, m.alarm_time, m.created_at, m.updated_at
         FROM dose_obligations o
         JOIN medications m ON m.id = o.medication_id
         WHERE o.date >= ?1 AND o.date <= ?2
         ORDER BY m.id, o.date",
    )?;

    let rows = stmt.query_map(params![start.to_string(), end.to_string()], |row| {
        let ob = obligation_from_row_at(row, 0)?;
        let med = (
            row.get::<_, String>(6)?,
            row.get::<_, String>(7)?,
            row.get::<_, String>(8)?,
            row.get::<_, String>(9)?,
            row.get::<_, i64>(10)?,
            row.get::<_, String>(11)?,
            row.get::<_, String>(12)?,
            row.get::<_, String>(13)?,
            row.get::<_, String>(14)?,
            row.get::<_, String>(15)?,
            row.get::<_, String>(16)?,
        );
        Ok((ob, med))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (ob, (id, user_id, name, kind, quantity, start_date, end_date, timing, alarm, created, updated)) = row?;
        out.push((
            ob,
            Medication {
                id: parse_uuid(&id)?,
                user_id: parse_uuid(&user_id)?,
                name,
                kind: MedicationKind::from_str(&kind)?,
                quantity,
                start_date: parse_date(&start_date)?,
                end_date: parse_date(&end_date)?,
                intake_timing: IntakeTiming::from_str(&timing)?,
                alarm_time: chrono::NaiveTime::parse_from_str(&alarm, "%H:%M:%S")
                    .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
                created_at: NaiveDateTime::parse_from_str(&created, DATETIME_FMT).unwrap_or_default(),
                updated_at: NaiveDateTime::parse_from_str(&updated, DATETIME_FMT).unwrap_or_default(),
            },
        ));
    }
    Ok(out)
}

/// Delete every obligation of this medication dated outside [start, end].
/// Taken rows go too — shrinking the range discards their history.
/// Returns the number of rows removed.
pub fn delete_obligations_outside_range(
    conn: &Connection,
    med_id: &Uuid,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM dose_obligations WHERE medication_id = ?1 AND (date < ?2 OR date > ?3)",
        params![med_id.to_string(), start.to_string(), end.to_string()],
    )?;
    Ok(deleted)
}

/// Re-sync quantity on every obligation of the medication. Leaves
/// taken/taken_at untouched.
pub fn sync_obligation_quantities(
    conn: &Connection,
    med_id: &Uuid,
    quantity: i64,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE dose_obligations SET quantity = ?2 WHERE medication_id = ?1",
        params![med_id.to_string(), quantity],
    )?;
    Ok(())
}

pub fn set_obligation_quantity(
    conn: &Connection,
    id: &Uuid,
    quantity: i64,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE dose_obligations SET quantity = ?2 WHERE id = ?1",
        params![id.to_string(), quantity],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("dose_obligation", id));
    }
    Ok(())
}

/// Flip taken to true and stamp taken_at, but only on the first call:
/// the `AND taken = 0` guard makes re-confirmation a no-op at the SQL
/// level, so `taken_at` keeps its original value under races too.
/// Returns whether this call performed the transition.
pub fn mark_obligation_taken(
    conn: &Connection,
    id: &Uuid,
    taken_at: NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE dose_obligations SET taken = 1, taken_at = ?2 WHERE id = ?1 AND taken = 0",
        params![id.to_string(), taken_at.format(DATETIME_FMT).to_string()],
    )?;
    Ok(changed > 0)
}

pub fn insert_dose_event(conn: &Connection, event: &DoseEvent) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO dose_events (id, medication_id, taken_at, source) VALUES (?1, ?2, ?3, ?4)",
        params![
            event.id.to_string(),
            event.medication_id.to_string(),
            event.taken_at.format(DATETIME_FMT).to_string(),
            event.source.as_str(),
        ],
    )?;
    Ok(())
}

/// Audit trail for one medication, newest first. Read-only surface; the
/// evaluator never consults this.
pub fn get_dose_events(conn: &Connection, med_id: &Uuid) -> Result<Vec<DoseEvent>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, medication_id, taken_at, source FROM dose_events
         WHERE medication_id = ?1 ORDER BY taken_at DESC",
    )?;

    let rows = stmt.query_map(params![med_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut events = Vec::new();
    for row in rows {
        let (id, med_id, taken_at, source) = row?;
        events.push(DoseEvent {
            id: parse_uuid(&id)?,
            medication_id: parse_uuid(&med_id)?,
            taken_at: NaiveDateTime::parse_from_str(&taken_at, DATETIME_FMT).unwrap_or_default(),
            source: DoseSource::from_str(&source)?,
        });
    }
    Ok(events)
}

fn obligation_from_row(row: &rusqlite::Row<'_>) -> Result<DoseObligation, rusqlite::Error> {
    obligation_from_row_at(row, 0)
}

fn obligation_from_row_at(row: &rusqlite::Row<'_>, base: usize) -> Result<DoseObligation, rusqlite::Error> {
    let id: String = row.get(base)?;
    let med_id: String = row.get(base + 1)?;
    let date: String = row.get(base + 2)?;
    let taken_at: Option<String> = row.get(base + 5)?;
    Ok(DoseObligation {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        medication_id: Uuid::parse_str(&med_id).unwrap_or_default(),
        date: NaiveDate::parse_from_str(&date, DATE_FMT).unwrap_or_default(),
        quantity: row.get(base + 3)?,
        taken: row.get::<_, i32>(base + 4)? != 0,
        taken_at: taken_at.and_then(|t| NaiveDateTime::parse_from_str(&t, DATETIME_FMT).ok()),
    })
}

fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

fn parse_date(s: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(s, DATE_FMT).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}
