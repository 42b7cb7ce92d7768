//! Dose Ledger — confirmation operations against the per-day obligations.
//!
//! Two entry points: confirm a specific obligation by id, or confirm
//! "today's" obligation for a medication (the path both the manual button
//! and the sensor device use). The medication-level path also appends an
//! immutable `DoseEvent` audit record tagged with its source; the audit
//! trail is write-only here and never read back by the evaluator.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::models::enums::DoseSource;
use crate::models::{DoseEvent, DoseObligation};

/// Mark an obligation taken. Idempotent: re-confirming an already-taken
/// obligation is a no-op and keeps the original `taken_at`.
pub fn confirm_obligation(
    conn: &Connection,
    obligation_id: &Uuid,
    now: NaiveDateTime,
) -> Result<DoseObligation, DatabaseError> {
    if db::get_obligation(conn, obligation_id)?.is_none() {
        return Err(DatabaseError::not_found("dose_obligation", obligation_id));
    }

    let transitioned = db::mark_obligation_taken(conn, obligation_id, now)?;
    if !transitioned {
        tracing::debug!(obligation_id = %obligation_id, "Re-confirmation ignored, already taken");
    }

    db::get_obligation(conn, obligation_id)?
        .ok_or_else(|| DatabaseError::not_found("dose_obligation", obligation_id))
}

/// Confirm today's dose for a medication and append the audit event.
///
/// Fails with NotFound when the medication id does not resolve, or when no
/// obligation exists for `today` (medication outside its active range).
/// The obligation update and the event append commit together.
pub fn confirm_by_medication(
    conn: &Connection,
    medication_id: &Uuid,
    source: DoseSource,
    today: NaiveDate,
    now: NaiveDateTime,
) -> Result<DoseObligation, DatabaseError> {
    if db::get_medication(conn, medication_id)?.is_none() {
        return Err(DatabaseError::not_found("medication", medication_id));
    }

    let obligation = db::get_obligation_for_date(conn, medication_id, today)?
        .ok_or_else(|| DatabaseError::NotFound {
            entity_type: "dose_obligation".into(),
            id: format!("{medication_id} on {today}"),
        })?;

    let tx = conn.unchecked_transaction()?;
    db::mark_obligation_taken(&tx, &obligation.id, now)?;
    db::insert_dose_event(
        &tx,
        &DoseEvent {
            id: Uuid::new_v4(),
            medication_id: *medication_id,
            taken_at: now,
            source,
        },
    )?;
    tx.commit()?;

    tracing::info!(
        medication_id = %medication_id,
        date = %today,
        source = source.as_str(),
        "Dose confirmed"
    );

    db::get_obligation(conn, &obligation.id)?
        .ok_or_else(|| DatabaseError::not_found("dose_obligation", obligation.id))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDateTime, NaiveTime};
    use rusqlite::Connection;

    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::{IntakeTiming, MedicationKind};
    use crate::schedule::{create_medication, MedicationInput};

    fn test_db() -> Connection {
        open_memory_database().unwrap()
    }

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn seed_medication(conn: &Connection) -> Uuid {
        create_medication(
            conn,
            Uuid::new_v4(),
            &MedicationInput {
                name: "Metformin".into(),
                kind: MedicationKind::Prescription,
                quantity: 2,
                start_date: date("2025-11-01"),
                end_date: date("2025-11-03"),
                intake_timing: IntakeTiming::AfterMeal,
                alarm_time: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
            },
            ts("2025-10-31 09:00:00"),
        )
        .unwrap()
        .id
    }

    #[test]
    fn confirm_obligation_sets_taken_once() {
        let conn = test_db();
        let med_id = seed_medication(&conn);
        let ob = db::get_obligation_for_date(&conn, &med_id, date("2025-11-01"))
            .unwrap()
            .unwrap();

        let confirmed = confirm_obligation(&conn, &ob.id, ts("2025-11-01 08:40:00")).unwrap();
        assert!(confirmed.taken);
        assert_eq!(confirmed.taken_at, Some(ts("2025-11-01 08:40:00")));

        // second call is a no-op, taken_at unchanged
        let again = confirm_obligation(&conn, &ob.id, ts("2025-11-01 12:00:00")).unwrap();
        assert_eq!(again.taken_at, Some(ts("2025-11-01 08:40:00")));
    }

    #[test]
    fn confirm_obligation_unknown_id_is_not_found() {
        let conn = test_db();
        let err = confirm_obligation(&conn, &Uuid::new_v4(), ts("2025-11-01 08:40:00")).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn device_confirm_marks_today_and_logs_event() {
        let conn = test_db();
        let med_id = seed_medication(&conn);

        let confirmed = confirm_by_medication(
            &conn,
            &med_id,
            DoseSource::Device,
            date("2025-11-02"),
            ts("2025-11-02 08:33:00"),
        )
        .unwrap();
        assert!(confirmed.taken);
        assert_eq!(confirmed.date, date("2025-11-02"));

        let events = db::get_dose_events(&conn, &med_id).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, DoseSource::Device);
    }

    #[test]
    fn repeated_device_confirm_keeps_taken_at_but_still_logs() {
        let conn = test_db();
        let med_id = seed_medication(&conn);

        confirm_by_medication(
            &conn,
            &med_id,
            DoseSource::Device,
            date("2025-11-02"),
            ts("2025-11-02 08:33:00"),
        )
        .unwrap();
        let again = confirm_by_medication(
            &conn,
            &med_id,
            DoseSource::Manual,
            date("2025-11-02"),
            ts("2025-11-02 12:00:00"),
        )
        .unwrap();

        // obligation untouched by the second confirmation
        assert_eq!(again.taken_at, Some(ts("2025-11-02 08:33:00")));
        // but the audit trail records every confirmation action
        assert_eq!(db::get_dose_events(&conn, &med_id).unwrap().len(), 2);
    }

    #[test]
    fn confirm_outside_active_range_is_not_found() {
        let conn = test_db();
        let med_id = seed_medication(&conn);

        let err = confirm_by_medication(
            &conn,
            &med_id,
            DoseSource::Manual,
            date("2025-11-07"),
            ts("2025-11-07 09:00:00"),
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
        assert!(db::get_dose_events(&conn, &med_id).unwrap().is_empty());
    }

    #[test]
    fn confirm_unknown_medication_is_not_found() {
        let conn = test_db();
        let err = confirm_by_medication(
            &conn,
            &Uuid::new_v4(),
            DoseSource::Device,
            date("2025-11-02"),
            ts("2025-11-02 08:33:00"),
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
