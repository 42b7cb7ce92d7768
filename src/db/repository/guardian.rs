use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::GuardianContact;

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// The guardian configuration row, if one has been written yet.
pub fn get_guardian(conn: &Connection) -> Result<Option<GuardianContact>, DatabaseError> {
    conn.query_row(
        "SELECT name, email, phone, owner_name, owner_email, updated_at
         FROM guardian_contact WHERE id = 1",
        [],
        |row| {
            let updated_at: String = row.get(5)?;
            Ok(GuardianContact {
                name: row.get(0)?,
                email: row.get(1)?,
                phone: row.get(2)?,
                owner_name: row.get(3)?,
                owner_email: row.get(4)?,
                updated_at: NaiveDateTime::parse_from_str(&updated_at, DATETIME_FMT)
                    .unwrap_or_default(),
            })
        },
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// Create-if-absent singleton write. First configuration call creates the
/// row at id 1; every later call replaces it.
pub fn upsert_guardian(conn: &Connection, guardian: &GuardianContact) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO guardian_contact (id, name, email, phone, owner_name, owner_email, updated_at)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
             name = excluded.name,
             email = excluded.email,
             phone = excluded.phone,
             owner_name = excluded.owner_name,
             owner_email = excluded.owner_email,
             updated_at = excluded.updated_at",
        params![
            guardian.name,
            guardian.email,
            guardian.phone,
            guardian.owner_name,
            guardian.owner_email,
            guardian.updated_at.format(DATETIME_FMT).to_string(),
        ],
    )?;
    Ok(())
}
