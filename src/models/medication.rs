use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{IntakeTiming, MedicationKind};

/// A prescribed (or self-administered) medication with its active date range
/// and daily alarm. The owner is the user the doses belong to; the guardian
/// contact is configured separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub kind: MedicationKind,
    pub quantity: i64,
    /// Active range, inclusive on both ends. `start_date <= end_date`.
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub intake_timing: IntakeTiming,
    pub alarm_time: NaiveTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
