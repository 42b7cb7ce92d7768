use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::DoseSource;

/// "This medication is due on this calendar date." One row per
/// (medication, date) pair; the schema enforces the uniqueness.
///
/// `quantity` starts as a copy of the medication's quantity and is re-synced
/// on every medication save, but can be edited independently in between.
/// `taken_at` is set once, on the false→true transition, and never reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoseObligation {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub date: NaiveDate,
    pub quantity: i64,
    pub taken: bool,
    pub taken_at: Option<NaiveDateTime>,
}

/// Append-only audit record of a single confirmation action.
///
/// Written on every medication-level confirmation, never mutated or deleted.
/// The missed-dose evaluator reads `DoseObligation.taken`, not this log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoseEvent {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub taken_at: NaiveDateTime,
    pub source: DoseSource,
}
