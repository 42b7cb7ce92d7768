use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Single-tenant guardian configuration. One row per deployment, created
/// lazily on the first configuration write (row id fixed at 1 in the schema).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardianContact {
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Display name of the user whose doses are watched. Used in the
    /// notification body ("<owner_name> has not taken ...").
    pub owner_name: String,
    pub owner_email: String,
    pub updated_at: NaiveDateTime,
}
