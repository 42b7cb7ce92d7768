//! Repository layer — entity-scoped database operations.
//!
//! Plain functions over `&Connection`, one sub-module per entity.
//! All public functions are re-exported here.

mod dose;
mod guardian;
mod medication;

pub use dose::*;
pub use guardian::*;
pub use medication::*;
