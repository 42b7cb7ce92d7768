//! Domain entities persisted by the db layer.

pub mod dose;
pub mod enums;
pub mod guardian;
pub mod medication;

pub use dose::*;
pub use guardian::*;
pub use medication::*;
