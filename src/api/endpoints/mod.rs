pub mod device;
pub mod doses;
pub mod evaluation;
pub mod guardian;
pub mod health;
pub mod medications;
