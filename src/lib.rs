pub mod api;
pub mod config;
pub mod db;
pub mod evaluator;
pub mod ledger;
pub mod models;
pub mod notifier;
pub mod schedule;
