//! Actioner storage crate - SQLite persistence for the action audit trail.
//!
//! Provides a WAL-mode SQLite database with migrations and the append-only
//! action event repository.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::{ActionEventRepository, EventStore};
