//! SQLite schema and queries for the cleaned listings table.

mod db;
mod migrations;

pub use db::Database;
pub use migrations::{Migration, MIGRATIONS};
