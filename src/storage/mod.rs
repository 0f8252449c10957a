//! Data source adapters.
//!
//! The resolution pipeline never talks to a database directly. It consumes
//! the [`traits::SettingStore`] contract:
//!
//! - [`memory::InMemoryStore`]: process-local rows, used by tests and embedders
//! - [`sql::SqlStore`]: SQLite/MySQL table through the sqlx `Any` driver

pub mod memory;
pub mod sql;
pub mod traits;
