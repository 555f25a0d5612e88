//! Database module: models, schema and the SQLite-backed roster storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows and conversions
//! - `schema.rs`: SQL DDL for initializing the database
//! - `password.rs`: salted digests for the `users.password` column
//! - `sqlite.rs`: the data access functions the dashboard consumes

pub mod models;
pub mod password;
pub mod schema;
pub mod sqlite;

pub use models::{AssignmentRow, DbUser, Role, Section, UserSummary};
pub use schema::SQLITE_INIT;
pub use sqlite::{RosterStorage, SqlitePool};
