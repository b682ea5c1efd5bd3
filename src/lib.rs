//! MySQL database-access core.
//!
//! Connection lifecycle, nested transactions emulated with savepoints,
//! parameterized commands with typed value binding, and cached schema
//! introspection on top of a single sqlx connection.

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use config::ConnectionConfig;
pub use db::{Command, Connection, IsolationLevel, Schema, Transaction};
pub use error::{DbalError, DbalResult, DriverError};
