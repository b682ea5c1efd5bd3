//! Database-access core.
//!
//! This module provides:
//! - The connection facade owning one driver handle
//! - Command execution with named parameters
//! - Nested transactions through savepoints
//! - Identifier quoting and SQL macro resolution
//! - Cached schema introspection and type mapping
//! - The sqlx-backed MySQL driver

pub mod cache;
pub mod command;
pub mod connection;
pub mod driver;
pub mod mysql;
pub mod quoter;
pub mod schema;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod transaction;
pub mod types;

pub use cache::{MemorySchemaCache, SchemaCache};
pub use command::Command;
pub use connection::Connection;
pub use driver::{BoundParams, Connector, Driver, ResultSet};
pub use mysql::{MySqlConnector, MySqlDriver};
pub use quoter::Quoter;
pub use schema::{MetadataKind, SCHEMA_CACHE_VERSION, Schema, TableMetadata};
pub use transaction::{IsolationLevel, Transaction};
