//! Data models for the database-access core.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod schema;
pub mod value;

// Re-export commonly used types
pub use connection::{ColumnCase, ConnectionInfo};
pub use schema::{
    ColumnDefault, ColumnSchema, ColumnType, Constraint, ForeignKeyAction, ForeignKeyConstraint,
    IndexConstraint, TableSchema,
};
pub use value::{BindParam, DbValue, ParamType, Row, Value};
