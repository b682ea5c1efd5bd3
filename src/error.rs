//! Error types for the database-access core.
//!
//! This module defines all error types using `thiserror`. Driver-level failures
//! keep the SQLSTATE reported by the server so that callers (schema
//! introspection in particular) can tell a missing table from a real failure.

use thiserror::Error;

/// SQLSTATE reported by MySQL when a referenced table does not exist.
pub const SQLSTATE_TABLE_NOT_FOUND: &str = "42S02";

/// Failure reported by a native driver handle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DriverError {
    pub message: String,
    /// e.g., "42S02" for unknown table
    pub code: Option<String>,
}

impl DriverError {
    /// Create a driver error without a native code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Create a driver error carrying the server's SQLSTATE.
    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

/// Convert sqlx errors to DriverError.
impl From<sqlx::Error> for DriverError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => DriverError {
                message: db_err.message().to_string(),
                code: db_err.code().map(|c| c.to_string()),
            },
            sqlx::Error::Configuration(msg) => {
                DriverError::new(format!("Invalid connection options: {}", msg))
            }
            sqlx::Error::Io(io_err) => DriverError::new(format!("I/O error: {}", io_err)),
            sqlx::Error::Tls(tls_err) => DriverError::new(format!("TLS error: {}", tls_err)),
            sqlx::Error::Protocol(msg) => DriverError::new(format!("Protocol error: {}", msg)),
            sqlx::Error::RowNotFound => DriverError::new("No rows returned"),
            sqlx::Error::ColumnDecode { index, source } => {
                DriverError::new(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DriverError::new(format!("Decode error: {}", source)),
            _ => DriverError::new(format!("Unknown driver error: {}", err)),
        }
    }
}

#[derive(Error, Debug)]
pub enum DbalError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Connection failed: {message}")]
    Connection {
        message: String,
        code: Option<String>,
    },

    #[error("Execution failed: {message}")]
    Execution {
        message: String,
        /// SQLSTATE from the server, when the failure came from the driver
        code: Option<String>,
        /// Never logged with bound values substituted
        sql: Option<String>,
    },

    #[error("Not supported: {message}")]
    NotSupported { message: String },

    #[error("Inactive transaction: {message}")]
    InactiveTransaction { message: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl DbalError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Wrap a driver failure raised while opening the handle.
    pub fn connection(err: DriverError) -> Self {
        Self::Connection {
            message: err.message,
            code: err.code,
        }
    }

    /// Create an execution error that did not come from the driver.
    pub fn execution(message: impl Into<String>, sql: Option<String>) -> Self {
        Self::Execution {
            message: message.into(),
            code: None,
            sql,
        }
    }

    /// Wrap a driver failure raised while running `sql`.
    pub fn from_driver(err: DriverError, sql: impl Into<String>) -> Self {
        Self::Execution {
            message: err.message,
            code: err.code,
            sql: Some(sql.into()),
        }
    }

    /// Create a not-supported error.
    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported {
            message: message.into(),
        }
    }

    /// Create an inactive-transaction error.
    pub fn inactive_transaction(message: impl Into<String>) -> Self {
        Self::InactiveTransaction {
            message: message.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Native error code (SQLSTATE), if the driver reported one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Connection { code, .. } | Self::Execution { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Whether the driver reported that the referenced table does not exist.
    pub fn is_table_missing(&self) -> bool {
        self.code() == Some(SQLSTATE_TABLE_NOT_FOUND)
    }
}

/// Result type alias for database operations.
pub type DbalResult<T> = Result<T, DbalError>;
