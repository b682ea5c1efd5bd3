//! Connection-related data models.

use crate::error::DbalError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Case applied by the driver to result-column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnCase {
    /// Names as reported by the server
    #[default]
    Natural,
    Lower,
    Upper,
}

impl FromStr for ColumnCase {
    type Err = DbalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "natural" => Ok(Self::Natural),
            "lower" => Ok(Self::Lower),
            "upper" => Ok(Self::Upper),
            other => Err(DbalError::configuration(format!(
                "Invalid column_case '{}': expected natural, lower or upper",
                other
            ))),
        }
    }
}

impl ColumnCase {
    /// Apply this case to a column name.
    pub fn apply(&self, name: &str) -> String {
        match self {
            Self::Natural => name.to_string(),
            Self::Lower => name.to_lowercase(),
            Self::Upper => name.to_uppercase(),
        }
    }
}

/// Information about an open connection.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub driver_name: String,
    /// Credentials masked
    pub dsn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub server_version: String,
    pub table_prefix: String,
    /// 0 when no transaction is active
    pub transaction_level: u32,
}
