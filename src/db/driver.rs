//! Native driver handle abstraction.
//!
//! `Connector` opens a handle for a `ConnectionConfig`; `Driver` is the open
//! handle. The core never talks to a database except through these two
//! traits, so the bundled sqlx adapter and the scripted test driver are
//! interchangeable.

use crate::config::ConnectionConfig;
use crate::error::DriverError;
use crate::models::{ColumnCase, DbValue, Row};
use async_trait::async_trait;
use std::collections::BTreeMap;

pub type DriverResult<T> = Result<T, DriverError>;

/// Named parameters handed to the driver, keyed as bound (with or without
/// the leading `:`).
pub type BoundParams = BTreeMap<String, DbValue>;

/// Look up the value bound for a `:name` placeholder.
pub fn lookup_param<'a>(params: &'a BoundParams, placeholder: &str) -> Option<&'a DbValue> {
    let bare = placeholder.trim_start_matches(':');
    params
        .get(placeholder)
        .or_else(|| params.get(bare))
        .or_else(|| params.get(&format!(":{}", bare)))
}

/// Rewrite `:name` placeholders to positional `?` markers.
///
/// Returns the rewritten SQL and the values in order of appearance. Quoted
/// strings, quoted identifiers and comments are copied verbatim. A
/// placeholder with no bound value is an error naming it.
pub fn bind_named(sql: &str, params: &BoundParams) -> DriverResult<(String, Vec<DbValue>)> {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut values = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' | '`' => {
                out.push(c);
                i += 1;
                while i < chars.len() {
                    let q = chars[i];
                    out.push(q);
                    i += 1;
                    if q == '\\' && c != '`' && i < chars.len() {
                        out.push(chars[i]);
                        i += 1;
                    } else if q == c {
                        // Doubled quote is an escaped quote
                        if i < chars.len() && chars[i] == c {
                            out.push(c);
                            i += 1;
                        } else {
                            break;
                        }
                    }
                }
            }
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    out.push(chars[i]);
                    i += 1;
                }
            }
            '-' if chars.get(i + 1) == Some(&'-')
                && chars.get(i + 2).is_none_or(|n| n.is_whitespace()) =>
            {
                while i < chars.len() && chars[i] != '\n' {
                    out.push(chars[i]);
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                out.push_str("/*");
                i += 2;
                while i < chars.len() {
                    if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        out.push_str("*/");
                        i += 2;
                        break;
                    }
                    out.push(chars[i]);
                    i += 1;
                }
            }
            ':' if chars
                .get(i + 1)
                .is_some_and(|n| n.is_alphabetic() || *n == '_')
                && (i == 0 || (chars[i - 1] != ':' && !is_ident_char(chars[i - 1]))) =>
            {
                let start = i;
                i += 1;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();
                let value = lookup_param(params, &name).ok_or_else(|| {
                    DriverError::new(format!("Missing value for parameter {}", name))
                })?;
                values.push(value.clone());
                out.push('?');
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    Ok((out, values))
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Materialized outcome of one executed statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<DbValue>>,
    pub rows_affected: u64,
    pub last_insert_id: Option<u64>,
}

impl ResultSet {
    /// A result with rows; the affected-row count is the row count.
    pub fn with_rows(columns: Vec<String>, rows: Vec<Vec<DbValue>>) -> Self {
        Self {
            rows_affected: rows.len() as u64,
            columns,
            rows,
            last_insert_id: None,
        }
    }

    /// A result of a statement that returns no rows.
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            ..Self::default()
        }
    }

    pub fn with_last_insert_id(mut self, id: u64) -> Self {
        self.last_insert_id = Some(id);
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, index: usize) -> Option<Row> {
        self.rows
            .get(index)
            .map(|values| Row::new(self.columns.clone(), values.clone()))
    }

    pub fn to_rows(&self) -> Vec<Row> {
        self.rows
            .iter()
            .map(|values| Row::new(self.columns.clone(), values.clone()))
            .collect()
    }

    /// First column of every row.
    pub fn first_column(&self) -> Vec<DbValue> {
        self.rows
            .iter()
            .filter_map(|values| values.first().cloned())
            .collect()
    }
}

/// An open native connection handle.
///
/// Calls are issued one at a time; the handle does not support concurrent
/// statements.
#[async_trait]
pub trait Driver: Send {
    /// Prepare and execute a statement with named parameters.
    async fn execute(&mut self, sql: &str, params: &BoundParams) -> DriverResult<ResultSet>;

    /// Execute a one-shot statement through the text protocol.
    async fn exec_raw(&mut self, sql: &str) -> DriverResult<u64>;

    async fn begin(&mut self) -> DriverResult<()>;

    async fn commit(&mut self) -> DriverResult<()>;

    async fn rollback(&mut self) -> DriverResult<()>;

    async fn server_version(&mut self) -> DriverResult<String>;

    fn supports_savepoints(&self) -> bool;

    /// Case applied to result-column names.
    fn column_case(&self) -> ColumnCase;

    async fn close(self: Box<Self>) -> DriverResult<()>;
}

/// Opens driver handles.
#[async_trait]
pub trait Connector: Send + Sync + std::fmt::Debug {
    /// Implementation identity, used in schema cache keys.
    fn driver_name(&self) -> &'static str;

    async fn connect(&self, config: &ConnectionConfig) -> DriverResult<Box<dyn Driver>>;
}
