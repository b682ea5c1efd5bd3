//! Parameterized statement execution.
//!
//! A [`Command`] holds a SQL template whose `{{table}}`/`[[column]]` macros
//! were resolved when the SQL was assigned, plus named parameters. Each
//! `execute` replaces the previously materialized result.

use crate::db::connection::Connection;
use crate::db::driver::{BoundParams, ResultSet};
use crate::error::{DbalError, DbalResult};
use crate::models::{BindParam, DbValue, Row, Value};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Instant;
use tracing::debug;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\w+").expect("valid placeholder regex"));

pub struct Command<'c> {
    conn: &'c mut Connection,
    sql: Option<String>,
    params: BTreeMap<String, Value>,
    last_result: Option<ResultSet>,
}

impl<'c> Command<'c> {
    pub(crate) fn new(conn: &'c mut Connection) -> Self {
        Self {
            conn,
            sql: None,
            params: BTreeMap::new(),
            last_result: None,
        }
    }

    /// Set the SQL template, rewriting table and column macros.
    pub fn set_sql(&mut self, sql: &str) -> &mut Self {
        self.sql = Some(self.conn.quote_sql(sql));
        self.last_result = None;
        self
    }

    /// Set the SQL verbatim, without macro resolution.
    pub fn set_raw_sql(&mut self, sql: impl Into<String>) -> &mut Self {
        self.sql = Some(sql.into());
        self.last_result = None;
        self
    }

    /// The resolved SQL, with placeholders left in place.
    pub fn sql(&self) -> &str {
        self.sql.as_deref().unwrap_or_default()
    }

    /// The SQL with every bound parameter substituted as a literal.
    ///
    /// For logging and diagnostics only; never execute the result.
    pub fn raw_sql(&self) -> String {
        let sql = self.sql();
        if self.params.is_empty() {
            return sql.to_string();
        }

        let literals: BTreeMap<String, String> = self
            .params
            .iter()
            .map(|(name, value)| {
                let name = if name.starts_with(':') {
                    name.clone()
                } else {
                    format!(":{}", name)
                };
                (name, value.as_sql_literal())
            })
            .collect();

        PLACEHOLDER_RE
            .replace_all(sql, |caps: &Captures<'_>| {
                let token = &caps[0];
                literals
                    .get(token)
                    .cloned()
                    .unwrap_or_else(|| token.to_string())
            })
            .into_owned()
    }

    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    /// Bind a value to a named placeholder, replacing any earlier binding.
    ///
    /// Accepts a plain value (type inferred), a `(value, "type hint")` pair
    /// or a prebuilt [`Value`].
    pub fn bind_value(
        &mut self,
        name: impl Into<String>,
        value: impl Into<BindParam>,
    ) -> DbalResult<&mut Self> {
        let value = value.into().into_value()?;
        self.params.insert(name.into(), value);
        Ok(self)
    }

    pub fn bind_values<I, K, V>(&mut self, values: I) -> DbalResult<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<BindParam>,
    {
        for (name, value) in values {
            self.bind_value(name, value)?;
        }
        Ok(self)
    }

    /// Execute the statement, returning the number of affected rows.
    pub async fn execute(&mut self) -> DbalResult<u64> {
        let sql = match self.sql.as_deref() {
            Some(sql) if !sql.trim().is_empty() => sql.to_string(),
            _ => return Err(DbalError::execution("SQL query is empty", None)),
        };

        let params: BoundParams = self
            .params
            .iter()
            .map(|(name, value)| (name.clone(), value.bind_value()))
            .collect();

        self.last_result = None;
        let started = Instant::now();
        let driver = self.conn.driver().await?;
        let result = match driver.execute(&sql, &params).await {
            Ok(result) => result,
            Err(e) => {
                debug!(sql = %sql, error = %e, "Command failed");
                return Err(DbalError::from_driver(e, sql));
            }
        };

        debug!(
            sql = %sql,
            rows_affected = result.rows_affected,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Executed command"
        );

        let affected = result.rows_affected;
        self.last_result = Some(result);
        Ok(affected)
    }

    pub async fn query_one(&mut self) -> DbalResult<Option<Row>> {
        self.execute().await?;
        Ok(self.last_result.as_ref().and_then(|r| r.row(0)))
    }

    pub async fn query_all(&mut self) -> DbalResult<Vec<Row>> {
        self.execute().await?;
        Ok(self
            .last_result
            .as_ref()
            .map(ResultSet::to_rows)
            .unwrap_or_default())
    }

    /// First column of every row.
    pub async fn query_column(&mut self) -> DbalResult<Vec<DbValue>> {
        self.execute().await?;
        Ok(self
            .last_result
            .as_ref()
            .map(ResultSet::first_column)
            .unwrap_or_default())
    }

    /// First column of the first row, or `None` when no row came back.
    ///
    /// Binary values are returned fully materialized.
    pub async fn query_scalar(&mut self) -> DbalResult<Option<DbValue>> {
        self.execute().await?;
        Ok(self
            .last_result
            .as_ref()
            .and_then(|r| r.rows.first())
            .and_then(|row| row.first().cloned()))
    }

    /// Auto-increment id generated by the last execution, if any.
    pub fn last_insert_id(&self) -> Option<u64> {
        self.last_result.as_ref().and_then(|r| r.last_insert_id)
    }
}

impl std::fmt::Debug for Command<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("sql", &self.sql)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
