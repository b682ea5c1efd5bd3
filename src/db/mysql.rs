//! MySQL driver handle on top of a single sqlx connection.

use crate::config::ConnectionConfig;
use crate::db::driver::{BoundParams, Connector, Driver, DriverResult, ResultSet, bind_named};
use crate::db::types;
use crate::error::DriverError;
use crate::models::{ColumnCase, DbValue};
use async_trait::async_trait;
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, ConnectOptions, Connection, Executor, Row};
use std::str::FromStr;
use tracing::debug;

/// Statements whose leading keyword produces a result set.
const ROW_RETURNING_KEYWORDS: &[&str] = &[
    "SELECT", "SHOW", "DESCRIBE", "DESC", "EXPLAIN", "WITH", "VALUES", "TABLE",
];

/// Whether a statement returns rows, judged by its first keyword.
pub fn returns_rows(sql: &str) -> bool {
    let keyword: String = strip_leading_comments(sql)
        .trim_start_matches(|c: char| c == '(' || c.is_whitespace())
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    let keyword = keyword.to_ascii_uppercase();
    ROW_RETURNING_KEYWORDS.contains(&keyword.as_str())
}

fn strip_leading_comments(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix("/*") {
            rest = after.find("*/").map_or("", |end| &after[end + 2..]).trim_start();
        } else if rest.starts_with("--") || rest.starts_with('#') {
            rest = rest.find('\n').map_or("", |end| &rest[end + 1..]).trim_start();
        } else {
            return rest;
        }
    }
}

/// Opens [`MySqlDriver`] handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlConnector;

#[async_trait]
impl Connector for MySqlConnector {
    fn driver_name(&self) -> &'static str {
        "mysql"
    }

    async fn connect(&self, config: &ConnectionConfig) -> DriverResult<Box<dyn Driver>> {
        let mut options = MySqlConnectOptions::from_str(&config.dsn).map_err(|e| {
            DriverError::new(format!("Invalid MySQL connection string: {}", e))
        })?;
        if let Some(username) = &config.username {
            options = options.username(username);
        }
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        let conn = options.connect().await?;
        Ok(Box::new(MySqlDriver {
            conn,
            column_case: config.column_case,
            server_version: None,
        }))
    }
}

pub struct MySqlDriver {
    conn: MySqlConnection,
    column_case: ColumnCase,
    server_version: Option<String>,
}

impl MySqlDriver {
    fn column_names(&self, row: &MySqlRow) -> Vec<String> {
        row.columns()
            .iter()
            .map(|c| self.column_case.apply(c.name()))
            .collect()
    }

    fn collect(&self, rows: Vec<MySqlRow>) -> ResultSet {
        let columns = rows
            .first()
            .map(|row| self.column_names(row))
            .unwrap_or_default();
        let rows = rows.iter().map(types::mysql::decode_row).collect();
        ResultSet::with_rows(columns, rows)
    }
}

fn bind_param<'q>(
    query: sqlx::query::Query<'q, sqlx::MySql, MySqlArguments>,
    param: &'q DbValue,
) -> sqlx::query::Query<'q, sqlx::MySql, MySqlArguments> {
    match param {
        DbValue::Null => query.bind(None::<String>),
        DbValue::Bool(v) => query.bind(*v),
        DbValue::Int(v) => query.bind(*v),
        DbValue::UInt(v) => query.bind(*v),
        DbValue::Float(v) => query.bind(*v),
        DbValue::Decimal(v) | DbValue::String(v) | DbValue::DateTime(v) => query.bind(v.as_str()),
        DbValue::Bytes(v) => query.bind(v.as_slice()),
        DbValue::Json(v) => query.bind(sqlx::types::Json(v)),
    }
}

#[async_trait]
impl Driver for MySqlDriver {
    async fn execute(&mut self, sql: &str, params: &BoundParams) -> DriverResult<ResultSet> {
        let (positional_sql, values) = bind_named(sql, params)?;
        let fetch = returns_rows(&positional_sql);

        // Parameterless statements go through the text protocol; some
        // statements (SAVEPOINT, SET ...) cannot be prepared.
        if values.is_empty() {
            if fetch {
                let rows =
                    Executor::fetch_all(&mut self.conn, sqlx::raw_sql(&positional_sql)).await?;
                return Ok(self.collect(rows));
            }
            let result =
                Executor::execute(&mut self.conn, sqlx::raw_sql(&positional_sql)).await?;
            return Ok(
                ResultSet::affected(result.rows_affected()).with_last_insert_id(result.last_insert_id())
            );
        }

        let mut query = sqlx::query(&positional_sql);
        for value in &values {
            query = bind_param(query, value);
        }

        if fetch {
            let rows = query.fetch_all(&mut self.conn).await?;
            Ok(self.collect(rows))
        } else {
            let result = query.execute(&mut self.conn).await?;
            Ok(ResultSet::affected(result.rows_affected())
                .with_last_insert_id(result.last_insert_id()))
        }
    }

    async fn exec_raw(&mut self, sql: &str) -> DriverResult<u64> {
        let result = Executor::execute(&mut self.conn, sqlx::raw_sql(sql)).await?;
        Ok(result.rows_affected())
    }

    async fn begin(&mut self) -> DriverResult<()> {
        self.exec_raw("START TRANSACTION").await.map(|_| ())
    }

    async fn commit(&mut self) -> DriverResult<()> {
        self.exec_raw("COMMIT").await.map(|_| ())
    }

    async fn rollback(&mut self) -> DriverResult<()> {
        self.exec_raw("ROLLBACK").await.map(|_| ())
    }

    async fn server_version(&mut self) -> DriverResult<String> {
        if let Some(version) = &self.server_version {
            return Ok(version.clone());
        }
        let version: String = sqlx::query_scalar("SELECT VERSION()")
            .fetch_one(&mut self.conn)
            .await?;
        debug!(version = %version, "Fetched MySQL server version");
        self.server_version = Some(version.clone());
        Ok(version)
    }

    fn supports_savepoints(&self) -> bool {
        true
    }

    fn column_case(&self) -> ColumnCase {
        self.column_case
    }

    async fn close(self: Box<Self>) -> DriverResult<()> {
        self.conn.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_returns_rows() {
        assert!(returns_rows("SELECT 1"));
        assert!(returns_rows("  select * from t"));
        assert!(returns_rows("SHOW FULL COLUMNS FROM `t`"));
        assert!(returns_rows("(SELECT 1) UNION (SELECT 2)"));
        assert!(returns_rows("/* hint */ WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(returns_rows("-- note\nEXPLAIN SELECT 1"));
        assert!(!returns_rows("INSERT INTO t VALUES (1)"));
        assert!(!returns_rows("SAVEPOINT LEVEL1"));
        assert!(!returns_rows("SET NAMES 'utf8mb4'"));
        assert!(!returns_rows(""));
    }
}
