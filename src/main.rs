//! dbal-inspect - Main entry point.
//!
//! Small command-line front end over the mysql-dbal core: lists tables,
//! describes table metadata and runs ad-hoc statements, printing JSON.

use mysql_dbal::config::{Action, Config, parse_param};
use mysql_dbal::db::mysql::returns_rows;
use mysql_dbal::error::DbalError;
use mysql_dbal::models::Row;
use mysql_dbal::Connection;
use serde_json::{Value as JsonValue, json};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // Logs go to stderr so stdout stays valid JSON.
    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

async fn describe(conn: &mut Connection, name: &str) -> Result<JsonValue, DbalError> {
    let mut schema = conn.schema();
    let Some(table) = schema.get_table_schema(name, false).await? else {
        return Err(DbalError::invalid_argument(format!(
            "Table '{}' does not exist",
            name
        )));
    };
    let primary_key = schema.get_table_primary_key(name, false).await?;
    let foreign_keys = schema.get_table_foreign_keys(name, false).await?;
    let uniques = schema.get_table_uniques(name, false).await?;
    let indexes = schema.get_table_indexes(name, false).await?;

    Ok(json!({
        "table": table,
        "primary_key": primary_key,
        "foreign_keys": foreign_keys,
        "uniques": uniques,
        "indexes": indexes,
    }))
}

async fn run(conn: &mut Connection, action: &Action) -> Result<JsonValue, DbalError> {
    match action {
        Action::Tables { schema } => {
            let names = conn
                .schema()
                .get_table_names(schema.as_deref(), false)
                .await?;
            Ok(json!(names))
        }
        Action::Describe { table } => describe(conn, table).await,
        Action::Query { sql, params } => {
            let mut command = conn.create_command(sql);
            for param in params {
                let (name, value) = parse_param(param)?;
                command.bind_value(name, value)?;
            }

            if returns_rows(command.sql()) {
                let rows = command.query_all().await?;
                info!(count = rows.len(), "Query returned rows");
                Ok(JsonValue::Array(
                    rows.iter().map(Row::to_json).map(JsonValue::Object).collect(),
                ))
            } else {
                let affected = command.execute().await?;
                Ok(json!({
                    "rows_affected": affected,
                    "last_insert_id": command.last_insert_id(),
                }))
            }
        }
        Action::Version => Ok(json!(conn.info().await?)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse_args();

    init_tracing(&config);

    let mut conn = Connection::new(config.connection_config()?);
    let result = run(&mut conn, &config.action).await;
    conn.close().await;

    match result {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Command failed");
            Err(e.into())
        }
    }
}
