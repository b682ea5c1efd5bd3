//! Connection facade.
//!
//! A [`Connection`] owns one driver handle and everything scoped to it: the
//! quoter, the schema metadata and the transaction nesting state. Commands,
//! transactions and schema views borrow the connection mutably, so only one
//! of them can be in use at a time.

use crate::config::ConnectionConfig;
use crate::db::cache::{MemorySchemaCache, SchemaCache};
use crate::db::command::Command;
use crate::db::driver::{Connector, Driver};
use crate::db::mysql::MySqlConnector;
use crate::db::quoter::{Quoter, quote_string};
use crate::db::schema::{Schema, SchemaState};
use crate::db::transaction::{IsolationLevel, Transaction, TransactionState};
use crate::error::{DbalError, DbalResult, DriverError};
use crate::models::{ColumnCase, ConnectionInfo};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct Connection {
    config: ConnectionConfig,
    connector: Arc<dyn Connector>,
    handle: Option<Box<dyn Driver>>,
    quoter: Option<Quoter>,
    pub(crate) transaction: Option<TransactionState>,
    pub(crate) schema: Option<SchemaState>,
    schema_cache: Option<Arc<dyn SchemaCache>>,
}

impl Connection {
    /// Create a MySQL connection. Nothing is opened until first use.
    ///
    /// A [`MemorySchemaCache`] is attached when the configuration enables
    /// schema caching.
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_connector(config, Arc::new(MySqlConnector))
    }

    /// Create a connection that opens its handle through `connector`.
    pub fn with_connector(config: ConnectionConfig, connector: Arc<dyn Connector>) -> Self {
        let schema_cache = config.schema_cache.enabled.then(|| {
            Arc::new(MemorySchemaCache::from_options(&config.schema_cache)) as Arc<dyn SchemaCache>
        });
        Self {
            config,
            connector,
            handle: None,
            quoter: None,
            transaction: None,
            schema: None,
            schema_cache,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Open the driver handle. Does nothing when already open.
    pub async fn open(&mut self) -> DbalResult<()> {
        if self.handle.is_some() {
            return Ok(());
        }
        if self.config.dsn.trim().is_empty() {
            return Err(DbalError::configuration("Connection::dsn cannot be empty."));
        }

        let dsn = self.config.masked_dsn();
        info!(dsn = %dsn, driver = self.connector.driver_name(), "Opening DB connection");

        let mut driver = match self.connector.connect(&self.config).await {
            Ok(driver) => driver,
            Err(e) => {
                error!(dsn = %dsn, error = %e, "Failed to open DB connection");
                return Err(DbalError::connection(e));
            }
        };

        if let Some(charset) = self.config.charset.as_deref().filter(|c| !c.is_empty()) {
            let sql = format!("SET NAMES {}", quote_string(charset));
            if let Err(e) = driver.exec_raw(&sql).await {
                error!(dsn = %dsn, error = %e, "Failed to set connection charset");
                return Err(DbalError::connection(e));
            }
        }

        self.handle = Some(driver);
        Ok(())
    }

    /// Close the driver handle and forget any open transaction.
    pub async fn close(&mut self) {
        let Some(driver) = self.handle.take() else {
            return;
        };
        debug!(dsn = %self.config.masked_dsn(), "Closing DB connection");
        self.transaction = None;
        if let Err(e) = driver.close().await {
            warn!(error = %e, "Error while closing DB connection");
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// The open driver handle, opening it first if needed.
    pub(crate) async fn driver(&mut self) -> DbalResult<&mut Box<dyn Driver>> {
        self.open().await?;
        self.handle
            .as_mut()
            .ok_or_else(|| DbalError::connection(DriverError::new("Driver handle not initialized")))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn dsn(&self) -> &str {
        &self.config.dsn
    }

    pub fn username(&self) -> Option<&str> {
        self.config.username.as_deref()
    }

    pub fn driver_name(&self) -> &'static str {
        self.connector.driver_name()
    }

    pub fn table_prefix(&self) -> &str {
        &self.config.table_prefix
    }

    pub fn set_table_prefix(&mut self, prefix: impl Into<String>) {
        self.config.table_prefix = prefix.into();
        self.quoter = None;
    }

    /// Result-column case of the open handle, or the configured one.
    pub fn column_case(&self) -> ColumnCase {
        self.handle
            .as_ref()
            .map_or(self.config.column_case, |d| d.column_case())
    }

    pub(crate) fn supports_savepoints(&self) -> bool {
        self.handle.as_ref().is_some_and(|d| d.supports_savepoints())
    }

    pub fn quoter(&mut self) -> &Quoter {
        let prefix = &self.config.table_prefix;
        self.quoter.get_or_insert_with(|| Quoter::new(prefix.clone()))
    }

    /// Rewrite table and column macros in `sql`.
    pub fn quote_sql(&mut self, sql: &str) -> String {
        self.quoter().quote_sql(sql)
    }

    pub fn schema(&mut self) -> Schema<'_> {
        Schema::new(self)
    }

    pub fn schema_cache(&self) -> Option<Arc<dyn SchemaCache>> {
        self.schema_cache.clone()
    }

    pub fn set_schema_cache(&mut self, cache: Option<Arc<dyn SchemaCache>>) {
        self.schema_cache = cache;
    }

    pub async fn server_version(&mut self) -> DbalResult<String> {
        let driver = self.driver().await?;
        driver
            .server_version()
            .await
            .map_err(|e| DbalError::from_driver(e, "SELECT VERSION()"))
    }

    pub async fn info(&mut self) -> DbalResult<ConnectionInfo> {
        let server_version = self.server_version().await?;
        Ok(ConnectionInfo {
            driver_name: self.driver_name().to_string(),
            dsn: self.config.masked_dsn(),
            username: self.config.username.clone(),
            server_version,
            table_prefix: self.config.table_prefix.clone(),
            transaction_level: self.transaction.map_or(0, |t| t.level),
        })
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// A command for `sql`, with table and column macros resolved.
    pub fn create_command(&mut self, sql: &str) -> Command<'_> {
        let mut command = Command::new(self);
        command.set_sql(sql);
        command
    }

    /// A command without SQL.
    pub fn command(&mut self) -> Command<'_> {
        Command::new(self)
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Begin a transaction, or a nested savepoint if one is active.
    pub async fn begin_transaction(
        &mut self,
        isolation: Option<IsolationLevel>,
    ) -> DbalResult<Transaction<'_>> {
        self.open().await?;
        let mut transaction = Transaction::new(self);
        transaction.begin(isolation).await?;
        Ok(transaction)
    }

    /// The active transaction, if any.
    pub fn get_transaction(&mut self) -> Option<Transaction<'_>> {
        if self.transaction.is_some() && self.is_active() {
            Some(Transaction::new(self))
        } else {
            None
        }
    }

    /// Run `callback` inside a transaction.
    ///
    /// Commits when the callback succeeds and the transaction is still at
    /// the level it was entered with. On any error the transaction is
    /// rolled back at that level and the original error is returned.
    pub async fn transaction<T, F>(
        &mut self,
        isolation: Option<IsolationLevel>,
        callback: F,
    ) -> DbalResult<T>
    where
        F: AsyncFnOnce(&mut Connection) -> DbalResult<T>,
    {
        let level = self.begin_transaction(isolation).await?.level();

        let outcome = callback(&mut *self).await;
        let result = match outcome {
            Ok(value) => {
                let mut transaction = Transaction::new(self);
                if transaction.is_active() && transaction.level() == level {
                    transaction.commit().await.map(|()| value)
                } else {
                    Ok(value)
                }
            }
            Err(e) => Err(e),
        };

        if result.is_err() {
            self.rollback_transaction_on_level(level).await;
        }
        result
    }

    /// Roll back if the transaction is still active at `level`. Failures are
    /// logged and dropped.
    async fn rollback_transaction_on_level(&mut self, level: u32) {
        let mut transaction = Transaction::new(self);
        if !transaction.is_active() || transaction.level() != level {
            return;
        }
        if let Err(e) = transaction.roll_back().await {
            error!(level, error = %e, "Failed to roll back transaction");
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("dsn", &self.config.masked_dsn())
            .field("driver", &self.connector.driver_name())
            .field("active", &self.is_active())
            .field("transaction", &self.transaction)
            .field("schema_cache", &self.schema_cache)
            .finish_non_exhaustive()
    }
}
