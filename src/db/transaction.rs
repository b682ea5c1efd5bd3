//! Nested transactions emulated with savepoints.
//!
//! Level 0 means no transaction. The first `begin` opens a real transaction;
//! each further `begin` sets a savepoint named `LEVEL{n}` after the level it
//! was created at. Commit and rollback unwind one level at a time.

use crate::db::connection::Connection;
use crate::error::{DbalError, DbalResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Transaction isolation levels understood by MySQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        })
    }
}

/// Nesting state kept by the owning connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct TransactionState {
    pub level: u32,
}

/// Handle on the connection's single transaction.
pub struct Transaction<'c> {
    conn: &'c mut Connection,
}

impl<'c> Transaction<'c> {
    pub(crate) fn new(conn: &'c mut Connection) -> Self {
        Self { conn }
    }

    /// Current nesting level; 0 when no transaction is open.
    pub fn level(&self) -> u32 {
        self.conn.transaction.map_or(0, |t| t.level)
    }

    pub fn is_active(&self) -> bool {
        self.level() > 0 && self.conn.is_active()
    }

    fn set_level(&mut self, level: u32) {
        self.conn.transaction = (level > 0).then_some(TransactionState { level });
    }

    /// Begin a transaction, or a savepoint when one is already open.
    ///
    /// The isolation level only applies when opening the outermost
    /// transaction.
    pub async fn begin(&mut self, isolation: Option<IsolationLevel>) -> DbalResult<()> {
        self.conn.open().await?;
        let level = self.level();

        if level == 0 {
            if let Some(isolation) = isolation {
                self.set_transaction_isolation_level(isolation).await?;
            }
            debug!(isolation = ?isolation, "Begin transaction");

            let driver = self.conn.driver().await?;
            driver
                .begin()
                .await
                .map_err(|e| DbalError::from_driver(e, "BEGIN"))?;
            self.set_level(1);
            return Ok(());
        }

        if !self.supports_savepoint() {
            debug!(level, "Transaction not started: nested transaction not supported");
            return Err(DbalError::not_supported(
                "Transaction not started: nested transaction not supported.",
            ));
        }

        debug!(level, "Set savepoint");
        self.create_savepoint(&format!("LEVEL{}", level)).await?;
        self.set_level(level + 1);
        Ok(())
    }

    /// Commit the innermost level.
    ///
    /// Without savepoint support a nested commit only lowers the level.
    pub async fn commit(&mut self) -> DbalResult<()> {
        if !self.is_active() {
            return Err(DbalError::inactive_transaction(
                "Failed to commit transaction: transaction was inactive.",
            ));
        }

        let level = self.level() - 1;
        self.set_level(level);

        if level == 0 {
            debug!("Commit transaction");
            let driver = self.conn.driver().await?;
            return driver
                .commit()
                .await
                .map_err(|e| DbalError::from_driver(e, "COMMIT"));
        }

        if self.supports_savepoint() {
            debug!(level, "Release savepoint");
            self.release_savepoint(&format!("LEVEL{}", level)).await
        } else {
            info!(level, "Transaction not committed: nested transaction not supported");
            Ok(())
        }
    }

    /// Roll back the innermost level. A no-op when no transaction is active.
    pub async fn roll_back(&mut self) -> DbalResult<()> {
        if !self.is_active() {
            return Ok(());
        }

        let level = self.level() - 1;
        self.set_level(level);

        if level == 0 {
            info!("Roll back transaction");
            let driver = self.conn.driver().await?;
            return driver
                .rollback()
                .await
                .map_err(|e| DbalError::from_driver(e, "ROLLBACK"));
        }

        if self.supports_savepoint() {
            debug!(level, "Roll back to savepoint");
            self.roll_back_savepoint(&format!("LEVEL{}", level)).await
        } else {
            info!(level, "Transaction not rolled back: nested transaction not supported");
            Ok(())
        }
    }

    /// Change the isolation level of the active transaction.
    pub async fn set_isolation_level(&mut self, isolation: IsolationLevel) -> DbalResult<()> {
        if !self.is_active() {
            return Err(DbalError::inactive_transaction(
                "Failed to set isolation level: transaction was inactive.",
            ));
        }
        debug!(isolation = %isolation, "Setting transaction isolation level");
        self.set_transaction_isolation_level(isolation).await
    }

    pub async fn create_savepoint(&mut self, name: &str) -> DbalResult<()> {
        self.run(format!("SAVEPOINT {}", name)).await
    }

    pub async fn release_savepoint(&mut self, name: &str) -> DbalResult<()> {
        self.run(format!("RELEASE SAVEPOINT {}", name)).await
    }

    pub async fn roll_back_savepoint(&mut self, name: &str) -> DbalResult<()> {
        self.run(format!("ROLLBACK TO SAVEPOINT {}", name)).await
    }

    /// Whether the open driver handle supports savepoints.
    pub fn supports_savepoint(&self) -> bool {
        self.conn.supports_savepoints()
    }

    async fn set_transaction_isolation_level(&mut self, isolation: IsolationLevel) -> DbalResult<()> {
        self.run(format!("SET TRANSACTION ISOLATION LEVEL {}", isolation))
            .await
    }

    async fn run(&mut self, sql: String) -> DbalResult<()> {
        self.conn.command().set_raw_sql(sql).execute().await?;
        Ok(())
    }
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("level", &self.level())
            .finish_non_exhaustive()
    }
}
