//! Scripted driver for tests.
//!
//! [`MockConnector`] hands out [`MockDriver`] handles that record every call
//! and answer statements from a queue of canned results. Clones share the
//! same recording, so a test keeps one clone and gives another to the
//! connection.

use crate::config::ConnectionConfig;
use crate::db::driver::{BoundParams, Connector, Driver, DriverResult, ResultSet, bind_named};
use crate::error::DriverError;
use crate::models::ColumnCase;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A call received by a mock driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Execute { sql: String, params: BoundParams },
    ExecRaw(String),
    Begin,
    Commit,
    Rollback,
    Close,
}

impl Call {
    /// Statement text sent to the server, if the call sends one.
    pub fn statement(&self) -> Option<&str> {
        match self {
            Self::Execute { sql, .. } | Self::ExecRaw(sql) => Some(sql),
            Self::Begin => Some("BEGIN"),
            Self::Commit => Some("COMMIT"),
            Self::Rollback => Some("ROLLBACK"),
            Self::Close => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Response {
    Rows(ResultSet),
    Error(DriverError),
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<Call>,
    responses: VecDeque<(String, Response)>,
    connects: usize,
}

#[derive(Debug, Clone)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
    savepoints: bool,
    column_case: ColumnCase,
    server_version: String,
    connect_error: Option<DriverError>,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            savepoints: true,
            column_case: ColumnCase::Natural,
            server_version: "8.0.0-mock".to_string(),
            connect_error: None,
        }
    }

    pub fn with_savepoints(mut self, supported: bool) -> Self {
        self.savepoints = supported;
        self
    }

    pub fn with_column_case(mut self, column_case: ColumnCase) -> Self {
        self.column_case = column_case;
        self
    }

    pub fn with_server_version(mut self, version: impl Into<String>) -> Self {
        self.server_version = version.into();
        self
    }

    /// Make every connection attempt fail with `err`.
    pub fn fail_connect(mut self, err: DriverError) -> Self {
        self.connect_error = Some(err);
        self
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer the next statement containing `pattern` with `result`.
    pub fn push_result(&self, pattern: impl Into<String>, result: ResultSet) {
        self.lock()
            .responses
            .push_back((pattern.into(), Response::Rows(result)));
    }

    /// Fail the next statement containing `pattern` with `err`.
    pub fn push_error(&self, pattern: impl Into<String>, err: DriverError) {
        self.lock()
            .responses
            .push_back((pattern.into(), Response::Error(err)));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Statement text of every recorded call, in order.
    pub fn statements(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| c.statement().map(str::to_string))
            .collect()
    }

    /// Number of statements containing `pattern`.
    pub fn count(&self, pattern: &str) -> usize {
        self.statements()
            .iter()
            .filter(|s| s.contains(pattern))
            .count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn connect_count(&self) -> usize {
        self.lock().connects
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn driver_name(&self) -> &'static str {
        "mock"
    }

    async fn connect(&self, _config: &ConnectionConfig) -> DriverResult<Box<dyn Driver>> {
        self.lock().connects += 1;
        if let Some(err) = &self.connect_error {
            return Err(err.clone());
        }
        Ok(Box::new(MockDriver {
            state: Arc::clone(&self.state),
            savepoints: self.savepoints,
            column_case: self.column_case,
            server_version: self.server_version.clone(),
        }))
    }
}

#[derive(Debug)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
    savepoints: bool,
    column_case: ColumnCase,
    server_version: String,
}

impl MockDriver {
    /// Record `call` and take the first queued response matching it.
    fn respond(&self, call: Call) -> DriverResult<ResultSet> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let statement = call.statement().unwrap_or_default().to_string();
        state.calls.push(call);

        let position = state
            .responses
            .iter()
            .position(|(pattern, _)| statement.contains(pattern.as_str()));
        match position.and_then(|i| state.responses.remove(i)) {
            Some((_, Response::Rows(mut result))) => {
                result.columns = result
                    .columns
                    .iter()
                    .map(|c| self.column_case.apply(c))
                    .collect();
                Ok(result)
            }
            Some((_, Response::Error(err))) => Err(err),
            None => Ok(ResultSet::default()),
        }
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn execute(&mut self, sql: &str, params: &BoundParams) -> DriverResult<ResultSet> {
        let result = self.respond(Call::Execute {
            sql: sql.to_string(),
            params: params.clone(),
        });
        bind_named(sql, params)?;
        result
    }

    async fn exec_raw(&mut self, sql: &str) -> DriverResult<u64> {
        self.respond(Call::ExecRaw(sql.to_string()))
            .map(|r| r.rows_affected)
    }

    async fn begin(&mut self) -> DriverResult<()> {
        self.respond(Call::Begin).map(|_| ())
    }

    async fn commit(&mut self) -> DriverResult<()> {
        self.respond(Call::Commit).map(|_| ())
    }

    async fn rollback(&mut self) -> DriverResult<()> {
        self.respond(Call::Rollback).map(|_| ())
    }

    async fn server_version(&mut self) -> DriverResult<String> {
        Ok(self.server_version.clone())
    }

    fn supports_savepoints(&self) -> bool {
        self.savepoints
    }

    fn column_case(&self) -> ColumnCase {
        self.column_case
    }

    async fn close(self: Box<Self>) -> DriverResult<()> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .calls
            .push(Call::Close);
        Ok(())
    }
}
