//! In-memory handle for connection tests

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::backends::{DatabaseHandle, DatabaseValue, ExecOutcome, Row, SqlDialect};

#[derive(Default)]
struct MockState {
    statements: Vec<String>,
    last_params: Vec<DatabaseValue>,
    rows: VecDeque<Vec<Row>>,
    failure: Option<String>,
}

/// Records every statement; clones share the same log.
#[derive(Clone)]
pub(crate) struct MockHandle {
    dialect: SqlDialect,
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    pub(crate) fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    pub(crate) fn statements(&self) -> Vec<String> {
        self.state.lock().statements.clone()
    }

    pub(crate) fn last_params(&self) -> Vec<DatabaseValue> {
        self.state.lock().last_params.clone()
    }

    pub(crate) fn push_rows(&self, rows: Vec<Row>) {
        self.state.lock().rows.push_back(rows);
    }

    pub(crate) fn fail_next(&self, message: &str) {
        self.state.lock().failure = Some(message.to_string());
    }

    fn record(&self, sql: &str, params: &[DatabaseValue]) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock();
        if let Some(message) = state.failure.take() {
            return Err(sqlx::Error::Protocol(message));
        }
        state.statements.push(sql.to_string());
        state.last_params = params.to_vec();
        Ok(())
    }
}

#[async_trait]
impl DatabaseHandle for MockHandle {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> Result<ExecOutcome, sqlx::Error> {
        self.record(sql, params)?;
        Ok(ExecOutcome {
            rows_affected: 1,
            last_insert_id: Some(1),
        })
    }

    async fn fetch_all(&mut self, sql: &str, params: &[DatabaseValue]) -> Result<Vec<Row>, sqlx::Error> {
        self.record(sql, params)?;
        Ok(self.state.lock().rows.pop_front().unwrap_or_default())
    }

    async fn execute_unprepared(&mut self, sql: &str) -> Result<(), sqlx::Error> {
        self.record(sql, &[])
    }

    fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    async fn close(self: Box<Self>) -> Result<(), sqlx::Error> {
        Ok(())
    }
}
