//! A single database connection
//!
//! Executes statements, keeps the nested transaction depth and optionally
//! records every statement with its bindings and timing.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::backends::{open_handle, DatabaseHandle, DatabaseValue, Row, SqlDialect};
use crate::config::{ConnectionConfig, Driver};
use crate::error::{OrmError, OrmResult};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique connection identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One recorded statement
#[derive(Debug, Clone, PartialEq)]
pub struct QueryLogEntry {
    pub sql: String,
    pub bindings: Vec<Value>,
    pub elapsed: Duration,
}

pub struct Connection {
    id: ConnectionId,
    name: String,
    config: ConnectionConfig,
    handle: Box<dyn DatabaseHandle>,
    transactions: u32,
    query_log: Vec<QueryLogEntry>,
    logging_queries: bool,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("driver", &self.config.driver)
            .field("transactions", &self.transactions)
            .field("logging_queries", &self.logging_queries)
            .finish()
    }
}

impl Connection {
    /// Open a new physical connection from configuration.
    pub async fn open(name: &str, config: &ConnectionConfig) -> OrmResult<Self> {
        let handle = open_handle(name, config).await?;
        Ok(Self::from_handle(name, config.clone(), handle))
    }

    /// Wrap an already opened handle.
    pub fn from_handle(name: &str, config: ConnectionConfig, handle: Box<dyn DatabaseHandle>) -> Self {
        let logging_queries = config.log_queries;
        Self {
            id: ConnectionId::next(),
            name: name.to_string(),
            config,
            handle,
            transactions: 0,
            query_log: Vec::new(),
            logging_queries,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn driver(&self) -> OrmResult<Driver> {
        self.config.driver()
    }

    pub fn dialect(&self) -> SqlDialect {
        self.handle.dialect()
    }

    /// Run a query and return every row.
    pub async fn select(&mut self, sql: &str, bindings: &[Value]) -> OrmResult<Vec<Row>> {
        let params = coerce(bindings);
        let started = Instant::now();
        let result = self.handle.fetch_all(sql, &params).await;
        self.log_query(sql, bindings, started.elapsed());
        result.map_err(|e| OrmError::query(sql, bindings, e))
    }

    /// Run a query and return its first row.
    pub async fn select_one(&mut self, sql: &str, bindings: &[Value]) -> OrmResult<Option<Row>> {
        Ok(self.select(sql, bindings).await?.into_iter().next())
    }

    /// Execute a statement; `true` once it ran.
    pub async fn statement(&mut self, sql: &str, bindings: &[Value]) -> OrmResult<bool> {
        self.run(sql, bindings).await?;
        Ok(true)
    }

    /// Execute a statement and return the number of affected rows.
    pub async fn affecting_statement(&mut self, sql: &str, bindings: &[Value]) -> OrmResult<u64> {
        Ok(self.run(sql, bindings).await?.rows_affected)
    }

    pub async fn insert(&mut self, sql: &str, bindings: &[Value]) -> OrmResult<bool> {
        self.statement(sql, bindings).await
    }

    /// Execute an insert and return the generated identity.
    ///
    /// PostgreSQL statements are expected to end in `RETURNING <key>`; the
    /// first column of the returned row is the id.
    pub async fn insert_get_id(&mut self, sql: &str, bindings: &[Value]) -> OrmResult<Option<i64>> {
        if self.dialect().uses_returning() {
            let row = self.select_one(sql, bindings).await?;
            return Ok(row
                .and_then(|row| row.values().next().cloned())
                .and_then(|id| id.as_i64().or_else(|| id.as_str().and_then(|s| s.parse().ok()))));
        }
        Ok(self.run(sql, bindings).await?.last_insert_id)
    }

    pub async fn update(&mut self, sql: &str, bindings: &[Value]) -> OrmResult<u64> {
        self.affecting_statement(sql, bindings).await
    }

    pub async fn delete(&mut self, sql: &str, bindings: &[Value]) -> OrmResult<u64> {
        self.affecting_statement(sql, bindings).await
    }

    async fn run(&mut self, sql: &str, bindings: &[Value]) -> OrmResult<crate::backends::ExecOutcome> {
        let params = coerce(bindings);
        let started = Instant::now();
        let result = self.handle.execute(sql, &params).await;
        self.log_query(sql, bindings, started.elapsed());
        result.map_err(|e| OrmError::query(sql, bindings, e))
    }

    fn log_query(&mut self, sql: &str, bindings: &[Value], elapsed: Duration) {
        tracing::debug!(
            target: "astra_orm::query",
            connection = %self.name,
            sql = %sql,
            bindings = bindings.len(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "statement executed"
        );
        if self.logging_queries {
            self.query_log.push(QueryLogEntry {
                sql: sql.to_string(),
                bindings: bindings.to_vec(),
                elapsed,
            });
        }
    }

    /// Start a transaction; only the outermost call touches the database.
    pub async fn begin_transaction(&mut self) -> OrmResult<bool> {
        if self.transactions == 0 {
            self.control("BEGIN").await?;
        }
        self.transactions += 1;
        Ok(true)
    }

    /// Commit; the physical commit happens when the depth goes from 1 to 0.
    /// Returns `false` when no transaction is open.
    pub async fn commit(&mut self) -> OrmResult<bool> {
        self.finish_transaction("COMMIT").await
    }

    /// Roll back; the physical rollback happens when the depth goes from 1 to 0.
    /// Returns `false` when no transaction is open.
    pub async fn rollback(&mut self) -> OrmResult<bool> {
        self.finish_transaction("ROLLBACK").await
    }

    async fn finish_transaction(&mut self, verb: &str) -> OrmResult<bool> {
        if self.transactions == 0 {
            return Ok(false);
        }
        if self.transactions == 1 {
            let outcome = self.control(verb).await;
            self.transactions = 0;
            outcome?;
        } else {
            self.transactions = self.transactions.saturating_sub(1);
        }
        Ok(true)
    }

    async fn control(&mut self, sql: &str) -> OrmResult<()> {
        let started = Instant::now();
        let result = self.handle.execute_unprepared(sql).await;
        self.log_query(sql, &[], started.elapsed());
        result.map_err(|e| OrmError::query(sql, &[], e))
    }

    /// Current nesting depth
    pub fn transaction_level(&self) -> u32 {
        self.transactions
    }

    pub fn enable_query_log(&mut self) {
        self.logging_queries = true;
    }

    pub fn disable_query_log(&mut self) {
        self.logging_queries = false;
    }

    pub fn logging_queries(&self) -> bool {
        self.logging_queries
    }

    pub fn query_log(&self) -> &[QueryLogEntry] {
        &self.query_log
    }

    pub fn clear_query_log(&mut self) {
        self.query_log.clear();
    }

    /// Close the physical handle.
    pub async fn disconnect(self) -> OrmResult<()> {
        let name = self.name;
        self.handle
            .close()
            .await
            .map_err(|e| OrmError::connection(&name, e.to_string()))
    }
}

fn coerce(bindings: &[Value]) -> Vec<DatabaseValue> {
    bindings.iter().map(DatabaseValue::from_json).collect()
}
