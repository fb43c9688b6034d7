//! Connection Pool Management
//!
//! A bounded FIFO of idle connections. `acquire` never waits: it reuses an idle
//! connection, opens a new one while below `max_connections`, and otherwise
//! hands out an unpooled connection. Pruning runs inline on every acquire.

use std::collections::{HashMap, HashSet, VecDeque};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::core::{Connection, ConnectionId};
use crate::config::ConnectionConfig;
use crate::error::OrmResult;

/// Opens physical connections for a pool
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, name: &str, config: &ConnectionConfig) -> OrmResult<Connection>;
}

/// Opens connections through the configured driver
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConnector;

#[async_trait]
impl Connector for DefaultConnector {
    async fn connect(&self, name: &str, config: &ConnectionConfig) -> OrmResult<Connection> {
        Connection::open(name, config).await
    }
}

/// Point-in-time pool counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub idle: usize,
    pub checked_out: usize,
    pub total: usize,
    pub max: usize,
    pub acquire_count: u64,
    pub acquire_errors: u64,
    pub unpooled_count: u64,
}

#[derive(Default)]
struct PoolState {
    idle: VecDeque<Connection>,
    last_used: HashMap<ConnectionId, Instant>,
    checked_out: HashSet<ConnectionId>,
    /// Slots claimed by connections that are still being opened
    opening: usize,
}

impl PoolState {
    fn total(&self) -> usize {
        self.idle.len() + self.checked_out.len() + self.opening
    }

    fn prune(&mut self, config: &ConnectionConfig) -> usize {
        let timeout = config.pool.idle_timeout();
        let before = self.idle.len();
        let mut kept = VecDeque::with_capacity(before);
        let mut evicted = Vec::new();
        while let Some(conn) = self.idle.pop_front() {
            let fresh = self
                .last_used
                .get(&conn.id())
                .map(|at| at.elapsed() <= timeout)
                .unwrap_or(false);
            if fresh {
                kept.push_back(conn);
            } else {
                evicted.push(conn);
            }
        }
        self.idle = kept;

        // an in-memory database is gone once its last connection closes
        if config.is_in_memory() && self.total() == 0 {
            if let Some(conn) = evicted.pop() {
                self.idle.push_back(conn);
            }
        }
        for conn in &evicted {
            self.last_used.remove(&conn.id());
        }
        before - self.idle.len()
    }
}

struct PoolShared {
    name: String,
    config: ConnectionConfig,
    connector: Arc<dyn Connector>,
    state: Mutex<PoolState>,
    acquire_count: AtomicU64,
    acquire_errors: AtomicU64,
    unpooled_count: AtomicU64,
}

/// Clonable handle to one named pool
#[derive(Clone)]
pub struct ConnectionPool {
    shared: Arc<PoolShared>,
}

enum Plan {
    Reuse(Connection),
    Open,
    Overflow,
}

impl ConnectionPool {
    /// Build a pool without opening anything.
    pub fn new(name: &str, config: ConnectionConfig, connector: Arc<dyn Connector>) -> OrmResult<Self> {
        config.pool.validate()?;
        Ok(Self {
            shared: Arc::new(PoolShared {
                name: name.to_string(),
                config,
                connector,
                state: Mutex::new(PoolState::default()),
                acquire_count: AtomicU64::new(0),
                acquire_errors: AtomicU64::new(0),
                unpooled_count: AtomicU64::new(0),
            }),
        })
    }

    /// Build a pool and pre-warm `min_connections` idle connections.
    pub async fn connect(name: &str, config: ConnectionConfig, connector: Arc<dyn Connector>) -> OrmResult<Self> {
        let pool = Self::new(name, config, connector)?;
        pool.warm().await?;
        Ok(pool)
    }

    /// Open idle connections until `min_connections` exist.
    pub async fn warm(&self) -> OrmResult<()> {
        let missing = {
            let state = self.shared.state.lock();
            self.shared.config.pool.min_connections.saturating_sub(state.total())
        };
        for _ in 0..missing {
            let conn = self.open().await?;
            let mut state = self.shared.state.lock();
            if state.total() < self.shared.config.pool.max_connections {
                state.last_used.insert(conn.id(), Instant::now());
                state.idle.push_back(conn);
            }
        }
        tracing::debug!(pool = %self.shared.name, opened = missing, "pool warmed");
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.shared.config
    }

    /// Check out a connection.
    pub async fn acquire(&self) -> OrmResult<PooledConnection> {
        self.shared.acquire_count.fetch_add(1, Ordering::Relaxed);
        let max = self.shared.config.pool.max_connections;

        let plan = {
            let mut state = self.shared.state.lock();
            let pruned = state.prune(&self.shared.config);
            if pruned > 0 {
                tracing::debug!(pool = %self.shared.name, pruned, "evicted idle connections");
            }
            if let Some(conn) = state.idle.pop_front() {
                state.last_used.remove(&conn.id());
                state.checked_out.insert(conn.id());
                Plan::Reuse(conn)
            } else if state.total() < max {
                state.opening += 1;
                Plan::Open
            } else {
                Plan::Overflow
            }
        };

        let conn = match plan {
            Plan::Reuse(conn) => conn,
            Plan::Open => {
                let opened = self.open().await;
                let mut state = self.shared.state.lock();
                state.opening = state.opening.saturating_sub(1);
                let conn = opened?;
                state.checked_out.insert(conn.id());
                conn
            }
            Plan::Overflow => {
                tracing::warn!(
                    pool = %self.shared.name,
                    max_connections = max,
                    "connection pool saturated, handing out an unpooled connection"
                );
                self.shared.unpooled_count.fetch_add(1, Ordering::Relaxed);
                self.open().await?
            }
        };
        Ok(PooledConnection::new(conn, self.clone()))
    }

    async fn open(&self) -> OrmResult<Connection> {
        match self
            .shared
            .connector
            .connect(&self.shared.name, &self.shared.config)
            .await
        {
            Ok(conn) => Ok(conn),
            Err(e) => {
                self.shared.acquire_errors.fetch_add(1, Ordering::Relaxed);
                tracing::error!(pool = %self.shared.name, error = %e, "failed to open database connection");
                Err(e)
            }
        }
    }

    /// Return a connection. It is queued while the pool has room and dropped
    /// otherwise; a connection with an open transaction is always dropped.
    pub fn release(&self, conn: Connection) {
        let max = self.shared.config.pool.max_connections;
        let mut state = self.shared.state.lock();
        let pooled = state.checked_out.remove(&conn.id());

        if conn.transaction_level() > 0 {
            tracing::warn!(
                pool = %self.shared.name,
                connection = %conn.id(),
                depth = conn.transaction_level(),
                "discarding connection released inside a transaction"
            );
            return;
        }

        let has_room = if pooled {
            state.idle.len() < max
        } else {
            state.total() < max
        };
        if has_room {
            state.last_used.insert(conn.id(), Instant::now());
            state.idle.push_back(conn);
        } else {
            tracing::debug!(pool = %self.shared.name, connection = %conn.id(), "pool full, discarding connection");
        }
    }

    pub fn idle_count(&self) -> usize {
        self.shared.state.lock().idle.len()
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.shared.state.lock();
        PoolStats {
            idle: state.idle.len(),
            checked_out: state.checked_out.len(),
            total: state.total(),
            max: self.shared.config.pool.max_connections,
            acquire_count: self.shared.acquire_count.load(Ordering::Relaxed),
            acquire_errors: self.shared.acquire_errors.load(Ordering::Relaxed),
            unpooled_count: self.shared.unpooled_count.load(Ordering::Relaxed),
        }
    }

    /// Drop every idle connection.
    pub fn flush(&self) {
        let mut state = self.shared.state.lock();
        state.idle.clear();
        state.last_used.clear();
    }
}

/// A checked-out connection; goes back to its pool when dropped
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: ConnectionPool,
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("conn", &self.conn)
            .finish_non_exhaustive()
    }
}

impl PooledConnection {
    fn new(conn: Connection, pool: ConnectionPool) -> Self {
        Self {
            conn: Some(conn),
            pool,
        }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        match &self.conn {
            Some(conn) => conn,
            None => unreachable!("connection taken before drop"),
        }
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        match &mut self.conn {
            Some(conn) => conn,
            None => unreachable!("connection taken before drop"),
        }
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::error::OrmError;
    use std::time::Duration;

    struct FailingConnector;

    #[async_trait]
    impl Connector for FailingConnector {
        async fn connect(&self, name: &str, _config: &ConnectionConfig) -> OrmResult<Connection> {
            Err(OrmError::connection(name, "connection refused"))
        }
    }

    fn sqlite_pool(dir: &tempfile::TempDir, pool: PoolConfig) -> ConnectionPool {
        let path = dir.path().join("pool.db");
        let config = ConnectionConfig::sqlite(path.to_string_lossy()).with_pool(pool);
        ConnectionPool::new("test", config, Arc::new(DefaultConnector)).unwrap()
    }

    #[tokio::test]
    async fn test_saturated_pool_hands_out_unpooled_connection() {
        let dir = tempfile::tempdir().unwrap();
        let pool = sqlite_pool(&dir, PoolConfig::new(0, 2, 60));

        let first = pool.acquire().await.unwrap();
        let second = pool.acquire().await.unwrap();
        assert_eq!(pool.stats().checked_out, 2);

        let mut third = pool.acquire().await.unwrap();
        assert!(third.statement("SELECT 1", &[]).await.unwrap());
        assert_eq!(pool.stats().unpooled_count, 1);
        assert_eq!(pool.stats().total, 2);

        drop(first);
        drop(second);
        drop(third);
        assert_eq!(pool.idle_count(), 2);
    }

    #[tokio::test]
    async fn test_idle_queue_never_exceeds_max() {
        let dir = tempfile::tempdir().unwrap();
        let pool = sqlite_pool(&dir, PoolConfig::new(0, 2, 60));

        let held: Vec<_> = {
            let mut held = Vec::new();
            for _ in 0..4 {
                held.push(pool.acquire().await.unwrap());
            }
            held
        };
        drop(held);

        let stats = pool.stats();
        assert_eq!(stats.idle, 2);
        assert_eq!(stats.checked_out, 0);
    }

    #[tokio::test]
    async fn test_reuse_is_fifo() {
        let dir = tempfile::tempdir().unwrap();
        let pool = sqlite_pool(&dir, PoolConfig::new(0, 3, 60));

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        let (a_id, b_id) = (a.id(), b.id());
        drop(a);
        drop(b);

        assert_eq!(pool.acquire().await.unwrap().id(), a_id);
        // the guard above went back to the tail of the queue
        assert_eq!(pool.acquire().await.unwrap().id(), b_id);
    }

    #[tokio::test]
    async fn test_pruning_evicts_expired_connections() {
        let dir = tempfile::tempdir().unwrap();
        let pool = sqlite_pool(&dir, PoolConfig::new(0, 2, 0));

        let first_id = pool.acquire().await.unwrap().id();
        assert_eq!(pool.idle_count(), 1);
        tokio::time::sleep(Duration::from_millis(10)).await;

        let next = pool.acquire().await.unwrap();
        assert_ne!(next.id(), first_id);
    }

    #[tokio::test]
    async fn test_memory_database_is_shared_across_connections() {
        let config = ConnectionConfig::sqlite(":memory:").with_pool(PoolConfig::new(0, 2, 60));
        let pool = ConnectionPool::new("memory", config, Arc::new(DefaultConnector)).unwrap();

        let mut held = pool.acquire().await.unwrap();
        held.statement("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)", &[])
            .await
            .unwrap();
        held.insert("INSERT INTO users (name) VALUES (?)", &[serde_json::json!("Ann")])
            .await
            .unwrap();

        let mut second = pool.acquire().await.unwrap();
        let mut overflow = pool.acquire().await.unwrap();
        assert_ne!(second.id(), held.id());
        assert_eq!(second.select("SELECT name FROM users", &[]).await.unwrap().len(), 1);
        assert_eq!(overflow.select("SELECT name FROM users", &[]).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_pruning_keeps_last_memory_connection() {
        let config = ConnectionConfig::sqlite(":memory:").with_pool(PoolConfig::new(0, 2, 0));
        let pool = ConnectionPool::new("memory", config, Arc::new(DefaultConnector)).unwrap();

        let first_id = {
            let mut conn = pool.acquire().await.unwrap();
            conn.statement("CREATE TABLE jobs (id INTEGER PRIMARY KEY)", &[])
                .await
                .unwrap();
            conn.id()
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let mut next = pool.acquire().await.unwrap();
        assert_eq!(next.id(), first_id);
        assert!(next.select("SELECT * FROM jobs", &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_warm_opens_min_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warm.db");
        let config = ConnectionConfig::sqlite(path.to_string_lossy()).with_pool(PoolConfig::new(2, 4, 60));
        let pool = ConnectionPool::connect("warm", config, Arc::new(DefaultConnector))
            .await
            .unwrap();

        assert_eq!(pool.idle_count(), 2);
    }

    #[tokio::test]
    async fn test_open_failure_surfaces_and_frees_slot() {
        let config = ConnectionConfig::sqlite(":memory:").with_pool(PoolConfig::new(0, 1, 60));
        let pool = ConnectionPool::new("broken", config, Arc::new(FailingConnector)).unwrap();

        let error = pool.acquire().await.unwrap_err();
        assert!(matches!(error, OrmError::Connection { .. }));

        let stats = pool.stats();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.acquire_errors, 1);
    }

    #[tokio::test]
    async fn test_connection_in_transaction_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let pool = sqlite_pool(&dir, PoolConfig::new(0, 2, 60));

        let mut conn = pool.acquire().await.unwrap();
        conn.begin_transaction().await.unwrap();
        drop(conn);

        assert_eq!(pool.stats().idle, 0);
        assert_eq!(pool.stats().total, 0);
    }
}
