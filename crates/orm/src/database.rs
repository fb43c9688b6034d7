//! Database Manager
//!
//! The runtime context of the ORM: configuration, one lazily created pool per
//! connection name and the per-model registry. Everything that would otherwise
//! be process-wide state hangs off a manager, so two managers are fully
//! isolated from each other.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::DatabaseConfig;
use crate::connection::{ConnectionPool, Connector, DefaultConnector, PooledConnection};
use crate::error::OrmResult;
use crate::observers::ModelRegistry;

pub struct DatabaseManager {
    config: DatabaseConfig,
    connector: Arc<dyn Connector>,
    pools: Mutex<HashMap<String, ConnectionPool>>,
    registry: Arc<ModelRegistry>,
}

impl DatabaseManager {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            connector: Arc::new(DefaultConnector),
            pools: Mutex::new(HashMap::new()),
            registry: Arc::new(ModelRegistry::new()),
        }
    }

    /// Build from `DATABASE_URL` / `DB_*` environment variables.
    pub fn from_env() -> OrmResult<Self> {
        let config = DatabaseConfig::from_env()?;
        Ok(Self::new(config))
    }

    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    /// Share a model registry between managers.
    pub fn with_registry(mut self, registry: Arc<ModelRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn default_connection(&self) -> &str {
        &self.config.default
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// The pool for `name` (default connection when `None`), created and
    /// pre-warmed on first use.
    pub async fn pool(&self, name: Option<&str>) -> OrmResult<ConnectionPool> {
        let name = name.unwrap_or(&self.config.default).to_string();
        if let Some(pool) = self.pools.lock().get(&name) {
            return Ok(pool.clone());
        }

        let config = self.config.connection(Some(&name))?.clone();
        config.validate()?;
        let created = ConnectionPool::new(&name, config, self.connector.clone())?;

        let (pool, inserted) = {
            let mut pools = self.pools.lock();
            match pools.get(&name) {
                Some(existing) => (existing.clone(), false),
                None => {
                    pools.insert(name.clone(), created.clone());
                    (created, true)
                }
            }
        };
        if inserted {
            tracing::debug!(connection = %name, "created connection pool");
            pool.warm().await?;
        }
        Ok(pool)
    }

    /// Check out a connection from the named pool.
    pub async fn connection(&self, name: Option<&str>) -> OrmResult<PooledConnection> {
        self.pool(name).await?.acquire().await
    }

    /// Forget a pool; idle connections close, checked-out ones are dropped on release.
    pub fn disconnect(&self, name: Option<&str>) {
        let name = name.unwrap_or(&self.config.default);
        if let Some(pool) = self.pools.lock().remove(name) {
            pool.flush();
        }
    }
}
