//! # astra-orm: Eloquent-style data access for Rust
//!
//! Connection pooling, a fluent SQL query builder with positional bindings,
//! active-record models with dirty tracking and lifecycle events, and an
//! ordered keyed collection for post-processing result sets.
//!
//! Everything runs through a [`DatabaseManager`]: it owns the configuration,
//! one pool per named connection and the [`ModelRegistry`] holding per-model
//! boot state and listeners.

pub mod backends;
pub mod collection;
pub mod config;
pub mod connection;
pub mod database;
pub mod error;
pub mod event_error;
pub mod events;
pub mod logging;
pub mod model;
pub mod observers;
pub mod query;


#[cfg(test)]
mod transaction_tests;

pub use backends::{DatabaseHandle, DatabaseValue, Row, SqlDialect};
pub use collection::{Arrayable, Collection, Key, Retriever};
pub use config::{ConnectionConfig, DatabaseConfig, Driver, PoolConfig};
pub use connection::{Connection, ConnectionPool, Connector, PoolStats, PooledConnection, QueryLogEntry};
pub use database::DatabaseManager;
pub use error::{OrmError, OrmResult};
pub use event_error::EventError;
pub use events::{ModelEvent, ModelObserver};
pub use logging::{init_logging, LoggingConfig};
pub use model::{CastType, Model, Record};
pub use observers::{ModelMeta, ModelRegistry};
pub use query::{Hydrate, JoinClause, JoinType, OrderDirection, QueryBuilder, QueryOperator};
