//! Connection Management
//!
//! A [`Connection`] wraps one physical handle; the [`ConnectionPool`] hands
//! connections out and takes them back.

pub mod core;
pub mod pool;

#[cfg(test)]
pub(crate) mod testing;

pub use self::core::{Connection, ConnectionId, QueryLogEntry};
pub use self::pool::{ConnectionPool, Connector, DefaultConnector, PoolStats, PooledConnection};
