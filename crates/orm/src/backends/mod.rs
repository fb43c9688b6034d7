//! Database Backends
//!
//! One [`DatabaseHandle`] implementation per supported driver, plus
//! [`open_handle`] which picks the implementation from a connection's config.

pub mod core;
pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use self::core::{DatabaseHandle, DatabaseValue, ExecOutcome, Row, SqlDialect};
pub use self::mysql::MySqlHandle;
pub use self::postgres::PostgresHandle;
pub use self::sqlite::SqliteHandle;

use crate::config::{ConnectionConfig, Driver};
use crate::error::{OrmError, OrmResult};

/// Open a physical handle for the configured driver.
pub async fn open_handle(name: &str, config: &ConnectionConfig) -> OrmResult<Box<dyn DatabaseHandle>> {
    let driver = config.driver()?;
    let dsn = config.dsn()?;
    let failed = |e: sqlx::Error| OrmError::connection(name, e.to_string());

    let handle: Box<dyn DatabaseHandle> = match driver {
        Driver::Sqlite => Box::new(SqliteHandle::connect(&dsn).await.map_err(failed)?),
        Driver::MySql => Box::new(MySqlHandle::connect(&dsn).await.map_err(failed)?),
        Driver::Postgres => {
            let mut handle = PostgresHandle::connect(&dsn).await.map_err(failed)?;
            let charset = config.charset()?;
            handle
                .execute_unprepared(&format!("SET NAMES '{}'", charset.replace('\'', "")))
                .await
                .map_err(failed)?;
            Box::new(handle)
        }
    };
    Ok(handle)
}

pub(crate) fn format_datetime(value: chrono::NaiveDateTime) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub(crate) fn format_date(value: chrono::NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

pub(crate) fn format_time(value: chrono::NaiveTime) -> String {
    value.format("%H:%M:%S").to_string()
}
