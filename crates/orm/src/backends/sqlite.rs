//! SQLite backend (single-file embedded engine)

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnection, SqliteRow};
use sqlx::{Column, Connection as _, Executor, Row as _, Sqlite, TypeInfo, ValueRef};

use super::core::{DatabaseHandle, DatabaseValue, ExecOutcome, Row, SqlDialect};

pub struct SqliteHandle {
    conn: SqliteConnection,
}

impl SqliteHandle {
    pub async fn connect(dsn: &str) -> Result<Self, sqlx::Error> {
        Ok(Self {
            conn: SqliteConnection::connect(dsn).await?,
        })
    }
}

#[async_trait]
impl DatabaseHandle for SqliteHandle {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> Result<ExecOutcome, sqlx::Error> {
        let query = params.iter().fold(sqlx::query(sql), bind_database_value);
        let result = query.execute(&mut self.conn).await?;
        Ok(ExecOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id: Some(result.last_insert_rowid()),
        })
    }

    async fn fetch_all(&mut self, sql: &str, params: &[DatabaseValue]) -> Result<Vec<Row>, sqlx::Error> {
        let query = params.iter().fold(sqlx::query(sql), bind_database_value);
        let rows = query.fetch_all(&mut self.conn).await?;
        rows.iter().map(sqlite_row_to_map).collect()
    }

    async fn execute_unprepared(&mut self, sql: &str) -> Result<(), sqlx::Error> {
        (&mut self.conn).execute(sql).await?;
        Ok(())
    }

    fn dialect(&self) -> SqlDialect {
        SqlDialect::SQLite
    }

    async fn close(self: Box<Self>) -> Result<(), sqlx::Error> {
        let handle = *self;
        handle.conn.close().await
    }
}

fn bind_database_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &DatabaseValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        DatabaseValue::Null => query.bind(Option::<String>::None),
        DatabaseValue::Bool(b) => query.bind(*b),
        DatabaseValue::Int(i) => query.bind(*i),
        DatabaseValue::Float(f) => query.bind(*f),
        DatabaseValue::String(s) => query.bind(s.clone()),
        DatabaseValue::Bytes(b) => query.bind(b.clone()),
        DatabaseValue::Json(j) => query.bind(DatabaseValue::json_text(j)),
    }
}

fn sqlite_row_to_map(row: &SqliteRow) -> Result<Row, sqlx::Error> {
    let mut map = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), sqlite_value(row, index)?);
    }
    Ok(map)
}

/// SQLite is dynamically typed, so decoding follows the storage class of the
/// value rather than the declared column type.
fn sqlite_value(row: &SqliteRow, index: usize) -> Result<JsonValue, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(JsonValue::Null);
    }
    let type_name = raw.type_info().name().to_uppercase();

    let value = match type_name.as_str() {
        "INTEGER" | "INT" | "BIGINT" | "INT8" => JsonValue::from(row.try_get_unchecked::<i64, _>(index)?),
        "BOOLEAN" => JsonValue::Bool(row.try_get_unchecked::<bool, _>(index)?),
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
            let value: f64 = row.try_get_unchecked(index)?;
            serde_json::Number::from_f64(value)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null)
        }
        "BLOB" => {
            let bytes: Vec<u8> = row.try_get_unchecked(index)?;
            JsonValue::Array(bytes.into_iter().map(JsonValue::from).collect())
        }
        _ => JsonValue::String(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(value)
}
