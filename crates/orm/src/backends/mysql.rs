//! MySQL backend (relational server with host/port)

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlArguments, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Connection as _, Executor, MySql, Row as _, TypeInfo, ValueRef};

use super::core::{DatabaseHandle, DatabaseValue, ExecOutcome, Row, SqlDialect};
use super::{format_date, format_datetime, format_time};

pub struct MySqlHandle {
    conn: MySqlConnection,
}

impl MySqlHandle {
    pub async fn connect(dsn: &str) -> Result<Self, sqlx::Error> {
        Ok(Self {
            conn: MySqlConnection::connect(dsn).await?,
        })
    }
}

#[async_trait]
impl DatabaseHandle for MySqlHandle {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> Result<ExecOutcome, sqlx::Error> {
        let query = params.iter().fold(sqlx::query(sql), bind_database_value);
        let result = query.execute(&mut self.conn).await?;
        let last_insert_id = i64::try_from(result.last_insert_id()).ok().filter(|id| *id > 0);
        Ok(ExecOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id,
        })
    }

    async fn fetch_all(&mut self, sql: &str, params: &[DatabaseValue]) -> Result<Vec<Row>, sqlx::Error> {
        let query = params.iter().fold(sqlx::query(sql), bind_database_value);
        let rows = query.fetch_all(&mut self.conn).await?;
        rows.iter().map(mysql_row_to_map).collect()
    }

    async fn execute_unprepared(&mut self, sql: &str) -> Result<(), sqlx::Error> {
        (&mut self.conn).execute(sql).await?;
        Ok(())
    }

    fn dialect(&self) -> SqlDialect {
        SqlDialect::MySQL
    }

    async fn close(self: Box<Self>) -> Result<(), sqlx::Error> {
        let handle = *self;
        handle.conn.close().await
    }
}

fn bind_database_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &DatabaseValue,
) -> Query<'q, MySql, MySqlArguments> {
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

fn mysql_row_to_map(row: &MySqlRow) -> Result<Row, sqlx::Error> {
    let mut map = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), mysql_value(row, index)?);
    }
    Ok(map)
}

fn mysql_value(row: &MySqlRow, index: usize) -> Result<JsonValue, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(JsonValue::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let value = match type_name.as_str() {
        "BOOLEAN" => JsonValue::Bool(row.try_get_unchecked::<bool, _>(index)?),
        name if name.ends_with("UNSIGNED") => JsonValue::from(row.try_get_unchecked::<u64, _>(index)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            JsonValue::from(row.try_get_unchecked::<i64, _>(index)?)
        }
        "FLOAT" => float_json(f64::from(row.try_get_unchecked::<f32, _>(index)?)),
        "DOUBLE" => float_json(row.try_get_unchecked::<f64, _>(index)?),
        "DECIMAL" => JsonValue::String(row.try_get_unchecked::<Decimal, _>(index)?.to_string()),
        "DATETIME" | "TIMESTAMP" => {
            JsonValue::String(format_datetime(row.try_get_unchecked::<chrono::NaiveDateTime, _>(index)?))
        }
        "DATE" => JsonValue::String(format_date(row.try_get_unchecked::<chrono::NaiveDate, _>(index)?)),
        "TIME" => JsonValue::String(format_time(row.try_get_unchecked::<chrono::NaiveTime, _>(index)?)),
        "JSON" => row.try_get_unchecked::<JsonValue, _>(index)?,
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => {
            let bytes: Vec<u8> = row.try_get_unchecked(index)?;
            match String::from_utf8(bytes) {
                Ok(text) => JsonValue::String(text),
                Err(e) => JsonValue::Array(e.into_bytes().into_iter().map(JsonValue::from).collect()),
            }
        }
        _ => JsonValue::String(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(value)
}

fn float_json(value: f64) -> JsonValue {
    serde_json::Number::from_f64(value)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}
