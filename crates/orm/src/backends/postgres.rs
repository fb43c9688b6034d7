//! PostgreSQL backend (second relational server variant)

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgConnection, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Connection as _, Executor, Postgres, Row as _, TypeInfo, ValueRef};

use super::core::{DatabaseHandle, DatabaseValue, ExecOutcome, Row, SqlDialect};
use super::{format_date, format_datetime, format_time};

pub struct PostgresHandle {
    conn: PgConnection,
}

impl PostgresHandle {
    pub async fn connect(dsn: &str) -> Result<Self, sqlx::Error> {
        Ok(Self {
            conn: PgConnection::connect(dsn).await?,
        })
    }
}

#[async_trait]
impl DatabaseHandle for PostgresHandle {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> Result<ExecOutcome, sqlx::Error> {
        let sql = numbered_placeholders(sql);
        let query = params.iter().fold(sqlx::query(&sql), bind_database_value);
        let result = query.execute(&mut self.conn).await?;
        Ok(ExecOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id: None,
        })
    }

    async fn fetch_all(&mut self, sql: &str, params: &[DatabaseValue]) -> Result<Vec<Row>, sqlx::Error> {
        let sql = numbered_placeholders(sql);
        let query = params.iter().fold(sqlx::query(&sql), bind_database_value);
        let rows = query.fetch_all(&mut self.conn).await?;
        rows.iter().map(postgres_row_to_map).collect()
    }

    async fn execute_unprepared(&mut self, sql: &str) -> Result<(), sqlx::Error> {
        (&mut self.conn).execute(sql).await?;
        Ok(())
    }

    fn dialect(&self) -> SqlDialect {
        SqlDialect::PostgreSQL
    }

    async fn close(self: Box<Self>) -> Result<(), sqlx::Error> {
        let handle = *self;
        handle.conn.close().await
    }
}

/// Rewrite positional `?` markers as `$1, $2, ...`, leaving quoted literals
/// and identifiers untouched.
pub fn numbered_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut index = 0;
    let mut quote: Option<char> = None;

    for ch in sql.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
                out.push(ch);
            }
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    out.push(ch);
                }
                '?' => {
                    index += 1;
                    out.push('$');
                    out.push_str(&index.to_string());
                }
                _ => out.push(ch),
            },
        }
    }
    out
}

fn bind_database_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &DatabaseValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        DatabaseValue::Null => query.bind(Option::<String>::None),
        DatabaseValue::Bool(b) => query.bind(*b),
        DatabaseValue::Int(i) => query.bind(*i),
        DatabaseValue::Float(f) => query.bind(*f),
        DatabaseValue::String(s) => query.bind(s.clone()),
        DatabaseValue::Bytes(b) => query.bind(b.clone()),
        DatabaseValue::Json(j) => query.bind(sqlx::types::Json(j.clone())),
    }
}

fn postgres_row_to_map(row: &PgRow) -> Result<Row, sqlx::Error> {
    let mut map = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), postgres_value(row, index)?);
    }
    Ok(map)
}

fn postgres_value(row: &PgRow, index: usize) -> Result<JsonValue, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(JsonValue::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let value = match type_name.as_str() {
        "BOOL" => JsonValue::Bool(row.try_get::<bool, _>(index)?),
        "INT2" => JsonValue::from(row.try_get::<i16, _>(index)?),
        "INT4" => JsonValue::from(row.try_get::<i32, _>(index)?),
        "INT8" => JsonValue::from(row.try_get::<i64, _>(index)?),
        "FLOAT4" => float_json(f64::from(row.try_get::<f32, _>(index)?)),
        "FLOAT8" => float_json(row.try_get::<f64, _>(index)?),
        "NUMERIC" => JsonValue::String(row.try_get::<Decimal, _>(index)?.to_string()),
        "UUID" => JsonValue::String(row.try_get::<uuid::Uuid, _>(index)?.to_string()),
        "TIMESTAMPTZ" => JsonValue::String(
            row.try_get::<chrono::DateTime<chrono::Utc>, _>(index)?
                .to_rfc3339(),
        ),
        "TIMESTAMP" => JsonValue::String(format_datetime(row.try_get::<chrono::NaiveDateTime, _>(index)?)),
        "DATE" => JsonValue::String(format_date(row.try_get::<chrono::NaiveDate, _>(index)?)),
        "TIME" => JsonValue::String(format_time(row.try_get::<chrono::NaiveTime, _>(index)?)),
        "JSON" | "JSONB" => row.try_get::<JsonValue, _>(index)?,
        "BYTEA" => {
            let bytes: Vec<u8> = row.try_get(index)?;
            JsonValue::Array(bytes.into_iter().map(JsonValue::from).collect())
        }
        _ => JsonValue::String(row.try_get::<String, _>(index)?),
    };
    Ok(value)
}

fn float_json(value: f64) -> JsonValue {
    serde_json::Number::from_f64(value)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}
