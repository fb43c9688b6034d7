//! Core Database Backend Traits
//!
//! One physical handle per [`DatabaseHandle`]; the three sqlx backends implement
//! it and the [`Connection`](crate::connection::Connection) drives it. Values are
//! coerced into a [`DatabaseValue`] before binding so no backend has to guess a
//! parameter type.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// A materialized result row, columns in select order
pub type Row = serde_json::Map<String, JsonValue>;

/// Outcome of a non-query statement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
}

/// Abstract physical database handle
#[async_trait]
pub trait DatabaseHandle: Send {
    /// Execute a statement and return the affected row count
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> Result<ExecOutcome, sqlx::Error>;

    /// Execute a query and return every result row
    async fn fetch_all(&mut self, sql: &str, params: &[DatabaseValue]) -> Result<Vec<Row>, sqlx::Error>;

    /// Run a parameterless statement outside the prepared-statement path
    /// (transaction control, session settings)
    async fn execute_unprepared(&mut self, sql: &str) -> Result<(), sqlx::Error>;

    fn dialect(&self) -> SqlDialect;

    /// Close the handle gracefully
    async fn close(self: Box<Self>) -> Result<(), sqlx::Error>;
}

/// Database value enumeration for type-safe parameter binding
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Json(JsonValue),
}

impl DatabaseValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            DatabaseValue::Null => JsonValue::Null,
            DatabaseValue::Bool(b) => JsonValue::Bool(*b),
            DatabaseValue::Int(i) => JsonValue::from(*i),
            DatabaseValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            DatabaseValue::String(s) => JsonValue::String(s.clone()),
            DatabaseValue::Bytes(b) => JsonValue::Array(b.iter().map(|&x| JsonValue::from(x)).collect()),
            DatabaseValue::Json(j) => j.clone(),
        }
    }

    /// Explicit coercion from a binding value: integers stay integers, booleans
    /// stay booleans, null stays null, composite values travel as JSON.
    pub fn from_json(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => DatabaseValue::Null,
            JsonValue::Bool(b) => DatabaseValue::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    DatabaseValue::Int(i)
                } else if let Some(f) = n.as_f64() {
                    DatabaseValue::Float(f)
                } else {
                    DatabaseValue::String(n.to_string())
                }
            }
            JsonValue::String(s) => DatabaseValue::String(s.clone()),
            JsonValue::Array(_) | JsonValue::Object(_) => DatabaseValue::Json(json.clone()),
        }
    }

    /// JSON text for backends without a native JSON parameter type.
    pub(crate) fn json_text(value: &JsonValue) -> String {
        serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
    }
}

impl From<bool> for DatabaseValue {
    fn from(value: bool) -> Self {
        DatabaseValue::Bool(value)
    }
}

impl From<i64> for DatabaseValue {
    fn from(value: i64) -> Self {
        DatabaseValue::Int(value)
    }
}

impl From<f64> for DatabaseValue {
    fn from(value: f64) -> Self {
        DatabaseValue::Float(value)
    }
}

impl From<String> for DatabaseValue {
    fn from(value: String) -> Self {
        DatabaseValue::String(value)
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::String(value.to_string())
    }
}

impl From<Vec<u8>> for DatabaseValue {
    fn from(value: Vec<u8>) -> Self {
        DatabaseValue::Bytes(value)
    }
}

impl From<&JsonValue> for DatabaseValue {
    fn from(value: &JsonValue) -> Self {
        DatabaseValue::from_json(value)
    }
}

/// SQL dialect enumeration for generating database-specific SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SqlDialect {
    PostgreSQL,
    #[default]
    MySQL,
    SQLite,
}

impl SqlDialect {
    /// Get the parameter placeholder style for this dialect
    pub fn parameter_placeholder(&self, index: usize) -> String {
        match self {
            SqlDialect::PostgreSQL => format!("${}", index + 1),
            SqlDialect::MySQL | SqlDialect::SQLite => "?".to_string(),
        }
    }

    /// Whether an inserted id has to be read back with `RETURNING`
    pub fn uses_returning(&self) -> bool {
        matches!(self, SqlDialect::PostgreSQL)
    }

    /// LIMIT value standing in for "no limit" when only an offset is set
    pub fn unbounded_limit(&self) -> Option<&'static str> {
        match self {
            SqlDialect::MySQL => Some("18446744073709551615"),
            SqlDialect::SQLite => Some("-1"),
            SqlDialect::PostgreSQL => None,
        }
    }
}
