//! Error types for the ORM system
//!
//! Every failure that leaves the data-access core is an [`OrmError`]. Execution
//! failures keep the SQL text and bindings that caused them.

use serde_json::Value;
use thiserror::Error;

use crate::event_error::EventError;

/// ORM result type alias
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for ORM operations
#[derive(Debug, Clone, Error)]
pub enum OrmError {
    /// Unknown driver, missing connection entry or an invalid setting
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A physical connection could not be opened or closed
    #[error("Connection error [{connection}]: {message}")]
    Connection { connection: String, message: String },

    /// A statement failed to execute
    #[error("Query error: {message} (SQL: {sql})")]
    Query {
        sql: String,
        bindings: Vec<Value>,
        message: String,
    },

    /// A fail-fast model lookup found nothing
    #[error("No query results for model [{model}] {key}")]
    ModelNotFound { model: String, key: String },

    /// A fail-fast query lookup found nothing
    #[error("Record not found in table '{table}'")]
    NotFound { table: String },

    /// The model has no primary key configured or no key value set
    #[error("Model [{model}] has no primary key")]
    MissingPrimaryKey { model: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Event error: {0}")]
    Event(#[from] EventError),
}

impl OrmError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn connection(connection: &str, message: impl Into<String>) -> Self {
        Self::Connection {
            connection: connection.to_string(),
            message: message.into(),
        }
    }

    /// Wrap a driver failure together with the statement that produced it.
    pub fn query(sql: &str, bindings: &[Value], source: impl std::fmt::Display) -> Self {
        Self::Query {
            sql: sql.to_string(),
            bindings: bindings.to_vec(),
            message: source.to_string(),
        }
    }

    /// SQL text attached to an execution error.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Query { sql, .. } => Some(sql),
            _ => None,
        }
    }

    /// True for the "fail fast" lookup errors, which differ from an empty result.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ModelNotFound { .. } | Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        OrmError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_error_keeps_sql_and_bindings() {
        let error = OrmError::query("SELECT * FROM nope WHERE id = ?", &[json!(7)], "no such table: nope");

        assert_eq!(error.sql(), Some("SELECT * FROM nope WHERE id = ?"));
        match &error {
            OrmError::Query { bindings, message, .. } => {
                assert_eq!(bindings, &vec![json!(7)]);
                assert_eq!(message, "no such table: nope");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(error.to_string().contains("SELECT * FROM nope"));
    }

    #[test]
    fn test_not_found_is_distinguishable() {
        let error = OrmError::ModelNotFound {
            model: "User".into(),
            key: "42".into(),
        };
        assert!(error.is_not_found());
        assert!(!OrmError::configuration("bad").is_not_found());
    }
}
