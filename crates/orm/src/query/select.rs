//! Query Builder SELECT operations

use serde_json::Value;

use super::builder::QueryBuilder;
use super::types::SelectColumn;

impl<T> QueryBuilder<T> {
    /// Replace the projection with a comma separated column list; `"*"`
    /// restores the wildcard.
    pub fn select(mut self, fields: &str) -> Self {
        self.columns.clear();
        self.add_select(fields)
    }

    /// Append columns to the projection
    pub fn add_select(mut self, fields: &str) -> Self {
        if fields.trim() == "*" {
            return self;
        }
        self.columns.extend(
            fields
                .split(',')
                .map(|f| f.trim())
                .filter(|f| !f.is_empty())
                .map(|f| SelectColumn::Name(f.to_string())),
        );
        self
    }

    /// Append a raw projection expression with its own bindings
    pub fn select_raw(mut self, sql: &str, bindings: Vec<Value>) -> Self {
        self.columns.push(SelectColumn::Raw {
            sql: sql.to_string(),
            bindings,
        });
        self
    }

    /// Add SELECT DISTINCT to the query
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn select_distinct(self, fields: &str) -> Self {
        self.select(fields).distinct()
    }
}
