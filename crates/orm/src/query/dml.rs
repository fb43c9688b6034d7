//! Query Builder write operations: INSERT, UPDATE, DELETE, TRUNCATE

use serde_json::Value;

use crate::backends::Row;
use crate::connection::Connection;
use crate::database::DatabaseManager;
use crate::error::OrmResult;

use super::builder::QueryBuilder;
use super::types::Assignment;

impl<T> QueryBuilder<T> {
    pub async fn insert(&self, db: &DatabaseManager, row: Row) -> OrmResult<bool> {
        self.insert_many(db, vec![row]).await
    }

    /// One multi-row INSERT. No rows is a successful no-op.
    pub async fn insert_many(&self, db: &DatabaseManager, rows: Vec<Row>) -> OrmResult<bool> {
        if rows.is_empty() {
            return Ok(true);
        }
        let mut conn = self.checkout(db).await?;
        self.insert_many_on(&mut conn, rows).await
    }

    pub async fn insert_many_on(&self, conn: &mut Connection, rows: Vec<Row>) -> OrmResult<bool> {
        if rows.is_empty() {
            return Ok(true);
        }
        self.ensure_table()?;
        let compiled = self.compile_insert(&rows, conn.dialect());
        conn.insert(&compiled.sql, &compiled.bindings).await
    }

    /// Insert one row and return the generated value of `key`.
    pub async fn insert_get_id(&self, db: &DatabaseManager, row: Row, key: &str) -> OrmResult<Option<i64>> {
        let mut conn = self.checkout(db).await?;
        self.insert_get_id_on(&mut conn, row, key).await
    }

    pub async fn insert_get_id_on(&self, conn: &mut Connection, row: Row, key: &str) -> OrmResult<Option<i64>> {
        self.ensure_table()?;
        let compiled = self.compile_insert_get_id(&row, key, conn.dialect());
        conn.insert_get_id(&compiled.sql, &compiled.bindings).await
    }

    /// UPDATE the matching rows; returns the affected-row count.
    ///
    /// Joins are not part of the compiled statement.
    pub async fn update(&self, db: &DatabaseManager, values: Row) -> OrmResult<u64> {
        if values.is_empty() {
            return Ok(0);
        }
        let mut conn = self.checkout(db).await?;
        self.update_on(&mut conn, values).await
    }

    pub async fn update_on(&self, conn: &mut Connection, values: Row) -> OrmResult<u64> {
        let assignments: Vec<(String, Assignment)> = values
            .into_iter()
            .map(|(column, value)| (column, Assignment::Value(value)))
            .collect();
        self.update_assignments_on(conn, assignments).await
    }

    pub(crate) async fn update_assignments_on(
        &self,
        conn: &mut Connection,
        assignments: Vec<(String, Assignment)>,
    ) -> OrmResult<u64> {
        if assignments.is_empty() {
            return Ok(0);
        }
        self.ensure_table()?;
        let compiled = self.compile_update(&assignments, conn.dialect());
        conn.update(&compiled.sql, &compiled.bindings).await
    }

    /// `column = column + amount`
    pub async fn increment(&self, db: &DatabaseManager, column: &str, amount: impl Into<Value>) -> OrmResult<u64> {
        self.step(db, column, "+", amount.into(), Row::new()).await
    }

    /// `column = column - amount`
    pub async fn decrement(&self, db: &DatabaseManager, column: &str, amount: impl Into<Value>) -> OrmResult<u64> {
        self.step(db, column, "-", amount.into(), Row::new()).await
    }

    /// Increment and set `extra` columns in the same statement.
    pub async fn increment_with(
        &self,
        db: &DatabaseManager,
        column: &str,
        amount: impl Into<Value>,
        extra: Row,
    ) -> OrmResult<u64> {
        self.step(db, column, "+", amount.into(), extra).await
    }

    async fn step(&self, db: &DatabaseManager, column: &str, sign: &str, amount: Value, extra: Row) -> OrmResult<u64> {
        let mut assignments = vec![(
            column.to_string(),
            Assignment::Raw {
                sql: format!("{} {} ?", column, sign),
                bindings: vec![amount],
            },
        )];
        assignments.extend(extra.into_iter().map(|(c, v)| (c, Assignment::Value(v))));

        let mut conn = self.checkout(db).await?;
        self.update_assignments_on(&mut conn, assignments).await
    }

    /// DELETE the matching rows; returns the affected-row count.
    pub async fn delete(&self, db: &DatabaseManager) -> OrmResult<u64> {
        let mut conn = self.checkout(db).await?;
        self.delete_on(&mut conn).await
    }

    pub async fn delete_on(&self, conn: &mut Connection) -> OrmResult<u64> {
        self.ensure_table()?;
        let compiled = self.compile_delete(conn.dialect());
        conn.delete(&compiled.sql, &compiled.bindings).await
    }

    /// Remove every row. SQLite has no TRUNCATE, so it runs an
    /// unconditional DELETE.
    pub async fn truncate(&self, db: &DatabaseManager) -> OrmResult<bool> {
        let mut conn = self.checkout(db).await?;
        let sql = self.compile_truncate(conn.dialect());
        conn.statement(&sql, &[]).await
    }
}
