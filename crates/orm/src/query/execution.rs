//! Query Builder execution
//!
//! Every method comes in two forms: one that checks a connection out of the
//! [`DatabaseManager`] for the duration of the call, and an `_on` form that
//! runs on a connection the caller already holds (inside a transaction, for
//! instance). Execution always compiles with the connection's dialect.

use serde_json::Value;

use crate::backends::{Row, SqlDialect};
use crate::collection::Collection;
use crate::connection::{Connection, PooledConnection};
use crate::database::DatabaseManager;
use crate::error::{OrmError, OrmResult};

use super::builder::QueryBuilder;
use super::sql_generation::CompiledQuery;
use super::types::{OrderClause, OrderDirection, SelectColumn};

/// Turns one raw row into a result item
pub trait Hydrate: Sized + Send {
    fn hydrate(row: Row) -> OrmResult<Self>;

    /// Column used by `find` and as the default `chunk` order
    fn key_name() -> &'static str {
        "id"
    }
}

impl Hydrate for Row {
    fn hydrate(row: Row) -> OrmResult<Self> {
        Ok(row)
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(s.as_str(), "1" | "t" | "true"),
        _ => false,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

impl<T> QueryBuilder<T> {
    pub(crate) fn ensure_table(&self) -> OrmResult<&str> {
        self.table
            .as_deref()
            .ok_or_else(|| OrmError::configuration("query builder has no table"))
    }

    pub(crate) async fn checkout(&self, db: &DatabaseManager) -> OrmResult<PooledConnection> {
        self.ensure_table()?;
        db.connection(self.connection.as_deref()).await
    }

    /// Raw rows, regardless of the hydration target
    pub(crate) async fn fetch_rows(&self, conn: &mut Connection) -> OrmResult<Vec<Row>> {
        self.ensure_table()?;
        let compiled = self.compile_select(conn.dialect());
        conn.select(&compiled.sql, &compiled.bindings).await
    }

    /// Compile `FUNCTION(column) AS aggregate` over this query, leaving the
    /// builder as it was.
    ///
    /// Ordering is dropped. Without GROUP BY the aggregate is a single row,
    /// so limit and offset are dropped too.
    pub(crate) fn compile_aggregate(&mut self, dialect: SqlDialect, function: &str, column: &str) -> CompiledQuery {
        let expression = SelectColumn::Name(format!("{}({}) AS aggregate", function, column));
        let columns = std::mem::replace(&mut self.columns, vec![expression]);
        let orders = std::mem::take(&mut self.orders);
        let (limit, offset) = if self.groups.is_empty() {
            (self.limit.take(), self.offset.take())
        } else {
            (self.limit, self.offset)
        };

        let compiled = self.compile_select(dialect);

        self.columns = columns;
        self.orders = orders;
        self.limit = limit;
        self.offset = offset;
        compiled
    }

    async fn aggregate_on(&mut self, conn: &mut Connection, function: &str, column: &str) -> OrmResult<Option<Value>> {
        self.ensure_table()?;
        let compiled = self.compile_aggregate(conn.dialect(), function, column);

        let row = conn.select_one(&compiled.sql, &compiled.bindings).await?;
        Ok(row
            .and_then(|row| row.into_iter().next().map(|(_, value)| value))
            .filter(|value| !value.is_null()))
    }

    async fn aggregate(&mut self, db: &DatabaseManager, function: &str, column: &str) -> OrmResult<Option<Value>> {
        let mut conn = self.checkout(db).await?;
        self.aggregate_on(&mut conn, function, column).await
    }

    /// `COUNT(*)`; the builder's projection is left as it was.
    pub async fn count(&mut self, db: &DatabaseManager) -> OrmResult<i64> {
        let mut conn = self.checkout(db).await?;
        self.count_on(&mut conn).await
    }

    pub async fn count_on(&mut self, conn: &mut Connection) -> OrmResult<i64> {
        let value = self.aggregate_on(conn, "COUNT", "*").await?;
        Ok(value.as_ref().and_then(number).map_or(0, |n| n as i64))
    }

    pub async fn min(&mut self, db: &DatabaseManager, column: &str) -> OrmResult<Option<Value>> {
        self.aggregate(db, "MIN", column).await
    }

    pub async fn max(&mut self, db: &DatabaseManager, column: &str) -> OrmResult<Option<Value>> {
        self.aggregate(db, "MAX", column).await
    }

    /// `None` when no row contributes a value.
    pub async fn sum(&mut self, db: &DatabaseManager, column: &str) -> OrmResult<Option<f64>> {
        Ok(self.aggregate(db, "SUM", column).await?.as_ref().and_then(number))
    }

    pub async fn avg(&mut self, db: &DatabaseManager, column: &str) -> OrmResult<Option<f64>> {
        Ok(self.aggregate(db, "AVG", column).await?.as_ref().and_then(number))
    }

    pub async fn exists(&self, db: &DatabaseManager) -> OrmResult<bool> {
        let mut conn = self.checkout(db).await?;
        self.exists_on(&mut conn).await
    }

    pub async fn exists_on(&self, conn: &mut Connection) -> OrmResult<bool> {
        self.ensure_table()?;
        let compiled = self.compile_exists(conn.dialect());
        let row = conn.select_one(&compiled.sql, &compiled.bindings).await?;
        Ok(row.and_then(|row| row.values().next().map(truthy)).unwrap_or(false))
    }

    pub async fn doesnt_exist(&self, db: &DatabaseManager) -> OrmResult<bool> {
        Ok(!self.exists(db).await?)
    }

    /// A single column of the first matching row
    pub async fn value(&self, db: &DatabaseManager, column: &str) -> OrmResult<Option<Value>> {
        let mut conn = self.checkout(db).await?;
        let rows = self.clone().select(column).limit(1).fetch_rows(&mut conn).await?;
        let key = column.rsplit('.').next().unwrap_or(column);
        Ok(rows.into_iter().next().and_then(|mut row| row.remove(key)))
    }

    /// One column of every matching row, re-indexed
    pub async fn pluck(&self, db: &DatabaseManager, column: &str) -> OrmResult<Collection<Value>> {
        let mut conn = self.checkout(db).await?;
        let rows = self.clone().select(column).fetch_rows(&mut conn).await?;
        let key = column.rsplit('.').next().unwrap_or(column);
        Ok(rows
            .into_iter()
            .map(|mut row| row.remove(key).unwrap_or(Value::Null))
            .collect())
    }
}

impl<T: Hydrate> QueryBuilder<T> {
    pub async fn get(&self, db: &DatabaseManager) -> OrmResult<Collection<T>> {
        let mut conn = self.checkout(db).await?;
        self.get_on(&mut conn).await
    }

    pub async fn get_on(&self, conn: &mut Connection) -> OrmResult<Collection<T>> {
        self.fetch_rows(conn)
            .await?
            .into_iter()
            .map(T::hydrate)
            .collect::<OrmResult<Vec<T>>>()
            .map(Collection::from_vec)
    }

    pub async fn first(&self, db: &DatabaseManager) -> OrmResult<Option<T>> {
        let mut conn = self.checkout(db).await?;
        self.first_on(&mut conn).await
    }

    pub async fn first_on(&self, conn: &mut Connection) -> OrmResult<Option<T>> {
        let rows = self.clone().limit(1).fetch_rows(conn).await?;
        rows.into_iter().next().map(T::hydrate).transpose()
    }

    /// Like [`first`](Self::first), but no match is [`OrmError::NotFound`].
    pub async fn first_or_fail(&self, db: &DatabaseManager) -> OrmResult<T> {
        match self.first(db).await? {
            Some(item) => Ok(item),
            None => Err(OrmError::NotFound {
                table: self.ensure_table()?.to_string(),
            }),
        }
    }

    /// Match on the key column
    pub async fn find(&self, db: &DatabaseManager, id: impl Into<Value>) -> OrmResult<Option<T>> {
        self.clone().where_eq(T::key_name(), id).first(db).await
    }

    pub async fn find_on(&self, conn: &mut Connection, id: impl Into<Value>) -> OrmResult<Option<T>> {
        self.clone().where_eq(T::key_name(), id).first_on(conn).await
    }

    /// Fetch `size` rows at a time and hand each page to `callback` until a
    /// short page or the callback returns `false`. Unordered queries are
    /// ordered by the key column so pages do not overlap.
    ///
    /// Returns `false` when the callback stopped the walk.
    pub async fn chunk<F>(&self, db: &DatabaseManager, size: u64, mut callback: F) -> OrmResult<bool>
    where
        F: FnMut(Collection<T>) -> OrmResult<bool>,
    {
        if size == 0 {
            return Ok(true);
        }
        let mut conn = self.checkout(db).await?;

        let mut base = self.clone();
        if base.orders.is_empty() {
            base.orders.push(OrderClause::Column {
                column: T::key_name().to_string(),
                direction: OrderDirection::Asc,
            });
        }

        let mut page = 1;
        loop {
            let results = base.clone().for_page(page, size).get_on(&mut conn).await?;
            let fetched = results.len() as u64;
            if fetched == 0 {
                return Ok(true);
            }
            if !callback(results)? {
                return Ok(false);
            }
            if fetched < size {
                return Ok(true);
            }
            page += 1;
        }
    }
}
