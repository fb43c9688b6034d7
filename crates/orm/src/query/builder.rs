//! Query Builder - Core builder implementation

use std::marker::PhantomData;

use crate::backends::{Row, SqlDialect};

use super::joins::JoinClause;
use super::types::*;

/// Fluent SQL query builder.
///
/// The builder is plain data; execution borrows a
/// [`DatabaseManager`](crate::DatabaseManager). `T` is the type each row
/// hydrates into: raw rows by default, `Record<M>` for model queries.
#[derive(Debug)]
pub struct QueryBuilder<T = Row> {
    pub(crate) table: Option<String>,
    pub(crate) columns: Vec<SelectColumn>,
    pub(crate) distinct: bool,
    pub(crate) joins: Vec<JoinClause>,
    pub(crate) wheres: Vec<WhereNode>,
    pub(crate) groups: Vec<String>,
    pub(crate) havings: Vec<WhereNode>,
    pub(crate) orders: Vec<OrderClause>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) dialect: SqlDialect,
    pub(crate) connection: Option<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for QueryBuilder<T> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            columns: self.columns.clone(),
            distinct: self.distinct,
            joins: self.joins.clone(),
            wheres: self.wheres.clone(),
            groups: self.groups.clone(),
            havings: self.havings.clone(),
            orders: self.orders.clone(),
            limit: self.limit,
            offset: self.offset,
            dialect: self.dialect,
            connection: self.connection.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> Default for QueryBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    /// Start a raw-row query against `table`.
    pub fn table(table: impl Into<String>) -> Self {
        Self::new().from(table)
    }
}

impl<T> QueryBuilder<T> {
    /// Create a new query builder
    pub fn new() -> Self {
        Self {
            table: None,
            columns: Vec::new(),
            distinct: false,
            joins: Vec::new(),
            wheres: Vec::new(),
            groups: Vec::new(),
            havings: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            dialect: SqlDialect::default(),
            connection: None,
            _marker: PhantomData,
        }
    }

    /// Set the table to query
    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Dialect used by [`to_sql`](Self::to_sql); execution always uses the
    /// dialect of the connection it runs on.
    pub fn dialect(mut self, dialect: SqlDialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Run against a named connection instead of the default one
    pub fn on_connection(mut self, name: Option<&str>) -> Self {
        self.connection = name.map(str::to_string);
        self
    }

    /// Apply `f` only when `condition` holds
    pub fn when<F>(self, condition: bool, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        if condition {
            f(self)
        } else {
            self
        }
    }

    pub fn get_table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn get_connection(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    /// Same state, different hydration target.
    pub(crate) fn cast<U>(self) -> QueryBuilder<U> {
        QueryBuilder {
            table: self.table,
            columns: self.columns,
            distinct: self.distinct,
            joins: self.joins,
            wheres: self.wheres,
            groups: self.groups,
            havings: self.havings,
            orders: self.orders,
            limit: self.limit,
            offset: self.offset,
            dialect: self.dialect,
            connection: self.connection,
            _marker: PhantomData,
        }
    }
}
