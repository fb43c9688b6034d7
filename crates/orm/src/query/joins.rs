//! Query Builder JOIN operations

use serde_json::Value;

use super::builder::QueryBuilder;
use super::types::*;
use super::where_clause::{comparison, in_list};

/// Predicate tree of a single join, owned by the builder that created it
#[derive(Debug, Clone)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: String,
    pub(crate) clauses: Vec<WhereNode>,
}

impl JoinClause {
    pub fn new(join_type: JoinType, table: impl Into<String>) -> Self {
        Self {
            join_type,
            table: table.into(),
            clauses: Vec::new(),
        }
    }

    fn push(mut self, boolean: Conjunction, predicate: Predicate) -> Self {
        self.clauses.push(WhereNode::new(boolean, predicate));
        self
    }

    fn column_condition(first: &str, operator: &str, second: &str) -> Predicate {
        Predicate::Column {
            first: first.to_string(),
            operator: QueryOperator::parse(operator).unwrap_or(QueryOperator::Equal),
            second: second.to_string(),
        }
    }

    /// `first <op> second` between two columns
    pub fn on(self, first: &str, operator: &str, second: &str) -> Self {
        self.push(Conjunction::And, Self::column_condition(first, operator, second))
    }

    pub fn or_on(self, first: &str, operator: &str, second: &str) -> Self {
        self.push(Conjunction::Or, Self::column_condition(first, operator, second))
    }

    /// Bound value condition, lands in the join bindings
    pub fn where_op<V: Into<Value>>(self, column: &str, operator: &str, value: V) -> Self {
        self.push(Conjunction::And, comparison(column, operator, value.into()))
    }

    pub fn where_eq<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.where_op(column, "=", value)
    }

    pub fn or_where<V: Into<Value>>(self, column: &str, operator: &str, value: V) -> Self {
        self.push(Conjunction::Or, comparison(column, operator, value.into()))
    }

    pub fn where_in<V, I>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push(Conjunction::And, in_list(column, values, false))
    }

    pub fn where_null(self, column: &str) -> Self {
        self.push(
            Conjunction::And,
            Predicate::Null {
                column: column.to_string(),
                negated: false,
            },
        )
    }

    pub fn where_not_null(self, column: &str) -> Self {
        self.push(
            Conjunction::And,
            Predicate::Null {
                column: column.to_string(),
                negated: true,
            },
        )
    }
}

impl<T> QueryBuilder<T> {
    /// INNER JOIN on one column comparison
    pub fn join(self, table: &str, first: &str, operator: &str, second: &str) -> Self {
        self.join_with(table, JoinType::Inner, |j| j.on(first, operator, second))
    }

    pub fn left_join(self, table: &str, first: &str, operator: &str, second: &str) -> Self {
        self.join_with(table, JoinType::Left, |j| j.on(first, operator, second))
    }

    pub fn right_join(self, table: &str, first: &str, operator: &str, second: &str) -> Self {
        self.join_with(table, JoinType::Right, |j| j.on(first, operator, second))
    }

    pub fn cross_join(mut self, table: &str) -> Self {
        self.joins.push(JoinClause::new(JoinType::Cross, table));
        self
    }

    /// Join with a full predicate tree built on a [`JoinClause`]
    pub fn join_with<F>(mut self, table: &str, join_type: JoinType, f: F) -> Self
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        self.joins.push(f(JoinClause::new(join_type, table)));
        self
    }
}
