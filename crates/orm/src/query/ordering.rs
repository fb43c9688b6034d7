//! Query Builder ORDER BY, GROUP BY, HAVING operations

use serde_json::Value;

use super::builder::QueryBuilder;
use super::types::*;
use super::where_clause::comparison;

impl<T> QueryBuilder<T> {
    /// Add ORDER BY clause (ascending)
    pub fn order_by(self, column: &str) -> Self {
        self.order_by_direction(column, OrderDirection::Asc)
    }

    /// Add ORDER BY clause (descending)
    pub fn order_by_desc(self, column: &str) -> Self {
        self.order_by_direction(column, OrderDirection::Desc)
    }

    pub fn order_by_direction(mut self, column: &str, direction: OrderDirection) -> Self {
        self.orders.push(OrderClause::Column {
            column: column.to_string(),
            direction,
        });
        self
    }

    /// Newest first by `column`
    pub fn latest(self, column: &str) -> Self {
        self.order_by_desc(column)
    }

    pub fn oldest(self, column: &str) -> Self {
        self.order_by(column)
    }

    pub fn order_by_raw(mut self, sql: &str, bindings: Vec<Value>) -> Self {
        self.orders.push(OrderClause::Raw {
            sql: sql.to_string(),
            bindings,
        });
        self
    }

    /// Drop every ORDER BY entry
    pub fn reorder(mut self) -> Self {
        self.orders.clear();
        self
    }

    /// Add GROUP BY columns, comma separated
    pub fn group_by(mut self, columns: &str) -> Self {
        self.groups.extend(
            columns
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        );
        self
    }

    /// HAVING with the same operator rules as WHERE
    pub fn having<V: Into<Value>>(mut self, column: &str, operator: &str, value: V) -> Self {
        self.havings
            .push(WhereNode::new(Conjunction::And, comparison(column, operator, value.into())));
        self
    }

    pub fn or_having<V: Into<Value>>(mut self, column: &str, operator: &str, value: V) -> Self {
        self.havings
            .push(WhereNode::new(Conjunction::Or, comparison(column, operator, value.into())));
        self
    }

    pub fn having_raw(mut self, sql: &str, bindings: Vec<Value>) -> Self {
        self.havings.push(WhereNode::new(
            Conjunction::And,
            Predicate::Raw {
                sql: sql.to_string(),
                bindings,
            },
        ));
        self
    }
}
