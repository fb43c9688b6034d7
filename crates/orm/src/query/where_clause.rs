//! Query Builder WHERE clause operations

use std::collections::HashSet;

use serde_json::Value;

use super::builder::QueryBuilder;
use super::types::*;

/// Largest IN list emitted as a single predicate; longer lists are split.
pub const IN_CHUNK_SIZE: usize = 1000;

/// Build a comparison from an operator token.
///
/// A token outside the whitelist is taken as the value of an equality, and
/// the passed `value` is ignored. `= null` and `!= null` become null checks.
/// `in` and `between` always route to their dedicated predicates: a scalar
/// is a one-element list, and an empty range matches nothing.
pub(crate) fn comparison(column: &str, operator: &str, value: Value) -> Predicate {
    let (operator, value) = match QueryOperator::parse(operator) {
        Some(op) => (op, value),
        None => (QueryOperator::Equal, Value::String(operator.to_string())),
    };
    let column = column.to_string();

    match (operator, value) {
        (QueryOperator::Equal, Value::Null) => Predicate::Null { column, negated: false },
        (op, Value::Null) if op.is_negative_equality() => Predicate::Null { column, negated: true },
        (QueryOperator::In, Value::Array(values)) => in_list(&column, values, false),
        (QueryOperator::NotIn, Value::Array(values)) => in_list(&column, values, true),
        (QueryOperator::In, value) => in_list(&column, vec![value], false),
        (QueryOperator::NotIn, value) => in_list(&column, vec![value], true),
        (op @ (QueryOperator::Between | QueryOperator::NotBetween), value) => {
            let negated = op == QueryOperator::NotBetween;
            let values = match value {
                Value::Array(values) => values,
                scalar => vec![scalar],
            };
            // first and last element bound the range; a scalar is both
            match (values.first(), values.last()) {
                (Some(low), Some(high)) => Predicate::Between {
                    column,
                    low: low.clone(),
                    high: high.clone(),
                    negated,
                },
                _ => in_list(&column, Vec::new(), negated),
            }
        }
        (operator, value) => Predicate::Basic { column, operator, value },
    }
}

/// IN / NOT IN over a de-duplicated, null-free value list.
///
/// Lists longer than [`IN_CHUNK_SIZE`] become a nested group of chunks: OR
/// chained for IN, AND chained for NOT IN.
pub(crate) fn in_list(column: &str, values: Vec<Value>, negated: bool) -> Predicate {
    let mut seen = HashSet::new();
    let values: Vec<Value> = values
        .into_iter()
        .filter(|v| !v.is_null())
        .filter(|v| seen.insert(v.to_string()))
        .collect();

    if values.len() <= IN_CHUNK_SIZE {
        return Predicate::In {
            column: column.to_string(),
            values,
            negated,
        };
    }

    let boolean = if negated { Conjunction::And } else { Conjunction::Or };
    let chunks = values
        .chunks(IN_CHUNK_SIZE)
        .map(|chunk| {
            WhereNode::new(
                boolean,
                Predicate::In {
                    column: column.to_string(),
                    values: chunk.to_vec(),
                    negated,
                },
            )
        })
        .collect();
    Predicate::Nested(chunks)
}

/// Month and day compare against two-digit strings.
fn date_value(part: DatePart, value: Value) -> Value {
    match part {
        DatePart::Month | DatePart::Day => match &value {
            Value::Number(n) => match n.as_u64() {
                Some(n) => Value::String(format!("{:02}", n)),
                None => value,
            },
            Value::String(s) if s.len() == 1 => Value::String(format!("0{}", s)),
            _ => value,
        },
        _ => value,
    }
}

fn date_predicate(column: &str, part: DatePart, operator: &str, value: Value) -> Predicate {
    let (operator, value) = match QueryOperator::parse(operator) {
        Some(op) => (op, value),
        None => (QueryOperator::Equal, Value::String(operator.to_string())),
    };
    Predicate::Date {
        column: column.to_string(),
        part,
        operator,
        value: date_value(part, value),
    }
}

fn map_group<K, V, I>(entries: I) -> Predicate
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    Predicate::Nested(
        entries
            .into_iter()
            .map(|(k, v)| WhereNode::new(Conjunction::And, comparison(k.as_ref(), "=", v.into())))
            .collect(),
    )
}

impl<T> QueryBuilder<T> {
    pub(crate) fn push_where(mut self, boolean: Conjunction, predicate: Predicate) -> Self {
        self.wheres.push(WhereNode::new(boolean, predicate));
        self
    }

    /// `column = value`
    pub fn where_eq<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.where_op(column, "=", value)
    }

    /// `column <operator> value`. An operator outside the whitelist is read
    /// as the value of an equality: `where_op("name", "Ann", ())` is `name = 'Ann'`.
    pub fn where_op<V: Into<Value>>(self, column: &str, operator: &str, value: V) -> Self {
        let predicate = comparison(column, operator, value.into());
        self.push_where(Conjunction::And, predicate)
    }

    pub fn or_where_eq<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.or_where_op(column, "=", value)
    }

    pub fn or_where_op<V: Into<Value>>(self, column: &str, operator: &str, value: V) -> Self {
        let predicate = comparison(column, operator, value.into());
        self.push_where(Conjunction::Or, predicate)
    }

    pub fn where_ne<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.where_op(column, "!=", value)
    }

    pub fn where_gt<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.where_op(column, ">", value)
    }

    pub fn where_gte<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.where_op(column, ">=", value)
    }

    pub fn where_lt<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.where_op(column, "<", value)
    }

    pub fn where_lte<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.where_op(column, "<=", value)
    }

    pub fn where_like(self, column: &str, pattern: &str) -> Self {
        self.where_op(column, "like", pattern)
    }

    pub fn where_not_like(self, column: &str, pattern: &str) -> Self {
        self.where_op(column, "not like", pattern)
    }

    /// One parenthesized group of equalities, one per entry
    pub fn where_map<K, V, I>(self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.push_where(Conjunction::And, map_group(entries))
    }

    pub fn or_where_map<K, V, I>(self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.push_where(Conjunction::Or, map_group(entries))
    }

    /// Parenthesized sub-tree built on a fresh builder. An empty group adds nothing.
    pub fn where_nested<F>(self, f: F) -> Self
    where
        F: FnOnce(QueryBuilder) -> QueryBuilder,
    {
        self.nested(Conjunction::And, f)
    }

    pub fn or_where_nested<F>(self, f: F) -> Self
    where
        F: FnOnce(QueryBuilder) -> QueryBuilder,
    {
        self.nested(Conjunction::Or, f)
    }

    fn nested<F>(self, boolean: Conjunction, f: F) -> Self
    where
        F: FnOnce(QueryBuilder) -> QueryBuilder,
    {
        let group = f(QueryBuilder::new()).wheres;
        if group.is_empty() {
            return self;
        }
        self.push_where(boolean, Predicate::Nested(group))
    }

    /// Compare two columns
    pub fn where_column(self, first: &str, operator: &str, second: &str) -> Self {
        self.column_predicate(Conjunction::And, first, operator, second)
    }

    pub fn or_where_column(self, first: &str, operator: &str, second: &str) -> Self {
        self.column_predicate(Conjunction::Or, first, operator, second)
    }

    fn column_predicate(self, boolean: Conjunction, first: &str, operator: &str, second: &str) -> Self {
        let operator = QueryOperator::parse(operator).unwrap_or(QueryOperator::Equal);
        self.push_where(
            boolean,
            Predicate::Column {
                first: first.to_string(),
                operator,
                second: second.to_string(),
            },
        )
    }

    /// Raw SQL fragment with its own `?` bindings
    pub fn where_raw(self, sql: &str, bindings: Vec<Value>) -> Self {
        self.push_where(
            Conjunction::And,
            Predicate::Raw {
                sql: sql.to_string(),
                bindings,
            },
        )
    }

    pub fn or_where_raw(self, sql: &str, bindings: Vec<Value>) -> Self {
        self.push_where(
            Conjunction::Or,
            Predicate::Raw {
                sql: sql.to_string(),
                bindings,
            },
        )
    }

    /// `column IN (...)`. Nulls and duplicates are dropped; an empty list
    /// matches nothing.
    pub fn where_in<V, I>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push_where(Conjunction::And, in_list(column, values, false))
    }

    pub fn or_where_in<V, I>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push_where(Conjunction::Or, in_list(column, values, false))
    }

    /// `column NOT IN (...)`; an empty list matches everything.
    pub fn where_not_in<V, I>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push_where(Conjunction::And, in_list(column, values, true))
    }

    pub fn or_where_not_in<V, I>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push_where(Conjunction::Or, in_list(column, values, true))
    }

    pub fn where_null(self, column: &str) -> Self {
        self.push_where(
            Conjunction::And,
            Predicate::Null {
                column: column.to_string(),
                negated: false,
            },
        )
    }

    pub fn or_where_null(self, column: &str) -> Self {
        self.push_where(
            Conjunction::Or,
            Predicate::Null {
                column: column.to_string(),
                negated: false,
            },
        )
    }

    pub fn where_not_null(self, column: &str) -> Self {
        self.push_where(
            Conjunction::And,
            Predicate::Null {
                column: column.to_string(),
                negated: true,
            },
        )
    }

    pub fn or_where_not_null(self, column: &str) -> Self {
        self.push_where(
            Conjunction::Or,
            Predicate::Null {
                column: column.to_string(),
                negated: true,
            },
        )
    }

    pub fn where_between<A: Into<Value>, B: Into<Value>>(self, column: &str, low: A, high: B) -> Self {
        self.between(Conjunction::And, column, low.into(), high.into(), false)
    }

    pub fn or_where_between<A: Into<Value>, B: Into<Value>>(self, column: &str, low: A, high: B) -> Self {
        self.between(Conjunction::Or, column, low.into(), high.into(), false)
    }

    pub fn where_not_between<A: Into<Value>, B: Into<Value>>(self, column: &str, low: A, high: B) -> Self {
        self.between(Conjunction::And, column, low.into(), high.into(), true)
    }

    fn between(self, boolean: Conjunction, column: &str, low: Value, high: Value, negated: bool) -> Self {
        self.push_where(
            boolean,
            Predicate::Between {
                column: column.to_string(),
                low,
                high,
                negated,
            },
        )
    }

    /// Compare the date part of a date/time column, e.g. `"2024-03-01"`
    pub fn where_date<V: Into<Value>>(self, column: &str, operator: &str, value: V) -> Self {
        self.push_where(Conjunction::And, date_predicate(column, DatePart::Date, operator, value.into()))
    }

    pub fn or_where_date<V: Into<Value>>(self, column: &str, operator: &str, value: V) -> Self {
        self.push_where(Conjunction::Or, date_predicate(column, DatePart::Date, operator, value.into()))
    }

    pub fn where_year<V: Into<Value>>(self, column: &str, operator: &str, value: V) -> Self {
        self.push_where(Conjunction::And, date_predicate(column, DatePart::Year, operator, value.into()))
    }

    pub fn where_month<V: Into<Value>>(self, column: &str, operator: &str, value: V) -> Self {
        self.push_where(Conjunction::And, date_predicate(column, DatePart::Month, operator, value.into()))
    }

    pub fn where_day<V: Into<Value>>(self, column: &str, operator: &str, value: V) -> Self {
        self.push_where(Conjunction::And, date_predicate(column, DatePart::Day, operator, value.into()))
    }

    pub fn where_time<V: Into<Value>>(self, column: &str, operator: &str, value: V) -> Self {
        self.push_where(Conjunction::And, date_predicate(column, DatePart::Time, operator, value.into()))
    }

    /// `EXISTS (subquery)`; the subquery's bindings are spliced in place
    pub fn where_exists<U>(self, query: QueryBuilder<U>) -> Self {
        self.exists_predicate(Conjunction::And, query, false)
    }

    pub fn or_where_exists<U>(self, query: QueryBuilder<U>) -> Self {
        self.exists_predicate(Conjunction::Or, query, false)
    }

    pub fn where_not_exists<U>(self, query: QueryBuilder<U>) -> Self {
        self.exists_predicate(Conjunction::And, query, true)
    }

    fn exists_predicate<U>(self, boolean: Conjunction, query: QueryBuilder<U>, negated: bool) -> Self {
        self.push_where(
            boolean,
            Predicate::Exists {
                query: Box::new(query.cast()),
                negated,
            },
        )
    }
}
