//! Query Builder Types - Core types and enums for query building

use std::fmt;

use serde_json::Value;

use super::builder::QueryBuilder;

/// Boolean connector stored on every predicate node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    And,
    Or,
}

impl Conjunction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }
}

/// Whitelisted comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Equal,
    NotEqual,
    NotEqualAnsi,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Like,
    NotLike,
    In,
    NotIn,
    Between,
    NotBetween,
}

impl QueryOperator {
    /// Parse an operator token; anything outside the whitelist is `None`.
    pub fn parse(token: &str) -> Option<Self> {
        let op = match token.trim().to_lowercase().as_str() {
            "=" => QueryOperator::Equal,
            "!=" => QueryOperator::NotEqual,
            "<>" => QueryOperator::NotEqualAnsi,
            ">" => QueryOperator::GreaterThan,
            ">=" => QueryOperator::GreaterThanOrEqual,
            "<" => QueryOperator::LessThan,
            "<=" => QueryOperator::LessThanOrEqual,
            "like" => QueryOperator::Like,
            "not like" => QueryOperator::NotLike,
            "in" => QueryOperator::In,
            "not in" => QueryOperator::NotIn,
            "between" => QueryOperator::Between,
            "not between" => QueryOperator::NotBetween,
            _ => return None,
        };
        Some(op)
    }

    pub fn is_negative_equality(&self) -> bool {
        matches!(self, QueryOperator::NotEqual | QueryOperator::NotEqualAnsi)
    }
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            QueryOperator::Equal => "=",
            QueryOperator::NotEqual => "!=",
            QueryOperator::NotEqualAnsi => "<>",
            QueryOperator::GreaterThan => ">",
            QueryOperator::GreaterThanOrEqual => ">=",
            QueryOperator::LessThan => "<",
            QueryOperator::LessThanOrEqual => "<=",
            QueryOperator::Like => "LIKE",
            QueryOperator::NotLike => "NOT LIKE",
            QueryOperator::In => "IN",
            QueryOperator::NotIn => "NOT IN",
            QueryOperator::Between => "BETWEEN",
            QueryOperator::NotBetween => "NOT BETWEEN",
        };
        write!(f, "{}", token)
    }
}

/// Part of a date/time column compared by a date predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Date,
    Year,
    Month,
    Day,
    Time,
}

/// One typed entry of a where/having/join predicate tree
#[derive(Debug, Clone)]
pub enum Predicate {
    Basic {
        column: String,
        operator: QueryOperator,
        value: Value,
    },
    /// Column-to-column comparison, bound nothing
    Column {
        first: String,
        operator: QueryOperator,
        second: String,
    },
    In {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    Null {
        column: String,
        negated: bool,
    },
    Between {
        column: String,
        low: Value,
        high: Value,
        negated: bool,
    },
    Date {
        column: String,
        part: DatePart,
        operator: QueryOperator,
        value: Value,
    },
    Nested(Vec<WhereNode>),
    Exists {
        query: Box<QueryBuilder>,
        negated: bool,
    },
    Raw {
        sql: String,
        bindings: Vec<Value>,
    },
}

/// A predicate together with the connector that joins it to its predecessor
#[derive(Debug, Clone)]
pub struct WhereNode {
    pub boolean: Conjunction,
    pub predicate: Predicate,
}

impl WhereNode {
    pub fn new(boolean: Conjunction, predicate: Predicate) -> Self {
        Self { boolean, predicate }
    }
}

/// Join types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Cross,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER JOIN"),
            JoinType::Left => write!(f, "LEFT JOIN"),
            JoinType::Right => write!(f, "RIGHT JOIN"),
            JoinType::Cross => write!(f, "CROSS JOIN"),
        }
    }
}

/// Order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    /// `"desc"` in any case is descending, everything else ascending.
    pub fn parse(direction: &str) -> Self {
        if direction.trim().eq_ignore_ascii_case("desc") {
            OrderDirection::Desc
        } else {
            OrderDirection::Asc
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => write!(f, "ASC"),
            OrderDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// One projected column
#[derive(Debug, Clone, PartialEq)]
pub enum SelectColumn {
    Name(String),
    Raw { sql: String, bindings: Vec<Value> },
}

/// One ORDER BY entry
#[derive(Debug, Clone, PartialEq)]
pub enum OrderClause {
    Column {
        column: String,
        direction: OrderDirection,
    },
    Raw {
        sql: String,
        bindings: Vec<Value>,
    },
}

/// Right-hand side of an UPDATE assignment
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    Value(Value),
    /// Expression with its own placeholders, e.g. `credits + ?`
    Raw { sql: String, bindings: Vec<Value> },
}
