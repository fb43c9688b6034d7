//! Query Builder SQL generation
//!
//! Every fragment pushes its bindings in the same pass that emits its
//! placeholders, so the binding list always lines up with the `?` markers.
//! Clause order is fixed: SELECT, FROM, JOIN, WHERE, GROUP BY, HAVING,
//! ORDER BY, LIMIT, OFFSET. Empty clauses are left out.

use serde_json::Value;

use crate::backends::{Row, SqlDialect};

use super::builder::QueryBuilder;
use super::types::*;

/// Bindings grouped by the clause that owns them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    pub select: Vec<Value>,
    pub join: Vec<Value>,
    pub wheres: Vec<Value>,
    pub having: Vec<Value>,
    pub order: Vec<Value>,
}

impl Bindings {
    /// All bindings in placeholder order
    pub fn flatten(self) -> Vec<Value> {
        let mut all = self.select;
        all.extend(self.join);
        all.extend(self.wheres);
        all.extend(self.having);
        all.extend(self.order);
        all
    }

    pub fn len(&self) -> usize {
        self.select.len() + self.join.len() + self.wheres.len() + self.having.len() + self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// SQL text plus its positional bindings
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub bindings: Vec<Value>,
}

impl<T> QueryBuilder<T> {
    /// SELECT statement for the builder's dialect
    pub fn to_sql(&self) -> String {
        self.compile_select(self.dialect).sql
    }

    pub fn to_sql_for(&self, dialect: SqlDialect) -> String {
        self.compile_select(dialect).sql
    }

    /// Flattened bindings of [`to_sql`](Self::to_sql), in placeholder order
    pub fn get_bindings(&self) -> Vec<Value> {
        self.compile_select(self.dialect).bindings
    }

    /// Bindings grouped by clause
    pub fn get_raw_bindings(&self) -> Bindings {
        self.compile_select_parts(self.dialect).1
    }

    pub(crate) fn compile_select(&self, dialect: SqlDialect) -> CompiledQuery {
        let (sql, bindings) = self.compile_select_parts(dialect);
        CompiledQuery {
            sql,
            bindings: bindings.flatten(),
        }
    }

    fn from_table(&self) -> &str {
        self.table.as_deref().unwrap_or_default()
    }

    fn compile_select_parts(&self, dialect: SqlDialect) -> (String, Bindings) {
        let mut bindings = Bindings::default();
        let mut sql = String::from(if self.distinct { "SELECT DISTINCT " } else { "SELECT " });

        if self.columns.is_empty() {
            sql.push('*');
        } else {
            let columns: Vec<&str> = self
                .columns
                .iter()
                .map(|column| match column {
                    SelectColumn::Name(name) => name.as_str(),
                    SelectColumn::Raw { sql, bindings: values } => {
                        bindings.select.extend(values.iter().cloned());
                        sql.as_str()
                    }
                })
                .collect();
            sql.push_str(&columns.join(", "));
        }

        sql.push_str(" FROM ");
        sql.push_str(self.from_table());

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(&join.join_type.to_string());
            sql.push(' ');
            sql.push_str(&join.table);
            if join.join_type != JoinType::Cross {
                let on = compile_conditions(&join.clauses, dialect, &mut bindings.join);
                if !on.is_empty() {
                    sql.push_str(" ON ");
                    sql.push_str(&on);
                }
            }
        }

        sql.push_str(&self.compile_wheres(dialect, &mut bindings.wheres));

        if !self.groups.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.groups.join(", "));
        }

        let having = compile_conditions(&self.havings, dialect, &mut bindings.having);
        if !having.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&having);
        }

        if !self.orders.is_empty() {
            let orders: Vec<String> = self
                .orders
                .iter()
                .map(|order| match order {
                    OrderClause::Column { column, direction } => format!("{} {}", column, direction),
                    OrderClause::Raw { sql, bindings: values } => {
                        bindings.order.extend(values.iter().cloned());
                        sql.clone()
                    }
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&orders.join(", "));
        }

        match (self.limit, self.offset) {
            (Some(limit), _) => sql.push_str(&format!(" LIMIT {}", limit)),
            (None, Some(_)) => {
                if let Some(unbounded) = dialect.unbounded_limit() {
                    sql.push_str(&format!(" LIMIT {}", unbounded));
                }
            }
            (None, None) => {}
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        (sql, bindings)
    }

    /// ` WHERE ...` or the empty string
    fn compile_wheres(&self, dialect: SqlDialect, out: &mut Vec<Value>) -> String {
        let conditions = compile_conditions(&self.wheres, dialect, out);
        if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions)
        }
    }

    /// Multi-row INSERT; columns come from the first row, values missing in
    /// later rows bind as NULL.
    pub(crate) fn compile_insert(&self, rows: &[Row], dialect: SqlDialect) -> CompiledQuery {
        let table = self.from_table();
        let columns: Vec<&String> = rows.first().map(|row| row.keys().collect()).unwrap_or_default();

        if columns.is_empty() {
            let sql = match dialect {
                SqlDialect::MySQL => format!("INSERT INTO {} () VALUES ()", table),
                SqlDialect::SQLite | SqlDialect::PostgreSQL => format!("INSERT INTO {} DEFAULT VALUES", table),
            };
            return CompiledQuery {
                sql,
                bindings: Vec::new(),
            };
        }

        let mut bindings = Vec::with_capacity(rows.len() * columns.len());
        let placeholders = vec!["?"; columns.len()].join(", ");
        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            for column in &columns {
                bindings.push(row.get(column.as_str()).cloned().unwrap_or(Value::Null));
            }
            groups.push(format!("({})", placeholders));
        }

        let column_list: Vec<&str> = columns.iter().map(|c| c.as_str()).collect();
        CompiledQuery {
            sql: format!(
                "INSERT INTO {} ({}) VALUES {}",
                table,
                column_list.join(", "),
                groups.join(", ")
            ),
            bindings,
        }
    }

    pub(crate) fn compile_insert_get_id(&self, row: &Row, key: &str, dialect: SqlDialect) -> CompiledQuery {
        let mut compiled = self.compile_insert(std::slice::from_ref(row), dialect);
        if dialect.uses_returning() {
            compiled.sql.push_str(&format!(" RETURNING {}", key));
        }
        compiled
    }

    /// UPDATE; bindings are the assignment values followed by the where bindings.
    pub(crate) fn compile_update(&self, assignments: &[(String, Assignment)], dialect: SqlDialect) -> CompiledQuery {
        let mut bindings = Vec::new();
        let sets: Vec<String> = assignments
            .iter()
            .map(|(column, assignment)| match assignment {
                Assignment::Value(value) => {
                    bindings.push(value.clone());
                    format!("{} = ?", column)
                }
                Assignment::Raw { sql, bindings: values } => {
                    bindings.extend(values.iter().cloned());
                    format!("{} = {}", column, sql)
                }
            })
            .collect();

        let mut sql = format!("UPDATE {} SET {}", self.from_table(), sets.join(", "));
        sql.push_str(&self.compile_wheres(dialect, &mut bindings));
        CompiledQuery { sql, bindings }
    }

    pub(crate) fn compile_delete(&self, dialect: SqlDialect) -> CompiledQuery {
        let mut bindings = Vec::new();
        let mut sql = format!("DELETE FROM {}", self.from_table());
        sql.push_str(&self.compile_wheres(dialect, &mut bindings));
        CompiledQuery { sql, bindings }
    }

    pub(crate) fn compile_truncate(&self, dialect: SqlDialect) -> String {
        match dialect {
            SqlDialect::SQLite => format!("DELETE FROM {}", self.from_table()),
            SqlDialect::MySQL | SqlDialect::PostgreSQL => format!("TRUNCATE TABLE {}", self.from_table()),
        }
    }

    pub(crate) fn compile_exists(&self, dialect: SqlDialect) -> CompiledQuery {
        let inner = self.compile_select(dialect);
        CompiledQuery {
            sql: format!("SELECT EXISTS({}) AS row_exists", inner.sql),
            bindings: inner.bindings,
        }
    }
}

/// Render a predicate list. The first rendered node carries no connector;
/// every later one is prefixed by its own.
pub(crate) fn compile_conditions(nodes: &[WhereNode], dialect: SqlDialect, out: &mut Vec<Value>) -> String {
    let mut sql = String::new();
    for node in nodes {
        let Some(fragment) = compile_predicate(&node.predicate, dialect, out) else {
            continue;
        };
        if !sql.is_empty() {
            sql.push(' ');
            sql.push_str(node.boolean.as_sql());
            sql.push(' ');
        }
        sql.push_str(&fragment);
    }
    sql
}

/// `None` for predicates that render nothing (empty nested groups).
fn compile_predicate(predicate: &Predicate, dialect: SqlDialect, out: &mut Vec<Value>) -> Option<String> {
    let fragment = match predicate {
        Predicate::Basic { column, operator, value } => {
            out.push(value.clone());
            format!("{} {} ?", column, operator)
        }
        Predicate::Column { first, operator, second } => format!("{} {} {}", first, operator, second),
        Predicate::In { values, negated, .. } if values.is_empty() => {
            // an empty IN matches nothing, an empty NOT IN matches everything
            if *negated { "1 = 1".to_string() } else { "0 = 1".to_string() }
        }
        Predicate::In { column, values, negated } => {
            out.extend(values.iter().cloned());
            let placeholders = vec!["?"; values.len()].join(", ");
            let keyword = if *negated { "NOT IN" } else { "IN" };
            format!("{} {} ({})", column, keyword, placeholders)
        }
        Predicate::Null { column, negated } => {
            format!("{} {}", column, if *negated { "IS NOT NULL" } else { "IS NULL" })
        }
        Predicate::Between { column, low, high, negated } => {
            out.push(low.clone());
            out.push(high.clone());
            let keyword = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
            format!("{} {} ? AND ?", column, keyword)
        }
        Predicate::Date { column, part, operator, value } => {
            out.push(value.clone());
            let (expression, placeholder) = date_expression(column, *part, dialect);
            format!("{} {} {}", expression, operator, placeholder)
        }
        Predicate::Nested(nodes) => {
            let inner = compile_conditions(nodes, dialect, out);
            if inner.is_empty() {
                return None;
            }
            format!("({})", inner)
        }
        Predicate::Exists { query, negated } => {
            let compiled = query.compile_select(dialect);
            out.extend(compiled.bindings);
            let keyword = if *negated { "NOT EXISTS" } else { "EXISTS" };
            format!("{} ({})", keyword, compiled.sql)
        }
        Predicate::Raw { sql, bindings } => {
            out.extend(bindings.iter().cloned());
            sql.clone()
        }
    };
    Some(fragment)
}

fn date_expression(column: &str, part: DatePart, dialect: SqlDialect) -> (String, &'static str) {
    match dialect {
        SqlDialect::MySQL => {
            let function = match part {
                DatePart::Date => "DATE",
                DatePart::Year => "YEAR",
                DatePart::Month => "MONTH",
                DatePart::Day => "DAY",
                DatePart::Time => "TIME",
            };
            (format!("{}({})", function, column), "?")
        }
        SqlDialect::PostgreSQL => match part {
            DatePart::Date => (format!("{}::date", column), "?::date"),
            DatePart::Time => (format!("{}::time", column), "?::time"),
            DatePart::Year => (format!("extract(year from {})", column), "?::integer"),
            DatePart::Month => (format!("extract(month from {})", column), "?::integer"),
            DatePart::Day => (format!("extract(day from {})", column), "?::integer"),
        },
        SqlDialect::SQLite => {
            let format = match part {
                DatePart::Date => "%Y-%m-%d",
                DatePart::Year => "%Y",
                DatePart::Month => "%m",
                DatePart::Day => "%d",
                DatePart::Time => "%H:%M:%S",
            };
            (format!("strftime('{}', {})", format, column), "cast(? as text)")
        }
    }
}
