//! Query Builder Module - fluent SQL builder with positional bindings

pub mod builder;
pub mod dml;
pub mod execution;
pub mod joins;
pub mod ordering;
pub mod pagination;
pub mod select;
pub mod sql_generation;
pub mod types;
pub mod where_clause;

#[cfg(test)]
mod tests;

pub use builder::QueryBuilder;
pub use execution::Hydrate;
pub use joins::JoinClause;
pub use sql_generation::{Bindings, CompiledQuery};
pub use types::{Assignment, Conjunction, DatePart, JoinType, OrderDirection, Predicate, QueryOperator, WhereNode};
pub use where_clause::IN_CHUNK_SIZE;
