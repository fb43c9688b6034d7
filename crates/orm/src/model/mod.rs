//! Model System - records, casts and persistence
//!
//! - `core_trait`: the [`Model`] trait with class-level configuration
//! - `record`: [`Record`], attribute state and dirty tracking
//! - `casts`: read-side casts and value equivalence
//! - `crud_operations`: query, save, delete
//! - `lifecycle`: event dispatch around persistence

pub mod casts;
pub mod core_trait;
pub mod crud_operations;
pub mod lifecycle;
pub mod record;

pub use casts::{cast_value, is_equivalent, parse_datetime, CastType};
pub use core_trait::{default_table_name, model_name, Model};
pub use record::Record;

/// Creation timestamp column
pub const CREATED_AT: &str = "created_at";

/// Update timestamp column
pub const UPDATED_AT: &str = "updated_at";
