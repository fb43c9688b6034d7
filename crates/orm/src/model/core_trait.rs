//! Core Model Trait - class-level configuration of a record type
//!
//! A model is a (usually zero-sized) marker type; instances are
//! [`Record<M>`](super::Record). Every item has a default, so `impl Model for
//! User {}` is a complete model bound to table `users`.

use serde_json::Value;

use super::casts::CastType;
use super::record::Record;
use crate::observers::ModelMeta;

/// Default table name: the type's name, lower-cased, plus `s`.
pub fn default_table_name<M: ?Sized>() -> String {
    let full = std::any::type_name::<M>();
    let without_generics = full.split('<').next().unwrap_or(full);
    let short = without_generics.rsplit("::").next().unwrap_or(without_generics);
    format!("{}s", short.to_lowercase())
}

/// Short type name used in error messages
pub fn model_name<M: ?Sized>() -> String {
    let full = std::any::type_name::<M>();
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
        .to_string()
}

/// Class-level configuration for database models
pub trait Model: Send + Sync + Sized + 'static {
    fn table_name() -> String {
        default_table_name::<Self>()
    }

    /// Identity column; `None` means the model has no primary key.
    fn primary_key() -> Option<&'static str> {
        Some("id")
    }

    /// Whether the key is generated by the database on insert
    fn incrementing() -> bool {
        true
    }

    /// Named connection; `None` uses the manager's default
    fn connection() -> Option<&'static str> {
        None
    }

    /// Mass-assignable columns. When non-empty, only these pass `fill`.
    fn fillable() -> &'static [&'static str] {
        &[]
    }

    /// Columns blocked from mass assignment; `"*"` blocks everything.
    fn guarded() -> &'static [&'static str] {
        &["*"]
    }

    /// Columns left out of `to_array`
    fn hidden() -> &'static [&'static str] {
        &[]
    }

    /// When non-empty, the only columns `to_array` includes
    fn visible() -> &'static [&'static str] {
        &[]
    }

    fn casts() -> &'static [(&'static str, CastType)] {
        &[]
    }

    /// Computed attributes added to `to_array`, resolved by [`append_value`](Self::append_value)
    fn appends() -> &'static [&'static str] {
        &[]
    }

    fn append_value(_record: &Record<Self>, _name: &str) -> Value {
        Value::Null
    }

    /// Read-side attribute override; `Some` replaces the (cast) stored value.
    fn accessor(_record: &Record<Self>, _name: &str, _raw: &Value) -> Option<Value> {
        None
    }

    /// Stamp `created_at` / `updated_at` on save
    fn uses_timestamps() -> bool {
        false
    }

    /// One-time setup when the model is first used through a registry
    fn boot(_meta: &ModelMeta<Self>) {}

    fn cast_for(column: &str) -> Option<CastType> {
        Self::casts()
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, cast)| *cast)
            .or_else(|| {
                let is_timestamp = column == super::CREATED_AT || column == super::UPDATED_AT;
                (Self::uses_timestamps() && is_timestamp).then_some(CastType::DateTime)
            })
    }
}
