//! Attribute casting and the equivalence check behind dirty tracking

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

use crate::backends::{format_date, format_datetime};

/// Declared read-side type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastType {
    Int,
    Float,
    String,
    Bool,
    /// JSON text decoded to an array
    Array,
    /// JSON text decoded to an object
    Object,
    /// `YYYY-MM-DD`
    Date,
    /// `YYYY-MM-DD HH:MM:SS`
    DateTime,
}

impl CastType {
    pub fn is_date(&self) -> bool {
        matches!(self, CastType::Date | CastType::DateTime)
    }

    pub fn is_json(&self) -> bool {
        matches!(self, CastType::Array | CastType::Object)
    }
}

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse the textual and numeric date forms drivers and callers produce:
/// `YYYY-MM-DD[ HH:MM:SS[.fff]]`, RFC 3339 and unix timestamps.
pub fn parse_datetime(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|ts| DateTime::from_timestamp(ts, 0)).map(|dt| dt.naive_utc()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.naive_utc());
            }
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
                .or_else(|| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .ok()
                        .map(|d| d.and_time(NaiveTime::MIN))
                })
        }
        _ => None,
    }
}

fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Null => false,
    }
}

fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        other => other.to_string(),
    }
}

/// Apply `cast` to a stored value. Null stays null; a value that cannot be
/// converted is returned unchanged.
pub fn cast_value(cast: CastType, value: &Value) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    match cast {
        CastType::Int => to_int(value).map_or_else(|| value.clone(), Value::from),
        CastType::Float => to_float(value).map_or_else(|| value.clone(), Value::from),
        CastType::String => Value::String(to_text(value)),
        CastType::Bool => Value::Bool(to_bool(value)),
        CastType::Array | CastType::Object => match value {
            Value::String(s) => serde_json::from_str(s).unwrap_or(Value::Null),
            other => other.clone(),
        },
        CastType::Date => parse_datetime(value).map_or_else(|| value.clone(), |dt| Value::String(format_date(dt.date()))),
        CastType::DateTime => parse_datetime(value).map_or_else(|| value.clone(), |dt| Value::String(format_datetime(dt))),
    }
}

fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => s.trim().parse::<f64>().is_ok(),
        _ => false,
    }
}

/// Whether `current` is unchanged relative to `original`.
///
/// Identical values are equivalent. Otherwise date casts compare the parsed
/// instant, primitive casts compare the cast values, JSON casts compare the
/// decoded documents, and numeric values compare their text forms.
pub fn is_equivalent(cast: Option<CastType>, current: &Value, original: Option<&Value>) -> bool {
    let Some(original) = original else {
        return false;
    };
    if current == original {
        return true;
    }
    if current.is_null() || original.is_null() {
        return false;
    }

    match cast {
        Some(cast) if cast.is_date() => match (parse_datetime(current), parse_datetime(original)) {
            (Some(a), Some(b)) => match cast {
                CastType::Date => a.date() == b.date(),
                _ => a == b,
            },
            _ => false,
        },
        Some(cast) if cast.is_json() => cast_value(cast, current) == cast_value(cast, original),
        Some(CastType::Float) => match (to_float(current), to_float(original)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        Some(cast) => cast_value(cast, current) == cast_value(cast, original),
        None => is_numeric(current) && is_numeric(original) && to_text(current) == to_text(original),
    }
}
