//! Statistics and value comparison for collections

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use super::{Arrayable, Collection};

/// Extracts the value an operation works on from one item: a field path or
/// a callback.
pub enum Retriever<'a, T> {
    Field(String),
    Callback(Box<dyn Fn(&T) -> Value + 'a>),
}

impl<'a, T> Retriever<'a, T> {
    pub fn field(path: impl Into<String>) -> Self {
        Retriever::Field(path.into())
    }

    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&T) -> Value + 'a,
    {
        Retriever::Callback(Box::new(f))
    }
}

impl<'a, T: Arrayable> Retriever<'a, T> {
    pub fn retrieve(&self, item: &T) -> Value {
        match self {
            Retriever::Field(path) => item.data_get(path),
            Retriever::Callback(f) => f(item),
        }
    }
}

impl<T> fmt::Debug for Retriever<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Retriever::Field(path) => f.debug_tuple("Field").field(path).finish(),
            Retriever::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl<T> From<&str> for Retriever<'_, T> {
    fn from(path: &str) -> Self {
        Retriever::Field(path.to_string())
    }
}

impl<T> From<String> for Retriever<'_, T> {
    fn from(path: String) -> Self {
        Retriever::Field(path)
    }
}

/// Numeric view of a value; numeric strings count, everything else does not.
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values.
///
/// Numbers and numeric strings compare numerically; otherwise values order
/// by type (null, bool, number, string, array, object) then by content.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(x), Value::String(y)) => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => x.cmp(y),
        },
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            match (as_number(a), as_number(b)) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => type_rank(a).cmp(&type_rank(b)),
            }
        }
        (Value::Number(_), Value::Number(_)) => {
            let x = as_number(a).unwrap_or_default();
            let y = as_number(b).unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x.len().cmp(&y.len()),
        (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Equality used by `where_field` and `contains`: `1 == "1"`, `null == null`.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Array(_), _) | (Value::Object(_), _) | (_, Value::Array(_)) | (_, Value::Object(_)) => a == b,
        _ => compare_values(a, b) == Ordering::Equal,
    }
}

fn mode_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl<T: Arrayable> Collection<T> {
    /// Non-null extracted values; `None` retriever reads the item itself.
    fn extracted(&self, retriever: Option<&Retriever<'_, T>>) -> Vec<Value> {
        self.items
            .values()
            .map(|item| match retriever {
                Some(r) => r.retrieve(item),
                None => item.to_array(),
            })
            .filter(|v| !v.is_null())
            .collect()
    }

    fn numbers(&self, retriever: Option<&Retriever<'_, T>>) -> Vec<f64> {
        self.extracted(retriever).iter().filter_map(as_number).collect()
    }

    /// Total of the non-null values; `None` when there are none.
    pub fn sum(&self) -> Option<f64> {
        total(&self.numbers(None))
    }

    pub fn sum_by<'r>(&self, retriever: impl Into<Retriever<'r, T>>) -> Option<f64> {
        total(&self.numbers(Some(&retriever.into())))
    }

    /// Mean of the non-null values; `None` when there are none.
    pub fn avg(&self) -> Option<f64> {
        mean(&self.numbers(None))
    }

    pub fn avg_by<'r>(&self, retriever: impl Into<Retriever<'r, T>>) -> Option<f64> {
        mean(&self.numbers(Some(&retriever.into())))
    }

    pub fn median(&self) -> Option<f64> {
        median(self.numbers(None))
    }

    pub fn median_by<'r>(&self, retriever: impl Into<Retriever<'r, T>>) -> Option<f64> {
        median(self.numbers(Some(&retriever.into())))
    }

    /// Most frequent values, in first-seen order; `None` when empty.
    pub fn mode(&self) -> Option<Vec<Value>> {
        mode(self.extracted(None))
    }

    pub fn mode_by<'r>(&self, retriever: impl Into<Retriever<'r, T>>) -> Option<Vec<Value>> {
        mode(self.extracted(Some(&retriever.into())))
    }

    pub fn min(&self) -> Option<Value> {
        self.extracted(None).into_iter().min_by(compare_values)
    }

    pub fn min_by<'r>(&self, retriever: impl Into<Retriever<'r, T>>) -> Option<Value> {
        self.extracted(Some(&retriever.into())).into_iter().min_by(compare_values)
    }

    pub fn max(&self) -> Option<Value> {
        self.extracted(None).into_iter().max_by(compare_values)
    }

    pub fn max_by<'r>(&self, retriever: impl Into<Retriever<'r, T>>) -> Option<Value> {
        self.extracted(Some(&retriever.into())).into_iter().max_by(compare_values)
    }
}

fn total(numbers: &[f64]) -> Option<f64> {
    if numbers.is_empty() {
        return None;
    }
    Some(numbers.iter().sum())
}

fn mean(numbers: &[f64]) -> Option<f64> {
    if numbers.is_empty() {
        return None;
    }
    Some(numbers.iter().sum::<f64>() / numbers.len() as f64)
}

fn median(mut numbers: Vec<f64>) -> Option<f64> {
    if numbers.is_empty() {
        return None;
    }
    numbers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let middle = numbers.len() / 2;
    if numbers.len() % 2 == 0 {
        Some((numbers[middle - 1] + numbers[middle]) / 2.0)
    } else {
        Some(numbers[middle])
    }
}

fn mode(values: Vec<Value>) -> Option<Vec<Value>> {
    if values.is_empty() {
        return None;
    }
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in &values {
        *counts.entry(mode_key(value)).or_default() += 1;
    }
    let highest = counts.values().copied().max().unwrap_or_default();

    let mut seen = std::collections::HashSet::new();
    let modes = values
        .into_iter()
        .filter(|v| counts.get(&mode_key(v)) == Some(&highest))
        .filter(|v| seen.insert(mode_key(v)))
        .collect();
    Some(modes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn people() -> Collection<Value> {
        Collection::from_vec(vec![
            json!({"name": "Ann", "age": 30, "score": null}),
            json!({"name": "Bo", "age": 20, "score": null}),
            json!({"name": "Cy", "age": "40", "score": null}),
        ])
    }

    #[test]
    fn test_sum_and_avg_by_field() {
        let c = people();
        assert_eq!(c.sum_by("age"), Some(90.0));
        assert_eq!(c.avg_by("age"), Some(30.0));
    }

    #[test]
    fn test_all_null_column_is_no_data() {
        let c = people();
        assert_eq!(c.avg_by("score"), None);
        assert_eq!(c.median_by("score"), None);
        assert_eq!(c.max_by("score"), None);
        assert_eq!(c.mode_by("score"), None);
        assert_eq!(c.sum_by("score"), None);
        assert_eq!(Collection::<Value>::new().sum(), None);
        assert_eq!(Collection::from_vec(vec![json!(0), Value::Null]).sum(), Some(0.0));
    }

    #[test]
    fn test_median_even_and_odd() {
        let odd = Collection::from_vec(vec![json!(3), json!(1), json!(2)]);
        assert_eq!(odd.median(), Some(2.0));
        let even = Collection::from_vec(vec![json!(1), json!(2), json!(3), json!(4)]);
        assert_eq!(even.median(), Some(2.5));
    }

    #[test]
    fn test_mode_returns_all_most_frequent() {
        let c = Collection::from_vec(vec![json!(1), json!(2), json!(2), json!(1), json!(3)]);
        assert_eq!(c.mode(), Some(vec![json!(1), json!(2)]));
    }

    #[test]
    fn test_min_max_with_callback() {
        let c = people();
        let longest = c.max_by(Retriever::callback(|p: &Value| {
            json!(p["name"].as_str().map_or(0, str::len))
        }));
        assert_eq!(longest, Some(json!(3)));
        assert_eq!(c.min_by("age"), Some(json!(20)));
    }

    #[test]
    fn test_compare_values_numeric_strings() {
        assert_eq!(compare_values(&json!("10"), &json!(9)), Ordering::Greater);
        assert_eq!(compare_values(&json!("abc"), &json!("abd")), Ordering::Less);
        assert!(loose_eq(&json!(1), &json!("1")));
        assert!(!loose_eq(&json!(null), &json!(0)));
    }
}
