//! Functional collection operations
//!
//! Nothing here mutates `self`. Each method states whether the returned
//! collection keeps the original keys or is re-indexed.

use std::cmp::Ordering;
use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::Value;

use super::aggregates::{compare_values, loose_eq};
use super::{Arrayable, Collection, Key, Retriever};

/// Group key for a retrieved value: integers stay integer keys.
fn value_key(value: &Value) -> Key {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Key::Index(i),
            None => Key::Name(n.to_string()),
        },
        Value::Bool(b) => Key::Index(i64::from(*b)),
        Value::Null => Key::Name(String::new()),
        Value::String(s) => Key::Name(s.clone()),
        other => Key::Name(other.to_string()),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl<T: Clone> Collection<T> {
    /// Items passing `predicate`. Keys kept.
    pub fn filter<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&T) -> bool,
    {
        Self::from_index_map(
            self.items
                .iter()
                .filter(|(_, v)| predicate(v))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Items failing `predicate`. Keys kept.
    pub fn reject<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&T) -> bool,
    {
        self.filter(|v| !predicate(v))
    }

    /// `(passing, failing)`. Keys kept on both sides.
    pub fn partition<F>(&self, mut predicate: F) -> (Self, Self)
    where
        F: FnMut(&T) -> bool,
    {
        let mut pass = IndexMap::new();
        let mut fail = IndexMap::new();
        for (key, value) in &self.items {
            if predicate(value) {
                pass.insert(key.clone(), value.clone());
            } else {
                fail.insert(key.clone(), value.clone());
            }
        }
        (Self::from_index_map(pass), Self::from_index_map(fail))
    }

    /// Same order, keys replaced by `0..n`.
    pub fn values(&self) -> Self {
        self.items.values().cloned().collect()
    }

    /// Reverse order. Keys kept.
    pub fn reverse(&self) -> Self {
        Self::from_index_map(
            self.items
                .iter()
                .rev()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Stable sort by comparator. Keys kept.
    pub fn sort_by<F>(&self, mut compare: F) -> Self
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let mut entries: Vec<(Key, T)> = self.pairs();
        entries.sort_by(|a, b| compare(&a.1, &b.1));
        Self::from_index_map(entries.into_iter().collect())
    }

    /// Slice by position; negative `offset` counts from the end. Keys kept.
    pub fn slice(&self, offset: i64, length: Option<usize>) -> Self {
        let len = self.items.len() as i64;
        let start = if offset < 0 { (len + offset).max(0) } else { offset.min(len) };
        let start = start as usize;
        let end = match length {
            Some(length) => start.saturating_add(length).min(self.items.len()),
            None => self.items.len(),
        };
        Self::from_index_map(
            self.items
                .iter()
                .skip(start)
                .take(end - start)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// First `n` items, or the last `-n` when negative. Keys kept.
    pub fn take(&self, n: i64) -> Self {
        if n < 0 {
            self.slice(n, None)
        } else {
            self.slice(0, Some(n as usize))
        }
    }

    /// Everything after the first `n` items. Keys kept.
    pub fn skip(&self, n: usize) -> Self {
        self.slice(i64::try_from(n).unwrap_or(i64::MAX), None)
    }

    /// Runs of `size` items; each chunk keeps its original keys.
    pub fn chunk(&self, size: usize) -> Collection<Collection<T>> {
        if size == 0 {
            return Collection::new();
        }
        let entries = self.pairs();
        entries
            .chunks(size)
            .map(|chunk| Self::from_index_map(chunk.iter().cloned().collect()))
            .collect()
    }

    /// Integer-keyed items of `other` are appended, named ones overwrite.
    pub fn merge(&self, other: &Collection<T>) -> Self {
        let mut merged = Self::new();
        for (key, value) in self.items.iter().chain(other.items.iter()) {
            match key {
                Key::Index(_) => {
                    merged.push(value.clone());
                }
                Key::Name(_) => {
                    merged.put(key.clone(), value.clone());
                }
            }
        }
        merged
    }

    /// Items whose key is listed. Keys kept, original order.
    pub fn only<K: Into<Key> + Clone>(&self, keys: &[K]) -> Self {
        let wanted: HashSet<Key> = keys.iter().cloned().map(Into::into).collect();
        Self::from_index_map(
            self.items
                .iter()
                .filter(|(k, _)| wanted.contains(*k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Items whose key is not listed. Keys kept.
    pub fn except<K: Into<Key> + Clone>(&self, keys: &[K]) -> Self {
        let unwanted: HashSet<Key> = keys.iter().cloned().map(Into::into).collect();
        Self::from_index_map(
            self.items
                .iter()
                .filter(|(k, _)| !unwanted.contains(*k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Keys as a list collection.
    pub fn keys(&self) -> Collection<Key> {
        self.items.keys().cloned().collect()
    }

    /// Last item, or the lazily computed `default`.
    pub fn last_or_else<F>(&self, default: F) -> T
    where
        F: FnOnce() -> T,
    {
        self.items.values().last().cloned().unwrap_or_else(default)
    }

    pub fn first_or_else<F>(&self, default: F) -> T
    where
        F: FnOnce() -> T,
    {
        self.items.values().next().cloned().unwrap_or_else(default)
    }

    pub fn first_where_or_else<P, F>(&self, mut predicate: P, default: F) -> T
    where
        P: FnMut(&T) -> bool,
        F: FnOnce() -> T,
    {
        self.items
            .values()
            .find(|v| predicate(v))
            .cloned()
            .unwrap_or_else(default)
    }

    pub fn last_where_or_else<P, F>(&self, mut predicate: P, default: F) -> T
    where
        P: FnMut(&T) -> bool,
        F: FnOnce() -> T,
    {
        self.items
            .values()
            .rev()
            .find(|v| predicate(v))
            .cloned()
            .unwrap_or_else(default)
    }
}

impl<T> Collection<T> {
    /// `f` applied to every value. Keys kept.
    pub fn map<U, F>(&self, mut f: F) -> Collection<U>
    where
        F: FnMut(&T) -> U,
    {
        Collection::from_index_map(self.items.iter().map(|(k, v)| (k.clone(), f(v))).collect())
    }

    /// `f` yields the new `(key, value)` pair for each item.
    pub fn map_with_keys<K, U, F>(&self, mut f: F) -> Collection<U>
    where
        K: Into<Key>,
        F: FnMut(&T) -> (K, U),
    {
        Collection::from_pairs(self.items.values().map(|v| f(v)))
    }

    pub fn reduce<A, F>(&self, initial: A, mut f: F) -> A
    where
        F: FnMut(A, &T) -> A,
    {
        self.items.values().fold(initial, |acc, v| f(acc, v))
    }

    /// Visit items in order until `f` returns false.
    pub fn each<F>(&self, mut f: F) -> &Self
    where
        F: FnMut(&T, &Key) -> bool,
    {
        for (key, value) in &self.items {
            if !f(value, key) {
                break;
            }
        }
        self
    }

    pub fn contains<F>(&self, mut predicate: F) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        self.items.values().any(|v| predicate(v))
    }

    pub fn every<F>(&self, mut predicate: F) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        self.items.values().all(|v| predicate(v))
    }

    /// Key of the first item matching `predicate`.
    pub fn search<F>(&self, mut predicate: F) -> Option<Key>
    where
        F: FnMut(&T) -> bool,
    {
        self.items.iter().find(|(_, v)| predicate(v)).map(|(k, _)| k.clone())
    }

    pub fn first(&self) -> Option<&T> {
        self.items.values().next()
    }

    pub fn first_where<F>(&self, mut predicate: F) -> Option<&T>
    where
        F: FnMut(&T) -> bool,
    {
        self.items.values().find(|v| predicate(v))
    }

    pub fn last(&self) -> Option<&T> {
        self.items.values().last()
    }

    pub fn last_where<F>(&self, mut predicate: F) -> Option<&T>
    where
        F: FnMut(&T) -> bool,
    {
        self.items.values().rev().find(|v| predicate(v))
    }
}

impl<T: Arrayable + Clone> Collection<T> {
    /// Group by a retrieved value. An array value files the item under every
    /// element. Inside each group, `preserve_keys` keeps original keys;
    /// otherwise items are re-indexed.
    pub fn group_by<'r>(
        &self,
        retriever: impl Into<Retriever<'r, T>>,
        preserve_keys: bool,
    ) -> Collection<Collection<T>> {
        let retriever = retriever.into();
        let mut groups: Collection<Collection<T>> = Collection::new();
        for (key, item) in &self.items {
            let group_keys = match retriever.retrieve(item) {
                Value::Array(values) => values.iter().map(value_key).collect(),
                value => vec![value_key(&value)],
            };
            for group_key in group_keys {
                if !groups.has(group_key.clone()) {
                    groups.put(group_key.clone(), Collection::new());
                }
                if let Some(group) = groups.items.get_mut(&group_key) {
                    if preserve_keys {
                        group.put(key.clone(), item.clone());
                    } else {
                        group.push(item.clone());
                    }
                }
            }
        }
        groups
    }

    /// Re-key by a retrieved value; later items win on collisions.
    pub fn key_by<'r>(&self, retriever: impl Into<Retriever<'r, T>>) -> Self {
        let retriever = retriever.into();
        Self::from_pairs(
            self.items
                .values()
                .map(|item| (value_key(&retriever.retrieve(item)), item.clone())),
        )
    }

    /// Values of `field`, re-indexed.
    pub fn pluck(&self, field: &str) -> Collection<Value> {
        self.items.values().map(|item| item.data_get(field)).collect()
    }

    /// Values of `field` keyed by `key_field`.
    pub fn pluck_keyed(&self, field: &str, key_field: &str) -> Collection<Value> {
        Collection::from_pairs(
            self.items
                .values()
                .map(|item| (value_key(&item.data_get(key_field)), item.data_get(field))),
        )
    }

    /// First occurrence per retrieved value. Keys kept.
    pub fn unique_by<'r>(&self, retriever: impl Into<Retriever<'r, T>>) -> Self {
        let retriever = retriever.into();
        let mut seen = HashSet::new();
        self.filter(|item| seen.insert(retriever.retrieve(item).to_string()))
    }

    /// First occurrence per projected value. Keys kept.
    pub fn unique(&self) -> Self {
        let mut seen = HashSet::new();
        self.filter(|item| seen.insert(item.to_array().to_string()))
    }

    /// Sort ascending by a field or callback. Keys kept.
    pub fn sort_by_field<'r>(&self, retriever: impl Into<Retriever<'r, T>>) -> Self {
        let retriever = retriever.into();
        self.sort_by(|a, b| compare_values(&retriever.retrieve(a), &retriever.retrieve(b)))
    }

    pub fn sort_by_field_desc<'r>(&self, retriever: impl Into<Retriever<'r, T>>) -> Self {
        let retriever = retriever.into();
        self.sort_by(|a, b| compare_values(&retriever.retrieve(b), &retriever.retrieve(a)))
    }

    /// Filter on `field <operator> value` with loose comparison. Keys kept.
    ///
    /// Unknown operators match nothing.
    pub fn where_field(&self, field: &str, operator: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.filter(|item| {
            let actual = item.data_get(field);
            match operator {
                "=" | "==" => loose_eq(&actual, &value),
                "!=" | "<>" => !loose_eq(&actual, &value),
                "===" => actual == value,
                "!==" => actual != value,
                "<" => compare_values(&actual, &value) == Ordering::Less,
                ">" => compare_values(&actual, &value) == Ordering::Greater,
                "<=" => compare_values(&actual, &value) != Ordering::Greater,
                ">=" => compare_values(&actual, &value) != Ordering::Less,
                _ => false,
            }
        })
    }

    pub fn where_in(&self, field: &str, values: &[Value]) -> Self {
        self.filter(|item| {
            let actual = item.data_get(field);
            values.iter().any(|v| loose_eq(&actual, v))
        })
    }

    /// Flatten nested arrays and collections `depth` levels deep
    /// (`usize::MAX` for fully). Re-indexed.
    pub fn flatten(&self, depth: usize) -> Collection<Value> {
        let mut out = Vec::new();
        for item in self.items.values() {
            flatten_into(item.to_array(), depth, &mut out);
        }
        Collection::from_vec(out)
    }

    /// Join scalar items with `glue`.
    pub fn implode(&self, glue: &str) -> String {
        self.items
            .values()
            .map(|item| scalar_text(&item.to_array()))
            .collect::<Vec<_>>()
            .join(glue)
    }

    pub fn implode_field(&self, field: &str, glue: &str) -> String {
        self.items
            .values()
            .map(|item| scalar_text(&item.data_get(field)))
            .collect::<Vec<_>>()
            .join(glue)
    }
}

fn flatten_into(value: Value, depth: usize, out: &mut Vec<Value>) {
    let children: Vec<Value> = match value {
        Value::Array(items) => items,
        Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        scalar => {
            out.push(scalar);
            return;
        }
    };
    for child in children {
        match child {
            Value::Array(_) | Value::Object(_) if depth > 1 => flatten_into(child, depth - 1, out),
            other => out.push(other),
        }
    }
}
