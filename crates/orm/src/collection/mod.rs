//! Ordered, keyed in-memory collections
//!
//! A [`Collection`] keeps `(Key, value)` pairs in insertion order. Keys are
//! either sequential integers (list semantics) or arbitrary names
//! (associative semantics). Two method families live side by side:
//!
//! - the mutating family (`push`, `put`, `pop`, `shift`, `prepend`, `pull`,
//!   `forget`, `transform`) changes the collection in place;
//! - the functional family (see `functional.rs`) leaves `self` untouched and
//!   returns a new collection, documenting whether keys survive.

mod aggregates;
mod functional;
mod serialization;

use std::fmt;
use std::ops::Index;

use indexmap::IndexMap;
use serde::Serialize;

pub use aggregates::{compare_values, loose_eq, Retriever};
pub use serialization::{data_get, Arrayable};

/// Key of one collection entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Key {
    Index(i64),
    Name(String),
}

impl Key {
    pub fn as_index(&self) -> Option<i64> {
        match self {
            Key::Index(i) => Some(*i),
            Key::Name(_) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "{}", i),
            Key::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Index(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Index(value as i64)
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Key::Index(value as i64)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Name(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Name(value)
    }
}

impl From<&Key> for Key {
    fn from(value: &Key) -> Self {
        value.clone()
    }
}

/// Ordered, keyed container of values or records
#[derive(Debug, Clone)]
pub struct Collection<T> {
    pub(crate) items: IndexMap<Key, T>,
    next_index: i64,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Equality is order sensitive.
impl<T: PartialEq> PartialEq for Collection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len() && self.items.iter().eq(other.items.iter())
    }
}

impl<T> Collection<T> {
    pub fn new() -> Self {
        Self {
            items: IndexMap::new(),
            next_index: 0,
        }
    }

    /// List semantics: keys `0..n`
    pub fn from_vec(items: Vec<T>) -> Self {
        items.into_iter().collect()
    }

    /// Associative semantics: keys as given, later duplicates overwrite
    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: Into<Key>,
        I: IntoIterator<Item = (K, T)>,
    {
        let mut collection = Self::new();
        for (key, value) in pairs {
            collection.put(key, value);
        }
        collection
    }

    pub(crate) fn from_index_map(items: IndexMap<Key, T>) -> Self {
        let next_index = next_free_index(&items);
        Self { items, next_index }
    }

    pub fn get(&self, key: impl Into<Key>) -> Option<&T> {
        self.items.get(&key.into())
    }

    /// Value at `key`, or the lazily computed `default`
    pub fn get_or_else<F>(&self, key: impl Into<Key>, default: F) -> T
    where
        T: Clone,
        F: FnOnce() -> T,
    {
        match self.items.get(&key.into()) {
            Some(value) => value.clone(),
            None => default(),
        }
    }

    pub fn has(&self, key: impl Into<Key>) -> bool {
        self.items.contains_key(&key.into())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_not_empty(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, Key, T> {
        self.items.iter()
    }

    /// Values in order, keys dropped
    pub fn all(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.values().cloned().collect()
    }

    pub fn pairs(&self) -> Vec<(Key, T)>
    where
        T: Clone,
    {
        self.items.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items.into_values().collect()
    }

    pub fn into_pairs(self) -> Vec<(Key, T)> {
        self.items.into_iter().collect()
    }

    /// Whether keys are exactly `0..n` in order
    pub fn is_list(&self) -> bool {
        self.items
            .keys()
            .enumerate()
            .all(|(position, key)| *key == Key::Index(position as i64))
    }

    // ----- mutating family -----

    /// Append with the next integer key. In place.
    pub fn push(&mut self, value: T) -> &mut Self {
        let key = Key::Index(self.next_index);
        self.next_index += 1;
        self.items.insert(key, value);
        self
    }

    /// Insert or replace at `key`. In place.
    pub fn put(&mut self, key: impl Into<Key>, value: T) -> &mut Self {
        let key = key.into();
        if let Key::Index(i) = key {
            if i >= self.next_index {
                self.next_index = i + 1;
            }
        }
        self.items.insert(key, value);
        self
    }

    /// Remove and return the last item. In place.
    pub fn pop(&mut self) -> Option<T> {
        let (_, value) = self.items.pop()?;
        self.next_index = next_free_index(&self.items);
        Some(value)
    }

    /// Remove and return the first item; integer keys are renumbered. In place.
    pub fn shift(&mut self) -> Option<T> {
        let (_, value) = self.items.shift_remove_index(0)?;
        self.reindex_numeric();
        Some(value)
    }

    /// Insert at the front; integer keys are renumbered. In place.
    pub fn prepend(&mut self, value: T) -> &mut Self {
        let mut items = IndexMap::with_capacity(self.items.len() + 1);
        items.insert(Key::Index(-1), value);
        items.extend(std::mem::take(&mut self.items));
        self.items = items;
        self.reindex_numeric();
        self
    }

    /// Insert at the front under `key`, replacing any existing entry. In place.
    pub fn prepend_with_key(&mut self, key: impl Into<Key>, value: T) -> &mut Self {
        let key = key.into();
        self.items.shift_remove(&key);
        let mut items = IndexMap::with_capacity(self.items.len() + 1);
        items.insert(key, value);
        items.extend(std::mem::take(&mut self.items));
        self.items = items;
        self.next_index = next_free_index(&self.items);
        self
    }

    /// Remove and return the item at `key`. In place.
    pub fn pull(&mut self, key: impl Into<Key>) -> Option<T> {
        self.items.shift_remove(&key.into())
    }

    /// Remove the item at `key`. In place.
    pub fn forget(&mut self, key: impl Into<Key>) -> &mut Self {
        self.items.shift_remove(&key.into());
        self
    }

    /// Replace every value with `f(value)`, keys kept. In place.
    pub fn transform<F>(&mut self, mut f: F) -> &mut Self
    where
        F: FnMut(T) -> T,
    {
        let items = std::mem::take(&mut self.items);
        self.items = items.into_iter().map(|(k, v)| (k, f(v))).collect();
        self
    }

    fn reindex_numeric(&mut self) {
        let mut next = 0;
        let items = std::mem::take(&mut self.items);
        self.items = items
            .into_iter()
            .map(|(key, value)| match key {
                Key::Index(_) => {
                    let key = Key::Index(next);
                    next += 1;
                    (key, value)
                }
                named => (named, value),
            })
            .collect();
        self.next_index = next;
    }
}

fn next_free_index<T>(items: &IndexMap<Key, T>) -> i64 {
    items
        .keys()
        .filter_map(Key::as_index)
        .max()
        .map_or(0, |max| max + 1)
}

impl<T> FromIterator<T> for Collection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut collection = Self::new();
        for value in iter {
            collection.push(value);
        }
        collection
    }
}

impl<T> From<Vec<T>> for Collection<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl<T> IntoIterator for Collection<T> {
    type Item = (Key, T);
    type IntoIter = indexmap::map::IntoIter<Key, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = (&'a Key, &'a T);
    type IntoIter = indexmap::map::Iter<'a, Key, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> Index<usize> for Collection<T> {
    type Output = T;

    /// Panics when no entry has the integer key.
    fn index(&self, key: usize) -> &T {
        &self.items[&Key::Index(key as i64)]
    }
}

impl<T> Index<&str> for Collection<T> {
    type Output = T;

    fn index(&self, key: &str) -> &T {
        &self.items[&Key::Name(key.to_string())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_assigns_sequential_keys() {
        let mut c = Collection::new();
        c.push(1).push(2).put("name", 3).push(4);
        let keys: Vec<Key> = c.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(
            keys,
            vec![Key::Index(0), Key::Index(1), Key::from("name"), Key::Index(2)]
        );
    }

    #[test]
    fn test_put_moves_next_index_past_explicit_key() {
        let mut c = Collection::new();
        c.put(5, "a").push("b");
        assert_eq!(c.get(6), Some(&"b"));
    }

    #[test]
    fn test_pop_and_shift() {
        let mut c = Collection::from_vec(vec![1, 2, 3]);
        assert_eq!(c.pop(), Some(3));
        assert_eq!(c.shift(), Some(1));
        assert_eq!(c.pairs(), vec![(Key::Index(0), 2)]);
        c.push(9);
        assert_eq!(c.get(1), Some(&9));
    }

    #[test]
    fn test_prepend_renumbers_integer_keys() {
        let mut c = Collection::from_vec(vec!["b", "c"]);
        c.put("k", "z");
        c.prepend("a");
        assert_eq!(
            c.pairs(),
            vec![
                (Key::Index(0), "a"),
                (Key::Index(1), "b"),
                (Key::Index(2), "c"),
                (Key::from("k"), "z"),
            ]
        );
    }

    #[test]
    fn test_prepend_with_key_replaces_existing() {
        let mut c = Collection::from_pairs([("a", 1), ("b", 2)]);
        c.prepend_with_key("b", 5);
        assert_eq!(c.pairs(), vec![(Key::from("b"), 5), (Key::from("a"), 1)]);
    }

    #[test]
    fn test_pull_forget_and_transform_mutate_in_place() {
        let mut c = Collection::from_pairs([("a", 1), ("b", 2), ("c", 3)]);
        assert_eq!(c.pull("a"), Some(1));
        c.forget("c").transform(|v| v * 10);
        assert_eq!(c.pairs(), vec![(Key::from("b"), 20)]);
    }

    #[test]
    fn test_get_or_else_is_lazy() {
        let c = Collection::from_vec(vec![1]);
        let mut calls = 0;
        assert_eq!(
            c.get_or_else(0, || {
                calls += 1;
                7
            }),
            1
        );
        assert_eq!(calls, 0);
        assert_eq!(c.get_or_else(3, || 7), 7);
    }

    #[test]
    fn test_index_access() {
        let c = Collection::from_pairs([(Key::Index(0), 1), (Key::from("x"), 2)]);
        assert_eq!(c[0], 1);
        assert_eq!(c["x"], 2);
    }

    #[test]
    fn test_equality_respects_order() {
        let a = Collection::from_pairs([("a", 1), ("b", 2)]);
        let b = Collection::from_pairs([("b", 2), ("a", 1)]);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_is_list() {
        assert!(Collection::from_vec(vec![1, 2]).is_list());
        assert!(!Collection::from_pairs([(Key::Index(1), 1)]).is_list());
    }
}
