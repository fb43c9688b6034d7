//! Array/JSON projection of collection contents

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::OrmResult;

use super::{Collection, Key};

/// Anything that projects to a JSON value.
///
/// Collections serialize their elements through this trait recursively;
/// scalars pass through unchanged.
pub trait Arrayable {
    fn to_array(&self) -> Value;

    /// Read a dot-separated path (`address.city`, `tags.0`) from the projection
    fn data_get(&self, path: &str) -> Value {
        data_get(&self.to_array(), path)
    }
}

/// Walk `path` through nested objects and arrays; missing segments give `Null`.
pub fn data_get(value: &Value, path: &str) -> Value {
    let mut current = value;
    for segment in path.split('.') {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return Value::Null,
        }
    }
    current.clone()
}

impl Arrayable for Value {
    fn to_array(&self) -> Value {
        self.clone()
    }

    fn data_get(&self, path: &str) -> Value {
        data_get(self, path)
    }
}

impl Arrayable for Map<String, Value> {
    fn to_array(&self) -> Value {
        Value::Object(self.clone())
    }

    fn data_get(&self, path: &str) -> Value {
        match path.split_once('.') {
            None => self.get(path).cloned().unwrap_or(Value::Null),
            Some((head, rest)) => self.get(head).map_or(Value::Null, |v| data_get(v, rest)),
        }
    }
}

macro_rules! scalar_arrayable {
    ($($ty:ty),*) => {
        $(
            impl Arrayable for $ty {
                fn to_array(&self) -> Value {
                    Value::from(self.clone())
                }
            }
        )*
    };
}

scalar_arrayable!(i32, i64, u32, u64, f64, bool, String);

impl Arrayable for &str {
    fn to_array(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl Arrayable for Key {
    fn to_array(&self) -> Value {
        match self {
            Key::Index(i) => Value::from(*i),
            Key::Name(name) => Value::String(name.clone()),
        }
    }
}

impl<T: Arrayable + ?Sized> Arrayable for std::sync::Arc<T> {
    fn to_array(&self) -> Value {
        (**self).to_array()
    }
}

impl<T: Arrayable> Arrayable for Option<T> {
    fn to_array(&self) -> Value {
        self.as_ref().map_or(Value::Null, Arrayable::to_array)
    }
}

impl<T: Arrayable> Arrayable for Collection<T> {
    /// Lists become JSON arrays, keyed collections become objects.
    fn to_array(&self) -> Value {
        if self.is_list() {
            Value::Array(self.items.values().map(Arrayable::to_array).collect())
        } else {
            Value::Object(
                self.items
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.to_array()))
                    .collect(),
            )
        }
    }
}

impl<T: Arrayable> Collection<T> {
    pub fn to_json(&self) -> OrmResult<String> {
        Ok(serde_json::to_string(&self.to_array())?)
    }
}

impl<T: Arrayable> Serialize for Collection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_array().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_serializes_as_array() {
        let c = Collection::from_vec(vec![json!(1), json!("a")]);
        assert_eq!(c.to_json().unwrap(), r#"[1,"a"]"#);
    }

    #[test]
    fn test_keyed_serializes_as_object() {
        let c = Collection::from_pairs([("a", 1i64), ("b", 2)]);
        assert_eq!(c.to_array(), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_nested_collections_serialize_recursively() {
        let inner = Collection::from_vec(vec![json!({"id": 1})]);
        let outer = Collection::from_pairs([("users", inner)]);
        assert_eq!(outer.to_array(), json!({"users": [{"id": 1}]}));
    }

    #[test]
    fn test_data_get_walks_dot_paths() {
        let value = json!({"address": {"city": "Oslo"}, "tags": ["a", "b"]});
        assert_eq!(data_get(&value, "address.city"), json!("Oslo"));
        assert_eq!(data_get(&value, "tags.1"), json!("b"));
        assert_eq!(data_get(&value, "missing.path"), Value::Null);
    }
}
