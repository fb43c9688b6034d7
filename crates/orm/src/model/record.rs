//! Record - one row of a model: attributes, original snapshot, dirty state

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::backends::Row;
use crate::collection::Arrayable;
use crate::error::OrmResult;
use crate::query::Hydrate;

use super::casts::{cast_value, is_equivalent, parse_datetime};
use super::core_trait::Model;

type Relation = Arc<dyn Arrayable + Send + Sync>;

fn listed(list: &[&str], key: &str) -> bool {
    list.iter().any(|entry| *entry == key)
}

/// Instance of model `M`.
///
/// `attributes` holds the raw current values and `original` the snapshot
/// taken at the last load or save. Casts apply on read only.
pub struct Record<M: Model> {
    pub(crate) attributes: Row,
    pub(crate) original: Row,
    pub(crate) changes: Row,
    pub(crate) exists: bool,
    pub(crate) was_recently_created: bool,
    relations: IndexMap<String, Relation>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Clone for Record<M> {
    fn clone(&self) -> Self {
        Self {
            attributes: self.attributes.clone(),
            original: self.original.clone(),
            changes: self.changes.clone(),
            exists: self.exists,
            was_recently_created: self.was_recently_created,
            relations: self.relations.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: Model> fmt::Debug for Record<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("table", &M::table_name())
            .field("attributes", &self.attributes)
            .field("exists", &self.exists)
            .field("relations", &self.relations.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<M: Model> Default for Record<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Record<M> {
    /// A new, unsaved record
    pub fn new() -> Self {
        Self {
            attributes: Row::new(),
            original: Row::new(),
            changes: Row::new(),
            exists: false,
            was_recently_created: false,
            relations: IndexMap::new(),
            _model: PhantomData,
        }
    }

    /// A persisted record loaded from `row`; clean until modified.
    pub fn from_row(row: Row) -> Self {
        let mut record = Self::new();
        record.original = row.clone();
        record.attributes = row;
        record.exists = true;
        record
    }

    pub fn is_fillable(key: &str) -> bool {
        if listed(M::fillable(), key) {
            return true;
        }
        if Self::is_guarded(key) {
            return false;
        }
        M::fillable().is_empty() && !key.contains('.') && !key.starts_with('_')
    }

    pub fn is_guarded(key: &str) -> bool {
        let guarded = M::guarded();
        !guarded.is_empty() && (listed(guarded, "*") || listed(guarded, key))
    }

    /// Mass-assign the fillable attributes of `attributes`; the rest are dropped.
    pub fn fill(&mut self, attributes: Row) -> &mut Self {
        for (key, value) in attributes {
            if Self::is_fillable(&key) {
                self.attributes.insert(key, value);
            } else {
                tracing::debug!(model = %super::model_name::<M>(), attribute = %key, "guarded attribute skipped");
            }
        }
        self
    }

    /// Assign every attribute, ignoring fillable/guarded.
    pub fn force_fill(&mut self, attributes: Row) -> &mut Self {
        self.attributes.extend(attributes);
        self
    }

    /// Store a raw value.
    pub fn set_attribute(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    /// Read an attribute through its accessor or cast. Missing keys are
    /// appended values when declared, otherwise `Null`.
    pub fn get_attribute(&self, key: &str) -> Value {
        let raw = match self.attributes.get(key) {
            Some(raw) => raw,
            None if listed(M::appends(), key) => return M::append_value(self, key),
            None => &Value::Null,
        };
        if let Some(value) = M::accessor(self, key, raw) {
            return value;
        }
        match M::cast_for(key) {
            Some(cast) => cast_value(cast, raw),
            None => raw.clone(),
        }
    }

    /// The stored value, uncast
    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn get_date(&self, key: &str) -> Option<NaiveDateTime> {
        self.attributes.get(key).and_then(parse_datetime)
    }

    pub fn attributes(&self) -> &Row {
        &self.attributes
    }

    pub fn get_original(&self, key: &str) -> Option<&Value> {
        self.original.get(key)
    }

    pub fn original(&self) -> &Row {
        &self.original
    }

    /// Attributes whose current value is not equivalent to the snapshot
    pub fn get_dirty(&self) -> Row {
        self.attributes
            .iter()
            .filter(|(key, value)| !is_equivalent(M::cast_for(key), value, self.original.get(key.as_str())))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        !self.get_dirty().is_empty()
    }

    pub fn is_dirty_attribute(&self, key: &str) -> bool {
        self.get_dirty().contains_key(key)
    }

    pub fn is_clean(&self) -> bool {
        !self.is_dirty()
    }

    /// Attributes written by the last successful update
    pub fn get_changes(&self) -> &Row {
        &self.changes
    }

    pub fn was_changed(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn was_changed_attribute(&self, key: &str) -> bool {
        self.changes.contains_key(key)
    }

    /// Take the current attributes as the new snapshot
    pub fn sync_original(&mut self) -> &mut Self {
        self.original = self.attributes.clone();
        self
    }

    pub(crate) fn sync_changes(&mut self) {
        self.changes = self.get_dirty();
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn was_recently_created(&self) -> bool {
        self.was_recently_created
    }

    /// Current primary key value, `Null` when unset or when the model has no key
    pub fn key(&self) -> Value {
        M::primary_key()
            .and_then(|pk| self.attributes.get(pk).cloned())
            .unwrap_or(Value::Null)
    }

    pub fn set_relation<R>(&mut self, name: &str, value: R) -> &mut Self
    where
        R: Arrayable + Send + Sync + 'static,
    {
        self.relations.insert(name.to_string(), Arc::new(value));
        self
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    pub fn relation_loaded(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    pub fn unset_relation(&mut self, name: &str) -> &mut Self {
        self.relations.shift_remove(name);
        self
    }

    fn is_serialized(key: &str) -> bool {
        let visible = M::visible();
        (visible.is_empty() || listed(visible, key)) && !listed(M::hidden(), key)
    }

    pub fn to_json(&self) -> OrmResult<String> {
        Ok(serde_json::to_string(&self.to_array())?)
    }
}

impl<M: Model> Arrayable for Record<M> {
    /// Visible cast attributes, then appended values, then relations.
    fn to_array(&self) -> Value {
        let mut out = serde_json::Map::new();
        for key in self.attributes.keys() {
            if Self::is_serialized(key) {
                out.insert(key.clone(), self.get_attribute(key));
            }
        }
        for name in M::appends() {
            if Self::is_serialized(name) {
                out.insert(name.to_string(), M::append_value(self, name));
            }
        }
        for (name, relation) in &self.relations {
            if Self::is_serialized(name) {
                out.insert(name.clone(), relation.to_array());
            }
        }
        Value::Object(out)
    }

    fn data_get(&self, path: &str) -> Value {
        match path.split_once('.') {
            None if self.attributes.contains_key(path) || listed(M::appends(), path) => self.get_attribute(path),
            _ => crate::collection::data_get(&self.to_array(), path),
        }
    }
}

impl<M: Model> Serialize for Record<M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_array().serialize(serializer)
    }
}

impl<M: Model> Hydrate for Record<M> {
    fn hydrate(row: Row) -> OrmResult<Self> {
        Ok(Self::from_row(row))
    }

    fn key_name() -> &'static str {
        match M::primary_key() {
            Some(key) => key,
            None => {
                tracing::debug!(model = %super::model_name::<M>(), "model has no primary key, keying by id");
                "id"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use crate::model::CastType;
    use serde_json::json;

    struct User;

    impl Model for User {
        fn fillable() -> &'static [&'static str] {
            &["name", "credits", "settings"]
        }

        fn hidden() -> &'static [&'static str] {
            &["password"]
        }

        fn casts() -> &'static [(&'static str, CastType)] {
            &[
                ("credits", CastType::Int),
                ("settings", CastType::Object),
                ("birthday", CastType::Date),
            ]
        }

        fn appends() -> &'static [&'static str] {
            &["display_name"]
        }

        fn append_value(record: &Record<Self>, name: &str) -> Value {
            match name {
                "display_name" => json!(format!("@{}", record.get_attribute("name").as_str().unwrap_or_default())),
                _ => Value::Null,
            }
        }
    }

    struct Guarded;
    impl Model for Guarded {}

    struct Keyless;

    impl Model for Keyless {
        fn primary_key() -> Option<&'static str> {
            None
        }
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_keyless_model_falls_back_to_id_with_debug_log() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let key = tracing::subscriber::with_default(subscriber, <Record<Keyless> as Hydrate>::key_name);
        assert_eq!(key, "id");
        assert_eq!(<Record<User> as Hydrate>::key_name(), "id");

        let output = String::from_utf8(captured.0.lock().clone()).unwrap();
        assert!(output.contains("model has no primary key"));
        assert!(output.contains("Keyless"));
    }

    struct Open;
    impl Model for Open {
        fn guarded() -> &'static [&'static str] {
            &["is_admin"]
        }
    }

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => Row::new(),
        }
    }

    #[test]
    fn test_hydrated_record_is_clean() {
        let record = Record::<User>::from_row(row(json!({"id": 1, "name": "Ann", "credits": 10})));
        assert!(record.exists());
        assert!(!record.is_dirty());
        assert!(record.get_dirty().is_empty());
    }

    #[test]
    fn test_mutation_marks_exactly_one_key_dirty() {
        let mut record = Record::<User>::from_row(row(json!({"id": 1, "name": "Ann", "credits": 10})));
        record.set_attribute("credits", 20);
        assert!(record.is_dirty());
        assert_eq!(record.get_dirty(), row(json!({"credits": 20})));
        assert!(record.is_dirty_attribute("credits"));
        assert!(!record.is_dirty_attribute("name"));
        record.sync_original();
        assert!(record.is_clean());
    }

    #[test]
    fn test_equivalent_reassignment_is_not_dirty() {
        let mut record = Record::<User>::from_row(row(json!({"credits": 10, "birthday": "1990-05-01"})));
        record.set_attribute("credits", "10");
        record.set_attribute("birthday", "1990-05-01 00:00:00");
        assert!(record.is_clean());
    }

    #[test]
    fn test_new_attribute_is_dirty() {
        let mut record = Record::<User>::from_row(row(json!({"id": 1})));
        record.set_attribute("nickname", Value::Null);
        assert!(record.is_dirty_attribute("nickname"));
    }

    #[test]
    fn test_fill_respects_fillable() {
        let mut record = Record::<User>::new();
        record.fill(row(json!({"name": "Ann", "is_admin": true})));
        assert_eq!(record.attributes(), &row(json!({"name": "Ann"})));
    }

    #[test]
    fn test_default_guard_blocks_everything() {
        let mut record = Record::<Guarded>::new();
        record.fill(row(json!({"name": "Ann"})));
        assert!(record.attributes().is_empty());
        record.force_fill(row(json!({"name": "Ann"})));
        assert_eq!(record.get_attribute("name"), json!("Ann"));
    }

    #[test]
    fn test_explicit_guard_without_fillable() {
        let mut record = Record::<Open>::new();
        record.fill(row(json!({"name": "Ann", "is_admin": true, "_token": "x"})));
        assert_eq!(record.attributes(), &row(json!({"name": "Ann"})));
    }

    #[test]
    fn test_casts_apply_on_read_only() {
        let mut record = Record::<User>::new();
        record.set_attribute("credits", "42").set_attribute("settings", r#"{"theme":"dark"}"#);
        assert_eq!(record.get_attribute("credits"), json!(42));
        assert_eq!(record.get_raw("credits"), Some(&json!("42")));
        assert_eq!(record.get_attribute("settings"), json!({"theme": "dark"}));
    }

    #[test]
    fn test_to_array_hides_casts_appends_and_relations() {
        let mut record = Record::<User>::from_row(row(json!({
            "id": 1,
            "name": "Ann",
            "credits": "10",
            "password": "secret",
        })));
        record.set_relation("posts", Collection::from_vec(vec![json!({"id": 5})]));
        assert_eq!(
            record.to_array(),
            json!({
                "id": 1,
                "name": "Ann",
                "credits": 10,
                "display_name": "@Ann",
                "posts": [{"id": 5}],
            })
        );
        assert!(record.relation_loaded("posts"));
        assert!(!record.to_json().unwrap().contains("secret"));
    }

    #[test]
    fn test_key_reads_primary_key() {
        let record = Record::<User>::from_row(row(json!({"id": 9})));
        assert_eq!(record.key(), json!(9));
        assert_eq!(<Record<User> as Hydrate>::key_name(), "id");
    }
}
