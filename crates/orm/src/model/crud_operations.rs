//! Record persistence: query, save, delete and reload

use serde_json::Value;

use crate::backends::{format_datetime, Row};
use crate::collection::Collection;
use crate::connection::Connection;
use crate::database::DatabaseManager;
use crate::error::{OrmError, OrmResult};
use crate::events::ModelEvent;
use crate::observers::{ModelMeta, ModelRegistry};
use crate::query::QueryBuilder;

use super::core_trait::{model_name, Model};
use super::record::Record;
use super::{CREATED_AT, UPDATED_AT};

fn fresh_timestamp() -> Value {
    Value::String(format_datetime(chrono::Utc::now().naive_utc()))
}

impl<M: Model> Record<M> {
    /// Query builder on the model's table and connection, hydrating records
    pub fn query() -> QueryBuilder<Record<M>> {
        QueryBuilder::new()
            .from(M::table_name())
            .on_connection(M::connection())
    }

    pub async fn all(db: &DatabaseManager) -> OrmResult<Collection<Self>> {
        Self::query().get(db).await
    }

    pub async fn find(db: &DatabaseManager, id: impl Into<Value>) -> OrmResult<Option<Self>> {
        Self::query().find(db, id).await
    }

    /// Like [`find`](Self::find), but a miss is [`OrmError::ModelNotFound`].
    pub async fn find_or_fail(db: &DatabaseManager, id: impl Into<Value>) -> OrmResult<Self> {
        let id = id.into();
        match Self::find(db, id.clone()).await? {
            Some(record) => Ok(record),
            None => Err(OrmError::ModelNotFound {
                model: model_name::<M>(),
                key: match id {
                    Value::String(s) => s,
                    other => other.to_string(),
                },
            }),
        }
    }

    /// Fill a new record and save it. A cancelled save returns the unsaved record.
    pub async fn create(db: &DatabaseManager, attributes: Row) -> OrmResult<Self> {
        let mut record = Self::new();
        record.fill(attributes);
        record.save(db).await?;
        Ok(record)
    }

    fn key_column() -> OrmResult<&'static str> {
        M::primary_key().ok_or_else(|| OrmError::MissingPrimaryKey {
            model: model_name::<M>(),
        })
    }

    /// Key value the row is stored under, taken from the snapshot so a
    /// changed key attribute still addresses the original row.
    fn stored_key(&self) -> OrmResult<(&'static str, Value)> {
        let column = Self::key_column()?;
        let value = self
            .original
            .get(column)
            .or_else(|| self.attributes.get(column))
            .cloned()
            .unwrap_or(Value::Null);
        if value.is_null() {
            return Err(OrmError::MissingPrimaryKey {
                model: model_name::<M>(),
            });
        }
        Ok((column, value))
    }

    /// Insert a new record or write the dirty attributes of a persisted one.
    ///
    /// Events fire as saving, creating or updating, the statement, created
    /// or updated, then saved. `Ok(false)` means a listener cancelled the
    /// save. A persisted record with nothing dirty issues no statement.
    pub async fn save(&mut self, db: &DatabaseManager) -> OrmResult<bool> {
        let mut conn = db.connection(M::connection()).await?;
        self.save_on(&mut conn, db.registry()).await
    }

    pub async fn save_on(&mut self, conn: &mut Connection, registry: &ModelRegistry) -> OrmResult<bool> {
        let meta = registry.meta::<M>();
        if !meta.fire_before(ModelEvent::Saving, self).await? {
            return Ok(false);
        }

        let saved = if self.exists {
            if self.is_dirty() {
                self.perform_update(conn, &meta).await?
            } else {
                true
            }
        } else {
            self.perform_insert(conn, &meta).await?
        };

        if saved {
            meta.fire_after(ModelEvent::Saved, self).await?;
            self.sync_original();
        }
        Ok(saved)
    }

    async fn perform_update(&mut self, conn: &mut Connection, meta: &ModelMeta<M>) -> OrmResult<bool> {
        if !meta.fire_before(ModelEvent::Updating, self).await? {
            return Ok(false);
        }
        if M::uses_timestamps() && !self.is_dirty_attribute(UPDATED_AT) {
            self.set_attribute(UPDATED_AT, fresh_timestamp());
        }

        let dirty = self.get_dirty();
        if !dirty.is_empty() {
            let (column, key) = self.stored_key()?;
            Self::query().where_eq(column, key).update_on(conn, dirty).await?;
            self.sync_changes();
            meta.fire_after(ModelEvent::Updated, self).await?;
        }
        Ok(true)
    }

    async fn perform_insert(&mut self, conn: &mut Connection, meta: &ModelMeta<M>) -> OrmResult<bool> {
        if !meta.fire_before(ModelEvent::Creating, self).await? {
            return Ok(false);
        }
        if M::uses_timestamps() {
            let now = fresh_timestamp();
            if !self.attributes.contains_key(UPDATED_AT) {
                self.set_attribute(UPDATED_AT, now.clone());
            }
            if !self.attributes.contains_key(CREATED_AT) {
                self.set_attribute(CREATED_AT, now);
            }
        }

        let query = Self::query();
        match M::primary_key() {
            Some(column) if M::incrementing() => {
                let attributes = self.attributes.clone();
                if let Some(id) = query.insert_get_id_on(conn, attributes, column).await? {
                    self.set_attribute(column, id);
                }
            }
            _ => {
                query.insert_many_on(conn, vec![self.attributes.clone()]).await?;
            }
        }

        self.exists = true;
        self.was_recently_created = true;
        meta.fire_after(ModelEvent::Created, self).await?;
        Ok(true)
    }

    /// Fill then save. A record that was never saved is left untouched.
    pub async fn update(&mut self, db: &DatabaseManager, attributes: Row) -> OrmResult<bool> {
        if !self.exists {
            return Ok(false);
        }
        self.fill(attributes);
        self.save(db).await
    }

    /// Delete the stored row.
    ///
    /// Fails with [`OrmError::MissingPrimaryKey`] when the model has no key,
    /// returns `Ok(false)` for unsaved records and cancelled deletes.
    pub async fn delete(&mut self, db: &DatabaseManager) -> OrmResult<bool> {
        Self::key_column()?;
        if !self.exists {
            return Ok(false);
        }
        let mut conn = db.connection(M::connection()).await?;
        self.delete_on(&mut conn, db.registry()).await
    }

    pub async fn delete_on(&mut self, conn: &mut Connection, registry: &ModelRegistry) -> OrmResult<bool> {
        Self::key_column()?;
        if !self.exists {
            return Ok(false);
        }
        let meta = registry.meta::<M>();
        if !meta.fire_before(ModelEvent::Deleting, self).await? {
            return Ok(false);
        }

        let (column, key) = self.stored_key()?;
        Self::query().where_eq(column, key).delete_on(conn).await?;
        self.exists = false;

        meta.fire_after(ModelEvent::Deleted, self).await?;
        Ok(true)
    }

    /// Load and delete each record with one of `ids`, firing delete events
    /// per record. Returns how many were deleted.
    pub async fn destroy<I, V>(db: &DatabaseManager, ids: I) -> OrmResult<u64>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let column = Self::key_column()?;
        let ids: Vec<Value> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return Ok(0);
        }

        let records = Self::query().where_in(column, ids).get(db).await?;
        let mut deleted = 0;
        for (_, mut record) in records {
            if record.delete(db).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// A newly loaded copy of the stored row; `None` for unsaved or vanished records.
    pub async fn fresh(&self, db: &DatabaseManager) -> OrmResult<Option<Self>> {
        if !self.exists {
            return Ok(None);
        }
        let (column, key) = self.stored_key()?;
        Self::query().where_eq(column, key).first(db).await
    }

    /// Reload attributes from the database in place, discarding unsaved changes.
    pub async fn refresh(&mut self, db: &DatabaseManager) -> OrmResult<&mut Self> {
        if !self.exists {
            return Ok(self);
        }
        match self.fresh(db).await? {
            Some(fresh) => {
                self.attributes = fresh.attributes;
                self.sync_original();
                Ok(self)
            }
            None => Err(OrmError::ModelNotFound {
                model: model_name::<M>(),
                key: self.key().to_string(),
            }),
        }
    }
}
