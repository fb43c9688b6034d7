//! Per-model-type runtime state: boot flag, observers and closure listeners
//!
//! A [`ModelRegistry`] lives inside a [`DatabaseManager`](crate::DatabaseManager),
//! so two managers never share listeners; tests get isolation by building
//! their own manager.

use std::any::{Any, TypeId};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::event_error::EventError;
use crate::events::{ModelEvent, ModelObserver};
use crate::model::{Model, Record};

type Listener<M> = dyn Fn(&mut Record<M>) -> Result<(), EventError> + Send + Sync;

/// Event table of one model type
pub struct ModelMeta<M: Model> {
    observers: RwLock<Vec<Arc<dyn ModelObserver<M>>>>,
    listeners: RwLock<Vec<(ModelEvent, Arc<Listener<M>>)>>,
}

impl<M: Model> ModelMeta<M> {
    fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn observe<O>(&self, observer: O)
    where
        O: ModelObserver<M> + 'static,
    {
        self.observers.write().push(Arc::new(observer));
    }

    /// Register a closure for one event
    pub fn listen<F>(&self, event: ModelEvent, listener: F)
    where
        F: Fn(&mut Record<M>) -> Result<(), EventError> + Send + Sync + 'static,
    {
        self.listeners.write().push((event, Arc::new(listener)));
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Closure listeners run first, then observers, each in registration
    /// order. The first error stops dispatch.
    pub(crate) async fn fire(&self, event: ModelEvent, record: &mut Record<M>) -> Result<(), EventError> {
        let listeners: Vec<Arc<Listener<M>>> = self
            .listeners
            .read()
            .iter()
            .filter(|(e, _)| *e == event)
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            (*listener)(record)?;
        }

        let observers: Vec<Arc<dyn ModelObserver<M>>> = self.observers.read().clone();
        for observer in observers {
            match event {
                ModelEvent::Saving => observer.saving(record).await?,
                ModelEvent::Saved => observer.saved(record).await?,
                ModelEvent::Creating => observer.creating(record).await?,
                ModelEvent::Created => observer.created(record).await?,
                ModelEvent::Updating => observer.updating(record).await?,
                ModelEvent::Updated => observer.updated(record).await?,
                ModelEvent::Deleting => observer.deleting(record).await?,
                ModelEvent::Deleted => observer.deleted(record).await?,
            }
        }
        Ok(())
    }
}

/// Registry of [`ModelMeta`] keyed by model type
#[derive(Default)]
pub struct ModelRegistry {
    metas: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Meta of `M`, booting it through [`Model::boot`] on first access.
    pub fn meta<M: Model>(&self) -> Arc<ModelMeta<M>> {
        let entry = self
            .metas
            .entry(TypeId::of::<M>())
            .or_insert_with(|| {
                let meta = ModelMeta::<M>::new();
                M::boot(&meta);
                tracing::debug!(model = std::any::type_name::<M>(), "model booted");
                Arc::new(meta) as Arc<dyn Any + Send + Sync>
            })
            .clone();

        match entry.downcast::<ModelMeta<M>>() {
            Ok(meta) => meta,
            // the key is the TypeId of M, so this arm is unreachable
            Err(_) => Arc::new(ModelMeta::new()),
        }
    }

    pub fn is_booted<M: Model>(&self) -> bool {
        self.metas.contains_key(&TypeId::of::<M>())
    }

    pub fn observe<M, O>(&self, observer: O)
    where
        M: Model,
        O: ModelObserver<M> + 'static,
    {
        self.meta::<M>().observe(observer);
    }

    pub fn listen<M, F>(&self, event: ModelEvent, listener: F)
    where
        M: Model,
        F: Fn(&mut Record<M>) -> Result<(), EventError> + Send + Sync + 'static,
    {
        self.meta::<M>().listen(event, listener);
    }

    /// Number of booted model types
    pub fn len(&self) -> usize {
        self.metas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }

    /// Forget every model; the next access boots again.
    pub fn clear(&self) {
        self.metas.clear();
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry").field("models", &self.metas.len()).finish()
    }
}
