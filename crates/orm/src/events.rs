//! Model lifecycle events and observers

use std::fmt;

use async_trait::async_trait;

use crate::event_error::EventError;
use crate::model::{Model, Record};

/// Lifecycle points fired around `save` and `delete`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelEvent {
    Saving,
    Saved,
    Creating,
    Created,
    Updating,
    Updated,
    Deleting,
    Deleted,
}

impl ModelEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ModelEvent::Saving => "saving",
            ModelEvent::Saved => "saved",
            ModelEvent::Creating => "creating",
            ModelEvent::Created => "created",
            ModelEvent::Updating => "updating",
            ModelEvent::Updated => "updated",
            ModelEvent::Deleting => "deleting",
            ModelEvent::Deleted => "deleted",
        }
    }

    /// `-ing` events run before the statement and may cancel it
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            ModelEvent::Saving | ModelEvent::Creating | ModelEvent::Updating | ModelEvent::Deleting
        )
    }
}

impl fmt::Display for ModelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Observer of one model type. Every hook defaults to `Ok(())`.
///
/// Returning [`EventError::PropagationStopped`] from a cancellable hook
/// aborts the operation before any SQL runs; any other error is returned to
/// the caller.
#[async_trait]
pub trait ModelObserver<M: Model>: Send + Sync {
    async fn saving(&self, _record: &mut Record<M>) -> Result<(), EventError> {
        Ok(())
    }

    async fn saved(&self, _record: &Record<M>) -> Result<(), EventError> {
        Ok(())
    }

    async fn creating(&self, _record: &mut Record<M>) -> Result<(), EventError> {
        Ok(())
    }

    async fn created(&self, _record: &Record<M>) -> Result<(), EventError> {
        Ok(())
    }

    async fn updating(&self, _record: &mut Record<M>) -> Result<(), EventError> {
        Ok(())
    }

    async fn updated(&self, _record: &Record<M>) -> Result<(), EventError> {
        Ok(())
    }

    async fn deleting(&self, _record: &mut Record<M>) -> Result<(), EventError> {
        Ok(())
    }

    async fn deleted(&self, _record: &Record<M>) -> Result<(), EventError> {
        Ok(())
    }
}
