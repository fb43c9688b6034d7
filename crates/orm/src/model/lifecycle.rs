//! Event dispatch around persistence

use crate::error::{OrmError, OrmResult};
use crate::events::ModelEvent;
use crate::observers::ModelMeta;

use super::core_trait::{model_name, Model};
use super::record::Record;

impl<M: Model> ModelMeta<M> {
    /// Fire a cancellable event. `Ok(false)` means a listener stopped the
    /// operation; other listener errors are returned.
    pub(crate) async fn fire_before(&self, event: ModelEvent, record: &mut Record<M>) -> OrmResult<bool> {
        match self.fire(event, record).await {
            Ok(()) => Ok(true),
            Err(err) if err.is_cancellation() => {
                tracing::debug!(model = %model_name::<M>(), event = %event, reason = %err, "operation cancelled by listener");
                Ok(false)
            }
            Err(err) => Err(OrmError::Event(err)),
        }
    }

    /// Fire an event after the statement ran. A stop signal has nothing
    /// left to cancel and is ignored.
    pub(crate) async fn fire_after(&self, event: ModelEvent, record: &mut Record<M>) -> OrmResult<()> {
        match self.fire(event, record).await {
            Err(err) if !err.is_cancellation() => Err(OrmError::Event(err)),
            _ => Ok(()),
        }
    }
}
