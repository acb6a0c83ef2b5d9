//! Event contexts of defined types.
use std::sync::Arc;

use rayon::prelude::*;

use crate::{
    context::{
        loader::{property::accessor, set_once, ContextLoader, LoadPhase},
        members::{EventAccessors, EventContext},
        ApplicationContext,
    },
    Error, Result,
};

/// Builds the events of every defined type and wires their accessors.
pub(crate) struct EventLoader;

impl ContextLoader for EventLoader {
    #[tracing::instrument(level = "debug", skip_all)]
    fn load(&self, app: &Arc<ApplicationContext>) -> Result<()> {
        let metadata = app.metadata();

        app.all_types().par_iter().try_for_each(|ty| {
            let Some(defined) = ty.as_defined() else {
                return Ok(());
            };
            let assembly = ty.declaring_assembly().ok_or(Error::DroppedReference)?;
            let definition = defined.definition();
            let start = definition.event_start;

            let events = metadata
                .events
                .range(start, usize::from(definition.event_count))?
                .iter()
                .enumerate()
                .map(|(offset, event)| {
                    let name = event.name(metadata)?.to_string();
                    let event_type = assembly.resolve_il2cpp_type(event.type_index)?;
                    let add = accessor(ty, event.add, &name)?;
                    let remove = accessor(ty, event.remove, &name)?;
                    let raise = accessor(ty, event.raise, &name)?;

                    Ok(Arc::new(EventContext::new(
                        metadata.clone(),
                        start as usize + offset,
                        name,
                        ty,
                        &event_type,
                        EventAccessors {
                            add: add.as_ref(),
                            remove: remove.as_ref(),
                            raise: raise.as_ref(),
                        },
                    )))
                })
                .collect::<Result<Vec<_>>>()?;

            set_once(&defined.events, events, "events")
        })?;

        tracing::debug!(events = metadata.events.len(), "loaded events");
        Ok(())
    }

    fn phase(&self) -> LoadPhase {
        LoadPhase::Events
    }

    fn dependencies(&self) -> &'static [LoadPhase] {
        &[LoadPhase::Methods]
    }
}
