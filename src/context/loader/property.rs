//! Property contexts of defined types.
use std::sync::Arc;

use rayon::prelude::*;

use crate::{
    context::{
        loader::{set_once, ContextLoader, LoadPhase},
        members::{MethodContextRc, PropertyContext},
        typesystem::TypeContext,
        ApplicationContext,
    },
    Result,
};

/// Builds the properties of every defined type and wires their accessors.
pub(crate) struct PropertyLoader;

impl ContextLoader for PropertyLoader {
    #[tracing::instrument(level = "debug", skip_all)]
    fn load(&self, app: &Arc<ApplicationContext>) -> Result<()> {
        let metadata = app.metadata();

        app.all_types().par_iter().try_for_each(|ty| {
            let Some(defined) = ty.as_defined() else {
                return Ok(());
            };
            let definition = defined.definition();
            let start = definition.property_start;

            let properties = metadata
                .properties
                .range(start, usize::from(definition.property_count))?
                .iter()
                .enumerate()
                .map(|(offset, property)| {
                    let name = property.name(metadata)?.to_string();
                    let getter = accessor(ty, property.get, &name)?;
                    let setter = accessor(ty, property.set, &name)?;

                    Ok(Arc::new(PropertyContext::new(
                        metadata.clone(),
                        start as usize + offset,
                        name,
                        ty,
                        getter.as_ref(),
                        setter.as_ref(),
                    )))
                })
                .collect::<Result<Vec<_>>>()?;

            set_once(&defined.properties, properties, "properties")
        })?;

        tracing::debug!(properties = metadata.properties.len(), "loaded properties");
        Ok(())
    }

    fn phase(&self) -> LoadPhase {
        LoadPhase::Properties
    }

    fn dependencies(&self) -> &'static [LoadPhase] {
        &[LoadPhase::Methods]
    }
}

/// Accessor indices are relative to the declaring type's first method; -1 means none
pub(super) fn accessor(ty: &TypeContext, relative: i32, member: &str) -> Result<Option<MethodContextRc>> {
    let Ok(relative) = usize::try_from(relative) else {
        return Ok(None);
    };

    ty.methods()
        .get(relative)
        .cloned()
        .map(Some)
        .ok_or_else(|| malformed_error!("Accessor {} of {}::{} is out of range", relative, ty, member))
}
