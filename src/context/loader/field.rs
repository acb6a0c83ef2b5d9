//! Field contexts of defined types.
use std::sync::Arc;

use rayon::prelude::*;

use crate::{
    context::{
        loader::{set_once, ContextLoader, LoadPhase},
        members::FieldContext,
        ApplicationContext,
    },
    metadata::FieldAttributes,
    Error, Result,
};

/// Builds the fields of every defined type. Field flags live on the field's type use.
pub(crate) struct FieldLoader;

impl ContextLoader for FieldLoader {
    #[tracing::instrument(level = "debug", skip_all)]
    fn load(&self, app: &Arc<ApplicationContext>) -> Result<()> {
        let metadata = app.metadata();
        let registration = app.registration();

        app.all_types().par_iter().try_for_each(|ty| {
            let Some(defined) = ty.as_defined() else {
                return Ok(());
            };
            let assembly = ty.declaring_assembly().ok_or(Error::DroppedReference)?;
            let definition = defined.definition();
            let start = definition.field_start;

            let fields = metadata
                .fields
                .range(start, usize::from(definition.field_count))?
                .iter()
                .enumerate()
                .map(|(offset, field)| {
                    let field_type = assembly.resolve_il2cpp_type(field.type_index)?;
                    let flags = registration
                        .type_at(field.type_index)
                        .map_or(FieldAttributes::empty(), |ty| FieldAttributes::from_bits_retain(ty.attrs));

                    Ok(Arc::new(FieldContext::new(
                        metadata.clone(),
                        start as usize + offset,
                        field.name(metadata)?.to_string(),
                        flags,
                        ty,
                        &field_type,
                    )))
                })
                .collect::<Result<Vec<_>>>()?;

            set_once(&defined.fields, fields, "fields")
        })?;

        tracing::debug!(fields = metadata.fields.len(), "loaded fields");
        Ok(())
    }

    fn phase(&self) -> LoadPhase {
        LoadPhase::Fields
    }

    fn dependencies(&self) -> &'static [LoadPhase] {
        &[LoadPhase::Hierarchy]
    }
}
