//! Generic parameter contexts.
use std::sync::{Arc, OnceLock};

use rayon::prelude::*;

use crate::{
    context::{
        loader::{set_once, ContextLoader, LoadPhase},
        typesystem::{GenericParameterContext, GenericParameterScope, TypeContext, TypeKind},
        ApplicationContext,
    },
    Error, Result,
};

/// Creates one generic parameter [`TypeContext`] per generic parameter row and attaches the
/// parameters of generic type definitions. Method parameters are attached by the method loader.
pub(crate) struct GenericParameterLoader;

impl ContextLoader for GenericParameterLoader {
    #[tracing::instrument(level = "debug", skip_all)]
    fn load(&self, app: &Arc<ApplicationContext>) -> Result<()> {
        let metadata = app.metadata();
        let count = metadata.generic_parameters.len();
        let base_id = app.interner.reserve(count);

        let parameters = (0..count)
            .into_par_iter()
            .map(|index| {
                let parameter = &metadata.generic_parameters[index];
                let container = metadata
                    .generic_containers
                    .get(parameter.owner_index)
                    .ok_or_else(|| {
                        malformed_error!("Generic parameter {} has no container", index)
                    })?;

                let (scope, owner_type) = if container.is_method() {
                    let method = metadata.methods.get(container.owner_index).ok_or_else(|| {
                        malformed_error!("Generic container owned by missing method {}", container.owner_index)
                    })?;
                    (GenericParameterScope::Method, method.declaring_type)
                } else {
                    (GenericParameterScope::Type, container.owner_index)
                };

                let assembly = app
                    .type_by_definition_index(owner_type)
                    .and_then(|ty| ty.declaring_assembly())
                    .ok_or_else(|| Error::TypeNotFound(format!("type definition {owner_type}")))?;

                Ok(TypeContext::new(
                    base_id + index as u64,
                    &assembly,
                    TypeKind::GenericParameter(GenericParameterContext {
                        index: i32::try_from(index).map_err(|_| malformed_error!("Too many generic parameters"))?,
                        name: parameter.name(metadata)?.to_string(),
                        ordinal: usize::from(parameter.num),
                        scope,
                        flags: parameter.attributes(),
                        constraints: OnceLock::new(),
                    }),
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        app.all_types().par_iter().try_for_each(|ty| {
            let Some(defined) = ty.as_defined() else {
                return Ok(());
            };
            let Some(container) = metadata
                .generic_containers
                .get(defined.definition().generic_container_index)
            else {
                return Ok(());
            };

            let start = usize::try_from(container.generic_parameter_start)
                .map_err(|_| malformed_error!("Negative generic parameter start"))?;
            let own = parameters
                .get(start..start + container.parameter_count())
                .ok_or_else(|| malformed_error!("Generic container of {} exceeds the parameter table", ty))?;
            set_once(&defined.generic_parameters, own.to_vec(), "type generic parameters")
        })?;

        tracing::debug!(parameters = parameters.len(), "loaded generic parameters");
        set_once(&app.generic_parameters, parameters, "generic parameters")
    }

    fn phase(&self) -> LoadPhase {
        LoadPhase::GenericParameters
    }

    fn dependencies(&self) -> &'static [LoadPhase] {
        &[LoadPhase::Types]
    }
}
