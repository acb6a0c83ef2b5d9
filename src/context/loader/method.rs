//! Method and parameter contexts of defined types.
use std::sync::Arc;

use rayon::prelude::*;

use crate::{
    context::{
        loader::{set_once, ContextLoader, LoadPhase},
        members::{MethodContext, ParameterContext},
        ApplicationContext,
    },
    metadata::ParameterAttributes,
    Error, Result,
};

/// Builds the methods of every defined type, with resolved parameter and return types, their
/// own generic parameters and their native entry point.
pub(crate) struct MethodLoader;

impl ContextLoader for MethodLoader {
    #[tracing::instrument(level = "debug", skip_all)]
    fn load(&self, app: &Arc<ApplicationContext>) -> Result<()> {
        let metadata = app.metadata();
        let registration = app.registration();
        let generic_parameters = app.generic_parameters.get().map_or(&[][..], Vec::as_slice);

        let counts = app
            .all_types()
            .par_iter()
            .map(|ty| {
                let Some(defined) = ty.as_defined() else {
                    return Ok(0);
                };
                let assembly = ty.declaring_assembly().ok_or(Error::DroppedReference)?;
                let definition = defined.definition();
                let start = definition.method_start;
                let rows = metadata
                    .methods
                    .range(start, usize::from(definition.method_count))?;

                let methods = rows
                    .iter()
                    .enumerate()
                    .map(|(offset, method)| {
                        let index = start as usize + offset;

                        let parameters = metadata
                            .parameters
                            .range(method.parameter_start, usize::from(method.parameter_count))?
                            .iter()
                            .enumerate()
                            .map(|(position, parameter)| {
                                let parameter_type = assembly.resolve_il2cpp_type(parameter.type_index)?;
                                let flags = registration
                                    .type_at(parameter.type_index)
                                    .map_or(ParameterAttributes::empty(), |ty| {
                                        ParameterAttributes::from_bits_retain(ty.attrs)
                                    });
                                Ok(Arc::new(ParameterContext::defined(
                                    metadata.clone(),
                                    method.parameter_start as usize + position,
                                    parameter.name(metadata)?.to_string(),
                                    position,
                                    flags,
                                    &parameter_type,
                                )))
                            })
                            .collect::<Result<Vec<_>>>()?;

                        let return_type = assembly.resolve_il2cpp_type(method.return_type)?;

                        let own_parameters = match metadata.generic_containers.get(method.generic_container_index) {
                            Some(container) => {
                                let first = usize::try_from(container.generic_parameter_start)
                                    .map_err(|_| malformed_error!("Negative generic parameter start"))?;
                                generic_parameters
                                    .get(first..first + container.parameter_count())
                                    .ok_or_else(|| {
                                        malformed_error!("Generic container of method {} exceeds the parameter table", index)
                                    })?
                                    .to_vec()
                            }
                            None => Vec::new(),
                        };

                        let pointer = registration
                            .method_pointer(app.version(), &assembly.image_name, method)
                            .unwrap_or(0);

                        Ok(Arc::new(MethodContext::defined(
                            ty,
                            metadata.clone(),
                            index,
                            method.name(metadata)?.to_string(),
                            parameters,
                            &return_type,
                            own_parameters,
                            pointer,
                        )))
                    })
                    .collect::<Result<Vec<_>>>()?;

                let count = methods.len();
                set_once(&defined.methods, methods, "methods")?;
                Ok(count)
            })
            .collect::<Result<Vec<usize>>>()?;

        tracing::debug!(methods = counts.iter().sum::<usize>(), "loaded methods");
        Ok(())
    }

    fn phase(&self) -> LoadPhase {
        LoadPhase::Methods
    }

    fn dependencies(&self) -> &'static [LoadPhase] {
        &[LoadPhase::Hierarchy, LoadPhase::GenericParameters]
    }
}
