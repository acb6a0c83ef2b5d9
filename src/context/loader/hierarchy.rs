//! Base types, interfaces and generic parameter constraints.
use std::sync::Arc;

use rayon::prelude::*;

use crate::{
    context::{
        loader::{index_slice, set_once, ContextLoader, LoadPhase},
        typesystem::TypeContextRef,
        ApplicationContext,
    },
    Error, Result,
};

/// Resolves the inheritance edges of every defined type and the constraints of every generic
/// parameter. Both may refer to generic instances, so this runs after generic parameters exist.
pub(crate) struct HierarchyLoader;

impl ContextLoader for HierarchyLoader {
    #[tracing::instrument(level = "debug", skip_all)]
    fn load(&self, app: &Arc<ApplicationContext>) -> Result<()> {
        let metadata = app.metadata();

        app.all_types().par_iter().try_for_each(|ty| {
            let Some(defined) = ty.as_defined() else {
                return Ok(());
            };
            let assembly = ty.declaring_assembly().ok_or(Error::DroppedReference)?;
            let definition = defined.definition();

            let base = if definition.parent_index >= 0 {
                Some(TypeContextRef::new(&assembly.resolve_il2cpp_type(definition.parent_index)?))
            } else {
                None
            };
            set_once(&defined.base, base, "base type")?;

            let interfaces = index_slice(
                &metadata.interface_indices,
                definition.interfaces_start,
                usize::from(definition.interfaces_count),
            )?
            .iter()
            .map(|&index| Ok(TypeContextRef::new(&assembly.resolve_il2cpp_type(index)?)))
            .collect::<Result<Vec<_>>>()?;
            set_once(&defined.interfaces, interfaces, "interfaces")
        })?;

        let parameters = app.generic_parameters.get().map_or(&[][..], Vec::as_slice);
        parameters.par_iter().try_for_each(|ty| {
            let Some(parameter) = ty.as_generic_parameter() else {
                return Ok(());
            };
            let assembly = ty.declaring_assembly().ok_or(Error::DroppedReference)?;
            let row = metadata
                .generic_parameters
                .get(parameter.index)
                .ok_or_else(|| malformed_error!("Generic parameter {} vanished", parameter.index))?;

            let count = usize::try_from(row.constraints_count)
                .map_err(|_| malformed_error!("Negative constraint count on {}", parameter.name))?;
            let constraints = index_slice(
                &metadata.generic_parameter_constraints,
                i32::from(row.constraints_start),
                count,
            )?
            .iter()
            .map(|&index| Ok(TypeContextRef::new(&assembly.resolve_il2cpp_type(index)?)))
            .collect::<Result<Vec<_>>>()?;
            set_once(&parameter.constraints, constraints, "constraints")
        })?;

        tracing::debug!(synthesized = app.interner.len(), "resolved type hierarchy");
        Ok(())
    }

    fn phase(&self) -> LoadPhase {
        LoadPhase::Hierarchy
    }

    fn dependencies(&self) -> &'static [LoadPhase] {
        &[LoadPhase::Types, LoadPhase::GenericParameters, LoadPhase::Nesting]
    }
}
