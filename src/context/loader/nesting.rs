//! Declaring and nested types, full names and the per-assembly name index.
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use rayon::prelude::*;

use crate::{
    context::{
        loader::{index_slice, set_once, ContextLoader, LoadPhase},
        typesystem::{DefinedType, TypeContext, TypeContextRef},
        ApplicationContext,
    },
    Error, Result,
};

/// Nested types deeper than this are treated as a cycle in the nesting table
const MAX_NESTING: usize = 64;

/// Links every nested type to its declaring type, then computes full names.
pub(crate) struct NestingLoader;

impl ContextLoader for NestingLoader {
    #[tracing::instrument(level = "debug", skip_all)]
    fn load(&self, app: &Arc<ApplicationContext>) -> Result<()> {
        let metadata = app.metadata();

        app.all_types().par_iter().try_for_each(|ty| {
            let Some(defined) = ty.as_defined() else {
                return Ok(());
            };
            let definition = defined.definition();
            let nested = index_slice(
                &metadata.nested_type_indices,
                definition.nested_types_start,
                usize::from(definition.nested_type_count),
            )?;

            for &index in nested {
                let child = app
                    .type_by_definition_index(index)
                    .ok_or_else(|| Error::TypeNotFound(format!("nested type definition {index}")))?;
                let Some(child_defined) = child.as_defined() else {
                    continue;
                };

                child_defined
                    .declaring_type
                    .set(TypeContextRef::new(ty))
                    .map_err(|_| malformed_error!("Type {} is nested in more than one type", index))?;
                defined.nested_types.push(TypeContextRef::new(&child));
            }
            Ok::<_, Error>(())
        })?;

        app.all_types().par_iter().try_for_each(|ty| {
            let Some(defined) = ty.as_defined() else {
                return Ok(());
            };
            let name = qualified_name(ty, 0)?;
            if let Some(assembly) = ty.declaring_assembly() {
                // duplicate names resolve to the lowest definition index
                match assembly.types_by_full_name.entry(name.clone()) {
                    Entry::Vacant(entry) => {
                        entry.insert(ty.clone());
                    }
                    Entry::Occupied(mut entry) => {
                        let existing = entry.get().as_defined().map(DefinedType::definition_index);
                        tracing::warn!(name = %name, "type name defined more than once");
                        if existing.map_or(true, |index| index > defined.definition_index()) {
                            entry.insert(ty.clone());
                        }
                    }
                }
            }
            set_once(&defined.full_name, name, "full name")
        })?;

        tracing::debug!(types = app.all_types().len(), "linked nested types");
        Ok(())
    }

    fn phase(&self) -> LoadPhase {
        LoadPhase::Nesting
    }

    fn dependencies(&self) -> &'static [LoadPhase] {
        &[LoadPhase::Types]
    }
}

/// `Namespace.Outer/Inner`; nested types take the namespace of their outermost type
fn qualified_name(ty: &TypeContext, depth: usize) -> Result<String> {
    if depth > MAX_NESTING {
        return Err(malformed_error!("Nesting cycle at type {}", ty.default_name()));
    }

    let Some(defined) = ty.as_defined() else {
        return Ok(ty.full_name());
    };

    Ok(match ty.declaring_type() {
        Some(parent) => format!("{}/{}", qualified_name(&parent, depth + 1)?, defined.name),
        None if defined.namespace.is_empty() => defined.name.clone(),
        None => format!("{}.{}", defined.namespace, defined.name),
    })
}
