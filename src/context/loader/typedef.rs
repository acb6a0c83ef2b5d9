//! Defined type contexts.
use std::sync::Arc;

use rayon::prelude::*;

use crate::{
    binary::Il2CppTypeEnum,
    context::{
        loader::{set_once, ContextLoader, LoadPhase},
        typesystem::{DefinedType, TypeContext, TypeKind},
        ApplicationContext,
    },
    Result,
};

/// Creates one defined [`TypeContext`] per type definition, owned by the assembly whose image
/// contains it. Type ids are the definition indices offset by a reserved base.
pub(crate) struct TypeDefLoader;

impl ContextLoader for TypeDefLoader {
    #[tracing::instrument(level = "debug", skip_all)]
    fn load(&self, app: &Arc<ApplicationContext>) -> Result<()> {
        let metadata = app.metadata();
        let registration = app.registration();
        let count = metadata.type_definitions.len();
        let base_id = app.interner.reserve(count);

        let per_assembly = app
            .assemblies()
            .par_iter()
            .map(|assembly| {
                let image = assembly.image();
                let definitions = metadata
                    .type_definitions
                    .range(image.type_start, image.type_count as usize)?;

                definitions
                    .iter()
                    .enumerate()
                    .map(|(offset, definition)| {
                        let index = image.type_start as usize + offset;
                        let tag = registration
                            .type_at(definition.byval_type_index)
                            .map_or_else(
                                || {
                                    if definition.is_value_type() {
                                        Il2CppTypeEnum::ValueType
                                    } else {
                                        Il2CppTypeEnum::Class
                                    }
                                },
                                |ty| ty.kind,
                            );

                        let defined = DefinedType::new(
                            metadata.clone(),
                            index,
                            definition.name(metadata)?.to_string(),
                            definition.namespace(metadata)?.to_string(),
                            tag,
                        );
                        Ok(TypeContext::new(
                            base_id + index as u64,
                            assembly,
                            TypeKind::Defined(defined),
                        ))
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        let mut by_index = vec![None; count];
        for (assembly, types) in app.assemblies().iter().zip(per_assembly) {
            for ty in &types {
                if let Some(defined) = ty.as_defined() {
                    let slot = &mut by_index[defined.definition_index()];
                    if slot.is_some() {
                        return Err(malformed_error!(
                            "Type {} is claimed by more than one image",
                            defined.definition_index()
                        ));
                    }
                    *slot = Some(ty.clone());
                }
            }
            set_once(&assembly.types, types, "assembly types")?;
        }

        let types = by_index
            .into_iter()
            .enumerate()
            .map(|(index, ty)| ty.ok_or_else(|| malformed_error!("Type {} is not part of any image", index)))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(types = types.len(), "loaded type definitions");
        set_once(&app.types, types, "types")
    }

    fn phase(&self) -> LoadPhase {
        LoadPhase::Types
    }

    fn dependencies(&self) -> &'static [LoadPhase] {
        &[LoadPhase::Assemblies]
    }
}
