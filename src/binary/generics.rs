//! Generic method references, one per distinct method spec.

use std::collections::{hash_map::Entry, HashMap};

use crate::{binary::Registration, metadata::GlobalMetadata, Result};

/// A concrete instantiation of a generic method as recorded by the native registration.
///
/// Type arguments are indices into [`Registration::types`] and are resolved into type contexts
/// by the assembly that declares the method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericMethodRef {
    /// Method spec this reference was built from
    pub spec_index: usize,
    /// Name of the assembly declaring [`Self::declaring_type`]
    pub declaring_assembly: String,
    /// Type definition index of the declaring type
    pub declaring_type: i32,
    /// Method definition index of the uninstantiated generic method
    pub base_method: i32,
    /// Name of the base method, for diagnostics
    pub base_method_name: String,
    /// Declaring type arguments, empty if the declaring type is not instantiated
    pub type_generic_params: Vec<usize>,
    /// Method arguments, empty if only the declaring type is instantiated
    pub method_generic_params: Vec<usize>,
    /// Entry point of the shared or specialised code, 0 if none was generated
    pub generic_variant_ptr: u64,
}

impl GenericMethodRef {
    /// Build one reference per distinct `(method, type arguments, method arguments)` triple.
    ///
    /// Identical specs collapse into the first one; its pointer is taken from the first of
    /// them that has generated code.
    ///
    /// # Errors
    /// Returns `Malformed` if a method spec refers to a method, type, image or generic
    /// instance that does not exist.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn collect(registration: &Registration, metadata: &GlobalMetadata) -> Result<Vec<GenericMethodRef>> {
        let pointers = registration.generic_method_pointers_by_spec();
        let mut seen: HashMap<(i32, Vec<usize>, Vec<usize>), usize> = HashMap::new();
        let mut refs: Vec<GenericMethodRef> = Vec::new();

        for (spec_index, spec) in registration.method_specs.iter().enumerate() {
            let Some(method) = metadata.methods.get(spec.method_definition_index) else {
                return Err(malformed_error!(
                    "Method spec {} refers to missing method {}",
                    spec_index,
                    spec.method_definition_index
                ));
            };

            let type_generic_params = registration.generic_inst_types(spec.class_index_index)?.to_vec();
            let method_generic_params = registration.generic_inst_types(spec.method_index_index)?.to_vec();

            let key = (
                spec.method_definition_index,
                type_generic_params.clone(),
                method_generic_params.clone(),
            );
            let pointer = pointers.get(&spec_index).copied().unwrap_or(0);
            match seen.entry(key) {
                Entry::Occupied(entry) => {
                    let existing = &mut refs[*entry.get()];
                    if existing.generic_variant_ptr == 0 {
                        existing.generic_variant_ptr = pointer;
                    }
                    continue;
                }
                Entry::Vacant(entry) => {
                    entry.insert(refs.len());
                }
            }

            refs.push(GenericMethodRef {
                spec_index,
                declaring_assembly: declaring_assembly_name(metadata, method.declaring_type)?.to_string(),
                declaring_type: method.declaring_type,
                base_method: spec.method_definition_index,
                base_method_name: method.name(metadata)?.to_string(),
                type_generic_params,
                method_generic_params,
                generic_variant_ptr: pointer,
            });
        }

        tracing::debug!(
            specs = registration.method_specs.len(),
            unique = refs.len(),
            "collected generic method references"
        );

        Ok(refs)
    }
}

/// Name of the assembly whose image contains type definition `type_index`
fn declaring_assembly_name(metadata: &GlobalMetadata, type_index: i32) -> Result<&str> {
    let image = metadata
        .images
        .iter()
        .find(|image| {
            let start = i64::from(image.type_start);
            (start..start + i64::from(image.type_count)).contains(&i64::from(type_index))
        })
        .ok_or_else(|| malformed_error!("Type {} is not part of any image", type_index))?;

    let assembly = metadata
        .assemblies
        .get(image.assembly_index)
        .ok_or_else(|| malformed_error!("Image refers to missing assembly {}", image.assembly_index))?;

    assembly.aname.name(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        binary::{GenericInst, GenericMethodFunctions, MethodSpec},
        metadata::MetadataVersion,
        test::MetadataBuilder,
    };

    #[test]
    fn test_collect_dedups_specs() {
        let mut builder = MetadataBuilder::new(MetadataVersion::new(27.0));
        let assembly = builder.assembly("Game", "Game.dll");
        let ty = builder.type_def(assembly, "Game", "Util");
        let method = builder.method(ty, "Convert", &[]);
        let metadata = builder.build().unwrap();

        let spec = MethodSpec {
            method_definition_index: method,
            class_index_index: -1,
            method_index_index: 0,
        };
        let registration = Registration {
            generic_insts: vec![GenericInst { types: vec![4] }],
            method_specs: vec![spec.clone(), spec],
            generic_method_table: vec![GenericMethodFunctions {
                generic_method_index: 1,
                method_index: 0,
                ..GenericMethodFunctions::default()
            }],
            generic_method_pointers: vec![0x1000],
            ..Registration::default()
        };

        let refs = GenericMethodRef::collect(&registration, &metadata).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].declaring_assembly, "Game");
        assert_eq!(refs[0].base_method_name, "Convert");
        assert!(refs[0].type_generic_params.is_empty());
        assert_eq!(refs[0].method_generic_params, vec![4]);
        assert_eq!(refs[0].spec_index, 0);
        // the first spec has no code of its own, the duplicate supplies it
        assert_eq!(refs[0].generic_variant_ptr, 0x1000);
    }

    #[test]
    fn test_collect_missing_method() {
        let mut builder = MetadataBuilder::new(MetadataVersion::new(27.0));
        builder.assembly("Game", "Game.dll");
        let metadata = builder.build().unwrap();

        let registration = Registration {
            method_specs: vec![MethodSpec {
                method_definition_index: 9,
                class_index_index: -1,
                method_index_index: -1,
            }],
            ..Registration::default()
        };
        assert!(GenericMethodRef::collect(&registration, &metadata).is_err());
    }
}
