//! Structural substitution of generic parameters.

use std::sync::Arc;

use crate::{
    context::{
        assembly::AssemblyContextRc,
        typesystem::{GenericParameterScope, TypeContextRc, TypeInterner, TypeKind},
    },
    Error, Result,
};

impl TypeInterner {
    /// Replace every generic parameter leaf of `ty` by its argument.
    ///
    /// Type parameters are taken from `type_args` and method parameters from `method_args`,
    /// both by ordinal. Composite shapes are only rebuilt if one of their components changed;
    /// otherwise `ty` itself is returned, so `Arc::ptr_eq(result, ty)` means "nothing to
    /// substitute". Rebuilt shapes are canonical and owned by `owner` if new.
    ///
    /// # Errors
    /// Returns [`Error::GenericOrdinalOutOfRange`] for a parameter without a matching argument.
    pub(crate) fn instantiate(
        &self,
        ty: &TypeContextRc,
        type_args: &[TypeContextRc],
        method_args: &[TypeContextRc],
        owner: &AssemblyContextRc,
    ) -> Result<TypeContextRc> {
        match &ty.kind {
            TypeKind::GenericParameter(parameter) => {
                let args = match parameter.scope {
                    GenericParameterScope::Type => type_args,
                    GenericParameterScope::Method => method_args,
                };
                args.get(parameter.ordinal)
                    .cloned()
                    .ok_or(Error::GenericOrdinalOutOfRange {
                        ordinal: parameter.ordinal,
                        count: args.len(),
                    })
            }
            TypeKind::GenericInstance { base, args } => {
                let instantiated = args
                    .iter()
                    .map(|arg| self.instantiate(arg, type_args, method_args, owner))
                    .collect::<Result<Vec<_>>>()?;

                if instantiated.iter().zip(args).all(|(new, old)| Arc::ptr_eq(new, old)) {
                    return Ok(ty.clone());
                }
                Ok(self.generic_instance(base, instantiated, owner))
            }
            TypeKind::SzArray(element) => {
                let new = self.instantiate(element, type_args, method_args, owner)?;
                Ok(if Arc::ptr_eq(&new, element) {
                    ty.clone()
                } else {
                    self.sz_array(&new, owner)
                })
            }
            TypeKind::Array { element, rank } => {
                let new = self.instantiate(element, type_args, method_args, owner)?;
                Ok(if Arc::ptr_eq(&new, element) {
                    ty.clone()
                } else {
                    self.array(&new, *rank, owner)
                })
            }
            TypeKind::Pointer(element) => {
                let new = self.instantiate(element, type_args, method_args, owner)?;
                Ok(if Arc::ptr_eq(&new, element) {
                    ty.clone()
                } else {
                    self.pointer(&new, owner)
                })
            }
            TypeKind::ByRef(element) => {
                let new = self.instantiate(element, type_args, method_args, owner)?;
                Ok(if Arc::ptr_eq(&new, element) {
                    ty.clone()
                } else {
                    self.by_ref(&new, owner)
                })
            }
            TypeKind::Defined(_) | TypeKind::FunctionPointer => Ok(ty.clone()),
        }
    }
}
