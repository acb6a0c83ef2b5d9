//! Assembly contexts and type usage resolution.

use std::sync::{Arc, OnceLock, Weak};

use dashmap::DashMap;

use crate::{
    binary::{Il2CppType, Il2CppTypeEnum, TypeData},
    context::{
        application::ApplicationContext,
        extra::ExtraData,
        typesystem::TypeContextRc,
    },
    metadata::{
        tables::{AssemblyDefinition, ImageDefinition, TypeDefinition},
        GlobalMetadata,
    },
    Error, Result,
};

/// Reference counted [`AssemblyContext`]
pub type AssemblyContextRc = Arc<AssemblyContext>;

/// One assembly of the application and the types its image defines.
pub struct AssemblyContext {
    app: Weak<ApplicationContext>,
    metadata: Arc<GlobalMetadata>,
    index: usize,
    image_index: usize,
    /// Simple assembly name (`Assembly-CSharp`)
    pub name: String,
    /// Module name of the image (`Assembly-CSharp.dll`)
    pub image_name: String,
    pub(crate) types: OnceLock<Vec<TypeContextRc>>,
    pub(crate) types_by_full_name: DashMap<String, TypeContextRc>,
    /// Annotation slot for later processing stages
    pub extra: ExtraData,
}

impl AssemblyContext {
    pub(crate) fn new(
        app: &Arc<ApplicationContext>,
        index: usize,
        name: String,
        image_name: String,
    ) -> Result<Self> {
        let metadata = app.metadata().clone();
        let definition = &metadata.assemblies[index];
        let image_index = usize::try_from(definition.image_index)
            .ok()
            .filter(|&image| image < metadata.images.len())
            .ok_or_else(|| {
                malformed_error!("Assembly {} refers to missing image {}", name, definition.image_index)
            })?;

        Ok(AssemblyContext {
            app: Arc::downgrade(app),
            metadata,
            index,
            image_index,
            name,
            image_name,
            types: OnceLock::new(),
            types_by_full_name: DashMap::new(),
            extra: ExtraData::new(),
        })
    }

    /// The owning application context
    ///
    /// # Errors
    /// Returns [`Error::DroppedReference`] if the application context is gone.
    pub fn app(&self) -> Result<Arc<ApplicationContext>> {
        self.app.upgrade().ok_or(Error::DroppedReference)
    }

    /// The assembly definition row
    #[must_use]
    pub fn definition(&self) -> &AssemblyDefinition {
        &self.metadata.assemblies[self.index]
    }

    /// Row index in the assembly table
    #[must_use]
    pub fn definition_index(&self) -> usize {
        self.index
    }

    /// The image definition row
    #[must_use]
    pub fn image(&self) -> &ImageDefinition {
        &self.metadata.images[self.image_index]
    }

    /// Types defined by this assembly, in definition order
    #[must_use]
    pub fn types(&self) -> &[TypeContextRc] {
        self.types.get().map_or(&[], Vec::as_slice)
    }

    /// The type context of `definition`, if it is a row defined by this assembly
    #[must_use]
    pub fn get_type_by_definition(&self, definition: &TypeDefinition) -> Option<TypeContextRc> {
        let index = self.metadata.type_definitions.index_of(definition)?;
        self.get_type_by_definition_index(i32::try_from(index).ok()?)
    }

    /// The type context of type definition `index`, if this assembly defines it
    #[must_use]
    pub fn get_type_by_definition_index(&self, index: i32) -> Option<TypeContextRc> {
        let relative = usize::try_from(index.checked_sub(self.image().type_start)?).ok()?;
        self.types().get(relative).cloned()
    }

    /// Look up a type by its full name (`Namespace.Outer/Inner`)
    #[must_use]
    pub fn get_type_by_full_name(&self, name: &str) -> Option<TypeContextRc> {
        self.types_by_full_name
            .get(name)
            .map(|entry| entry.value().clone())
    }

    /// Turn a metadata type index into a canonical type context.
    ///
    /// Synthesized shapes created by this call are owned by this assembly.
    ///
    /// # Errors
    /// Returns `Malformed` for indices outside the type table or `End` tags, and
    /// [`Error::TypeNotFound`] for references to missing definitions or generic parameters.
    pub fn resolve_il2cpp_type(self: &Arc<Self>, index: i32) -> Result<TypeContextRc> {
        let app = self.app()?;
        let ty = app
            .registration()
            .type_at(index)
            .ok_or_else(|| malformed_error!("Type index out of range - {}", index))?;
        self.resolve_type(&app, ty)
    }

    /// Resolve a list of registration type indices, as stored by generic instantiations
    ///
    /// # Errors
    /// Returns the first resolution error, see [`Self::resolve_il2cpp_type`].
    pub fn resolve_type_array(self: &Arc<Self>, indices: &[usize]) -> Result<Vec<TypeContextRc>> {
        if indices.is_empty() {
            return Ok(Vec::new());
        }

        let app = self.app()?;
        indices
            .iter()
            .map(|&index| self.resolve_registration_type(&app, index))
            .collect()
    }

    fn resolve_registration_type(
        self: &Arc<Self>,
        app: &Arc<ApplicationContext>,
        index: usize,
    ) -> Result<TypeContextRc> {
        let ty = app
            .registration()
            .types
            .get(index)
            .ok_or_else(|| malformed_error!("Registration type out of range - {}", index))?;
        self.resolve_type(app, ty)
    }

    fn resolve_type(self: &Arc<Self>, app: &Arc<ApplicationContext>, ty: &Il2CppType) -> Result<TypeContextRc> {
        let interner = &app.interner;

        let resolved = match ty.data {
            TypeData::TypeDefinition(definition) => app
                .type_by_definition_index(definition)
                .ok_or_else(|| Error::TypeNotFound(format!("type definition {definition}")))?,
            TypeData::GenericParameter(parameter) => app
                .generic_parameter(parameter)
                .ok_or_else(|| Error::TypeNotFound(format!("generic parameter {parameter}")))?,
            TypeData::Element(element) => {
                let element = self.resolve_registration_type(app, element)?;
                match ty.kind {
                    Il2CppTypeEnum::Ptr => interner.pointer(&element, self),
                    _ => interner.sz_array(&element, self),
                }
            }
            TypeData::Array { element, rank } => {
                let element = self.resolve_registration_type(app, element)?;
                interner.array(&element, rank, self)
            }
            TypeData::GenericClass(class_index) => {
                let registration = app.registration();
                let class = registration.generic_classes.get(class_index).ok_or_else(|| {
                    malformed_error!("Generic class out of range - {}", class_index)
                })?;
                let definition = registration
                    .generic_class_definition(class)
                    .ok_or_else(|| malformed_error!("Generic class {} has no definition", class_index))?;
                let base = app
                    .type_by_definition_index(definition)
                    .ok_or_else(|| Error::TypeNotFound(format!("type definition {definition}")))?;

                let args = match class.class_inst {
                    Some(inst) => {
                        let types = registration
                            .generic_insts
                            .get(inst)
                            .ok_or_else(|| malformed_error!("Generic instance out of range - {}", inst))?;
                        self.resolve_type_array(&types.types)?
                    }
                    None => Vec::new(),
                };
                interner.generic_instance(&base, args, self)
            }
            TypeData::None if ty.kind == Il2CppTypeEnum::FnPtr => interner.function_pointer(self),
            TypeData::None => {
                return Err(malformed_error!("Type tag {} carries no type", ty.kind));
            }
        };

        Ok(if ty.byref {
            interner.by_ref(&resolved, self)
        } else {
            resolved
        })
    }
}

impl std::fmt::Debug for AssemblyContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssemblyContext")
            .field("name", &self.name)
            .field("image", &self.image_name)
            .field("types", &self.types().len())
            .finish()
    }
}
