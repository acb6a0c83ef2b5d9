use std::sync::{Arc, OnceLock, Weak};

use crate::{
    binary::{GenericMethodRef, Il2CppTypeEnum},
    context::{
        assembly::{AssemblyContext, AssemblyContextRc},
        extra::ExtraData,
        members::ParameterContextRc,
        typesystem::{TypeContextRc, TypeContextRef},
    },
    metadata::{tables::MethodDefinition, GlobalMetadata, MethodAttributes},
    Error, Result,
};

/// Reference counted [`MethodContext`]
pub type MethodContextRc = Arc<MethodContext>;

/// Where a method context comes from.
pub enum MethodOrigin {
    /// Backed by a method definition row
    Defined {
        /// Metadata owning the row
        metadata: Arc<GlobalMetadata>,
        /// Row index in the method table
        index: usize,
        /// Declared name
        name: String,
    },
    /// Synthesized for one instantiation of a generic method
    ConcreteGeneric(ConcreteGenericMethod),
}

/// The instantiation data of a concrete generic method.
pub struct ConcreteGenericMethod {
    /// The uninstantiated generic method
    pub base: MethodContextRc,
    /// The registration entry this method was built from
    pub reference: GenericMethodRef,
    pub(crate) declaring_assembly: Weak<AssemblyContext>,
    /// Resolved declaring type arguments
    pub type_args: Vec<TypeContextRc>,
    /// Resolved method arguments
    pub method_args: Vec<TypeContextRc>,
}

impl ConcreteGenericMethod {
    /// The assembly that declares the generic definition
    #[must_use]
    pub fn declaring_assembly(&self) -> Option<AssemblyContextRc> {
        self.declaring_assembly.upgrade()
    }
}

/// A method bound to its declaring type.
pub struct MethodContext {
    declaring_type: TypeContextRef,
    /// Definition or instantiation data
    pub origin: MethodOrigin,
    parameters: Vec<ParameterContextRc>,
    return_type: TypeContextRef,
    generic_parameters: Vec<TypeContextRc>,
    underlying_pointer: u64,
    pub(crate) raw_bytes: OnceLock<Vec<u8>>,
    /// Annotation slot for later processing stages
    pub extra: ExtraData,
}

impl MethodContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn defined(
        declaring_type: &TypeContextRc,
        metadata: Arc<GlobalMetadata>,
        index: usize,
        name: String,
        parameters: Vec<ParameterContextRc>,
        return_type: &TypeContextRc,
        generic_parameters: Vec<TypeContextRc>,
        underlying_pointer: u64,
    ) -> Self {
        MethodContext {
            declaring_type: TypeContextRef::new(declaring_type),
            origin: MethodOrigin::Defined {
                metadata,
                index,
                name,
            },
            parameters,
            return_type: TypeContextRef::new(return_type),
            generic_parameters,
            underlying_pointer,
            raw_bytes: OnceLock::new(),
            extra: ExtraData::new(),
        }
    }

    pub(crate) fn instantiated(
        declaring_type: &TypeContextRc,
        concrete: ConcreteGenericMethod,
        parameters: Vec<ParameterContextRc>,
        return_type: &TypeContextRc,
    ) -> Self {
        let underlying_pointer = concrete.reference.generic_variant_ptr;
        MethodContext {
            declaring_type: TypeContextRef::new(declaring_type),
            origin: MethodOrigin::ConcreteGeneric(concrete),
            parameters,
            return_type: TypeContextRef::new(return_type),
            generic_parameters: Vec::new(),
            underlying_pointer,
            raw_bytes: OnceLock::new(),
            extra: ExtraData::new(),
        }
    }

    /// Method name; concrete generic methods use the name of their base method
    #[must_use]
    pub fn name(&self) -> &str {
        match &self.origin {
            MethodOrigin::Defined { name, .. } => name,
            MethodOrigin::ConcreteGeneric(concrete) => concrete.base.name(),
        }
    }

    /// The method definition row, `None` for concrete generic methods
    #[must_use]
    pub fn definition(&self) -> Option<&MethodDefinition> {
        match &self.origin {
            MethodOrigin::Defined { metadata, index, .. } => metadata.methods.as_slice().get(*index),
            MethodOrigin::ConcreteGeneric(_) => None,
        }
    }

    /// Row index of the method definition, `None` for concrete generic methods
    #[must_use]
    pub fn definition_index(&self) -> Option<usize> {
        match &self.origin {
            MethodOrigin::Defined { index, .. } => Some(*index),
            MethodOrigin::ConcreteGeneric(_) => None,
        }
    }

    /// Instantiation data of a concrete generic method
    #[must_use]
    pub fn concrete(&self) -> Option<&ConcreteGenericMethod> {
        match &self.origin {
            MethodOrigin::ConcreteGeneric(concrete) => Some(concrete),
            MethodOrigin::Defined { .. } => None,
        }
    }

    /// The generic definition a concrete generic method instantiates
    #[must_use]
    pub fn base_method(&self) -> Option<&MethodContextRc> {
        self.concrete().map(|concrete| &concrete.base)
    }

    /// The declaring type; a generic instance for methods of instantiated generic types
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeContextRc> {
        self.declaring_type.upgrade()
    }

    /// Parameters in signature order
    #[must_use]
    pub fn parameters(&self) -> &[ParameterContextRc] {
        &self.parameters
    }

    /// The return type
    ///
    /// # Errors
    /// Returns [`Error::DroppedReference`] if the application context is gone.
    pub fn return_type(&self) -> Result<TypeContextRc> {
        self.return_type.get()
    }

    /// Method attribute flags
    #[must_use]
    pub fn attributes(&self) -> MethodAttributes {
        match &self.origin {
            MethodOrigin::Defined { .. } => self
                .definition()
                .map_or(MethodAttributes::empty(), MethodDefinition::attributes),
            MethodOrigin::ConcreteGeneric(concrete) => concrete.base.attributes(),
        }
    }

    /// True for static methods
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.attributes().contains(MethodAttributes::STATIC)
    }

    /// True if the method returns `System.Void`
    #[must_use]
    pub fn is_void(&self) -> bool {
        match &self.origin {
            MethodOrigin::Defined { .. } => self
                .return_type
                .upgrade()
                .is_some_and(|ty| ty.il2cpp_type_tag() == Some(Il2CppTypeEnum::Void)),
            MethodOrigin::ConcreteGeneric(concrete) => concrete.base.is_void(),
        }
    }

    /// Number of generic parameters declared by the method definition
    ///
    /// Read from the generic container of the definition; concrete generic methods report the
    /// count of their base method.
    #[must_use]
    pub fn generic_parameter_count(&self) -> usize {
        match &self.origin {
            MethodOrigin::Defined { metadata, .. } => self.definition().map_or(0, |definition| {
                metadata.generic_parameter_count(definition.generic_container_index)
            }),
            MethodOrigin::ConcreteGeneric(concrete) => concrete.base.generic_parameter_count(),
        }
    }

    /// Generic parameters declared by the method definition
    #[must_use]
    pub fn generic_parameters(&self) -> &[TypeContextRc] {
        &self.generic_parameters
    }

    /// Native entry point, 0 if the method has no code of its own
    #[must_use]
    pub fn underlying_pointer(&self) -> u64 {
        self.underlying_pointer
    }

    /// Metadata token, 0 for concrete generic methods
    #[must_use]
    pub fn token(&self) -> u32 {
        self.definition().map_or(0, |definition| definition.token)
    }

    /// `Namespace.Type::Name`
    #[must_use]
    pub fn full_name(&self) -> String {
        match self.declaring_type() {
            Some(ty) => format!("{}::{}", ty.full_name(), self.name()),
            None => self.name().to_string(),
        }
    }

    /// Raw code bytes of this method.
    ///
    /// Concrete generic methods fetch their bytes while being built; defined methods fetch
    /// them from the instruction set backend on first access.
    ///
    /// # Errors
    /// Returns [`Error::CodeFetch`] if the method has no code or its pointer is unmapped.
    pub fn raw_bytes(&self) -> Result<&[u8]> {
        if let Some(bytes) = self.raw_bytes.get() {
            return Ok(bytes);
        }

        if self.underlying_pointer == 0 {
            return Err(Error::CodeFetch {
                address: 0,
                reason: format!("{} has no native code", self.full_name()),
            });
        }

        let app = self
            .declaring_type()
            .and_then(|ty| ty.declaring_assembly())
            .ok_or(Error::DroppedReference)?
            .app()?;
        let bytes = app.instruction_set().raw_bytes_for_method(self, false)?;

        Ok(self.raw_bytes.get_or_init(|| bytes))
    }
}

impl std::fmt::Debug for MethodContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodContext")
            .field("name", &self.full_name())
            .field("concrete", &self.concrete().is_some())
            .field("pointer", &format_args!("0x{:X}", self.underlying_pointer))
            .finish()
    }
}
