//! Type contexts: every distinct use of a type in the application.
//!
//! A [`TypeContext`] is one node of the type graph. The closed set of shapes a type usage can
//! take is modelled by [`TypeKind`]; the fields all shapes share (identity, owning assembly,
//! annotation slot) live on the context itself.
//!
//! # Identity
//!
//! Defined types are created once per type definition. Every other shape is created through
//! the [`TypeInterner`], which keeps exactly one instance per structural key, so two equal
//! usages are always the same `Arc` and can be compared with [`Arc::ptr_eq`] or by
//! [`TypeContext::id`].
//!
//! # Ownership
//!
//! Strong references only point downwards: the application owns defined types and the
//! interner owns everything synthesized, a generic instance owns its base and arguments, and
//! a defined type owns its members. Everything else is a [`TypeContextRef`].

mod base;
mod instantiate;
mod interner;

pub use base::TypeContextRef;
pub(crate) use interner::TypeInterner;

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{Arc, OnceLock, Weak},
};

use crate::{
    binary::Il2CppTypeEnum,
    context::{
        assembly::{AssemblyContext, AssemblyContextRc},
        extra::ExtraData,
        members::{EventContextRc, FieldContextRc, MethodContextRc, PropertyContextRc},
    },
    metadata::{
        tables::{MethodDefinition, TypeDefinition},
        GenericParameterAttributes, GlobalMetadata, TypeAttributes,
    },
};

/// Reference counted [`TypeContext`]
pub type TypeContextRc = Arc<TypeContext>;

/// One use of a type.
pub struct TypeContext {
    id: u64,
    assembly: Weak<AssemblyContext>,
    /// The shape of this type usage
    pub kind: TypeKind,
    /// Annotation slot for later processing stages
    pub extra: ExtraData,
}

/// The shapes a type usage can take.
pub enum TypeKind {
    /// A type backed by a type definition record
    Defined(DefinedType),
    /// A generic type definition applied to arguments
    GenericInstance {
        /// The generic type definition (or an enclosing instance)
        base: TypeContextRc,
        /// Type arguments, in declaration order
        args: Vec<TypeContextRc>,
    },
    /// A single-dimensional zero-based array
    SzArray(TypeContextRc),
    /// A multi-dimensional array
    Array {
        /// Element type
        element: TypeContextRc,
        /// Number of dimensions
        rank: u8,
    },
    /// An unmanaged pointer
    Pointer(TypeContextRc),
    /// A by-reference use (`ref`, `out`, `in`)
    ByRef(TypeContextRc),
    /// A generic parameter of a type or method
    GenericParameter(GenericParameterContext),
    /// A function pointer; the native registration carries no signature for these
    FunctionPointer,
}

/// Whether a generic parameter is declared by a type or by a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericParameterScope {
    /// `!0`, substituted from the declaring type arguments
    Type,
    /// `!!0`, substituted from the method arguments
    Method,
}

/// A generic parameter declaration.
pub struct GenericParameterContext {
    /// Row in the generic parameter table
    pub index: i32,
    /// Declared name (`T`, `TKey`)
    pub name: String,
    /// Position within the declaring container
    pub ordinal: usize,
    /// Type or method parameter
    pub scope: GenericParameterScope,
    /// Variance and constraint flags
    pub flags: GenericParameterAttributes,
    pub(crate) constraints: OnceLock<Vec<TypeContextRef>>,
}

impl GenericParameterContext {
    /// Declared constraint types
    #[must_use]
    pub fn constraints(&self) -> &[TypeContextRef] {
        self.constraints.get().map_or(&[], Vec::as_slice)
    }
}

/// A type definition and everything wired to it while loading.
pub struct DefinedType {
    metadata: Arc<GlobalMetadata>,
    index: usize,
    /// Simple name (`List`1`)
    pub name: String,
    /// Namespace, empty for nested types and the `<Module>` type
    pub namespace: String,
    /// Type attribute flags
    pub flags: TypeAttributes,
    /// Element type tag of the by-value use of this type
    pub tag: Il2CppTypeEnum,
    pub(crate) full_name: OnceLock<String>,
    pub(crate) base: OnceLock<Option<TypeContextRef>>,
    pub(crate) declaring_type: OnceLock<TypeContextRef>,
    pub(crate) nested_types: boxcar::Vec<TypeContextRef>,
    pub(crate) interfaces: OnceLock<Vec<TypeContextRef>>,
    pub(crate) generic_parameters: OnceLock<Vec<TypeContextRc>>,
    pub(crate) methods: OnceLock<Vec<MethodContextRc>>,
    pub(crate) fields: OnceLock<Vec<FieldContextRc>>,
    pub(crate) properties: OnceLock<Vec<PropertyContextRc>>,
    pub(crate) events: OnceLock<Vec<EventContextRc>>,
}

impl DefinedType {
    pub(crate) fn new(
        metadata: Arc<GlobalMetadata>,
        index: usize,
        name: String,
        namespace: String,
        tag: Il2CppTypeEnum,
    ) -> Self {
        let flags = metadata.type_definitions[index].attributes();
        DefinedType {
            metadata,
            index,
            name,
            namespace,
            flags,
            tag,
            full_name: OnceLock::new(),
            base: OnceLock::new(),
            declaring_type: OnceLock::new(),
            nested_types: boxcar::Vec::new(),
            interfaces: OnceLock::new(),
            generic_parameters: OnceLock::new(),
            methods: OnceLock::new(),
            fields: OnceLock::new(),
            properties: OnceLock::new(),
            events: OnceLock::new(),
        }
    }

    /// The type definition row
    #[must_use]
    pub fn definition(&self) -> &TypeDefinition {
        &self.metadata.type_definitions[self.index]
    }

    /// Row index in the type definition table
    #[must_use]
    pub fn definition_index(&self) -> usize {
        self.index
    }
}

impl TypeContext {
    pub(crate) fn new(id: u64, assembly: &AssemblyContextRc, kind: TypeKind) -> TypeContextRc {
        Arc::new(TypeContext {
            id,
            assembly: Arc::downgrade(assembly),
            kind,
            extra: ExtraData::new(),
        })
    }

    /// Identity of this context, unique within one application context
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The assembly that defines this type, or for synthesized shapes the assembly whose
    /// reference first created it
    #[must_use]
    pub fn declaring_assembly(&self) -> Option<AssemblyContextRc> {
        self.assembly.upgrade()
    }

    /// The defined type data, for [`TypeKind::Defined`] only
    #[must_use]
    pub fn as_defined(&self) -> Option<&DefinedType> {
        match &self.kind {
            TypeKind::Defined(defined) => Some(defined),
            _ => None,
        }
    }

    /// The generic parameter data, for [`TypeKind::GenericParameter`] only
    #[must_use]
    pub fn as_generic_parameter(&self) -> Option<&GenericParameterContext> {
        match &self.kind {
            TypeKind::GenericParameter(parameter) => Some(parameter),
            _ => None,
        }
    }

    /// The raw type definition, for defined types only
    #[must_use]
    pub fn definition(&self) -> Option<&TypeDefinition> {
        self.as_defined().map(DefinedType::definition)
    }

    /// IL2CPP element type tag, for defined types only
    #[must_use]
    pub fn il2cpp_type_tag(&self) -> Option<Il2CppTypeEnum> {
        self.as_defined().map(|defined| defined.tag)
    }

    /// Unqualified display name
    #[must_use]
    pub fn default_name(&self) -> String {
        match &self.kind {
            TypeKind::Defined(defined) => defined.name.clone(),
            TypeKind::GenericInstance { base, .. } => base.default_name(),
            TypeKind::SzArray(element) => format!("{}[]", element.default_name()),
            TypeKind::Array { element, rank } => format!(
                "{}[{}]",
                element.default_name(),
                ",".repeat(usize::from(*rank).saturating_sub(1))
            ),
            TypeKind::Pointer(element) => format!("{}*", element.default_name()),
            TypeKind::ByRef(element) => format!("{}&", element.default_name()),
            TypeKind::GenericParameter(parameter) => parameter.name.clone(),
            TypeKind::FunctionPointer => "fnptr".to_string(),
        }
    }

    /// Namespace of the described type, empty if it has none
    #[must_use]
    pub fn namespace(&self) -> String {
        match &self.kind {
            TypeKind::Defined(defined) => defined.namespace.clone(),
            TypeKind::GenericInstance { base: inner, .. }
            | TypeKind::SzArray(inner)
            | TypeKind::Array { element: inner, .. }
            | TypeKind::Pointer(inner)
            | TypeKind::ByRef(inner) => inner.namespace(),
            TypeKind::GenericParameter(_) | TypeKind::FunctionPointer => String::new(),
        }
    }

    /// Fully qualified name; nested types use `Outer/Inner`, instances list their arguments
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.kind {
            TypeKind::Defined(defined) => match defined.full_name.get() {
                Some(name) => name.clone(),
                None if defined.namespace.is_empty() => defined.name.clone(),
                None => format!("{}.{}", defined.namespace, defined.name),
            },
            TypeKind::GenericInstance { base, args } => {
                let args: Vec<String> = args.iter().map(|arg| arg.full_name()).collect();
                format!("{}<{}>", base.full_name(), args.join(","))
            }
            TypeKind::SzArray(element) => format!("{}[]", element.full_name()),
            TypeKind::Array { element, rank } => format!(
                "{}[{}]",
                element.full_name(),
                ",".repeat(usize::from(*rank).saturating_sub(1))
            ),
            TypeKind::Pointer(element) => format!("{}*", element.full_name()),
            TypeKind::ByRef(element) => format!("{}&", element.full_name()),
            TypeKind::GenericParameter(_) | TypeKind::FunctionPointer => self.default_name(),
        }
    }

    /// True for value types; generic instances follow their definition
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        match &self.kind {
            TypeKind::Defined(defined) => defined.definition().is_value_type(),
            TypeKind::GenericInstance { base, .. } => base.is_value_type(),
            _ => false,
        }
    }

    /// True for enums
    #[must_use]
    pub fn is_enum(&self) -> bool {
        match &self.kind {
            TypeKind::Defined(defined) => defined.definition().is_enum(),
            TypeKind::GenericInstance { base, .. } => base.is_enum(),
            _ => false,
        }
    }

    /// True for the numeric primitives, `Boolean` and `Char`
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        self.declaring_assembly()
            .and_then(|assembly| assembly.app().ok())
            .is_some_and(|app| {
                app.system_types()
                    .is_ok_and(|system| system.is_primitive(self))
            })
    }

    /// Legacy custom attribute index; -1 for everything but pre-24.1 defined types
    #[must_use]
    pub fn custom_attribute_index(&self) -> i32 {
        match &self.kind {
            TypeKind::Defined(defined) if defined.metadata.version().is_less_than(24.1) => {
                defined.definition().custom_attribute_index
            }
            _ => -1,
        }
    }

    /// Metadata token, 0 for synthesized shapes
    #[must_use]
    pub fn token(&self) -> u32 {
        self.definition().map_or(0, |definition| definition.token)
    }

    /// The base type, `None` for `System.Object`, interfaces and synthesized shapes
    #[must_use]
    pub fn base_type(&self) -> Option<TypeContextRc> {
        self.as_defined()?.base.get()?.as_ref()?.upgrade()
    }

    /// The enclosing type of a nested type
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeContextRc> {
        self.as_defined()?.declaring_type.get()?.upgrade()
    }

    /// Directly implemented interfaces
    #[must_use]
    pub fn interfaces(&self) -> Vec<TypeContextRc> {
        self.as_defined()
            .and_then(|defined| defined.interfaces.get())
            .map(|list| list.iter().filter_map(TypeContextRef::upgrade).collect())
            .unwrap_or_default()
    }

    /// Types nested inside this one
    #[must_use]
    pub fn nested_types(&self) -> Vec<TypeContextRc> {
        self.as_defined()
            .map(|defined| {
                defined
                    .nested_types
                    .iter()
                    .filter_map(|(_, nested)| nested.upgrade())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Generic parameters declared by this type
    #[must_use]
    pub fn generic_parameters(&self) -> &[TypeContextRc] {
        self.as_defined()
            .and_then(|defined| defined.generic_parameters.get())
            .map_or(&[], Vec::as_slice)
    }

    /// Methods declared by this type
    #[must_use]
    pub fn methods(&self) -> &[MethodContextRc] {
        self.as_defined()
            .and_then(|defined| defined.methods.get())
            .map_or(&[], Vec::as_slice)
    }

    /// Fields declared by this type
    #[must_use]
    pub fn fields(&self) -> &[FieldContextRc] {
        self.as_defined()
            .and_then(|defined| defined.fields.get())
            .map_or(&[], Vec::as_slice)
    }

    /// Properties declared by this type
    #[must_use]
    pub fn properties(&self) -> &[PropertyContextRc] {
        self.as_defined()
            .and_then(|defined| defined.properties.get())
            .map_or(&[], Vec::as_slice)
    }

    /// Events declared by this type
    #[must_use]
    pub fn events(&self) -> &[EventContextRc] {
        self.as_defined()
            .and_then(|defined| defined.events.get())
            .map_or(&[], Vec::as_slice)
    }

    /// The method context built for `definition`, which must be a row of this type
    #[must_use]
    pub fn get_method(&self, definition: &MethodDefinition) -> Option<MethodContextRc> {
        self.methods()
            .iter()
            .find(|method| method.definition().is_some_and(|d| std::ptr::eq(d, definition)))
            .cloned()
    }

    /// The method context for method definition index `index`
    #[must_use]
    pub fn get_method_by_index(&self, index: i32) -> Option<MethodContextRc> {
        let index = usize::try_from(index).ok()?;
        self.methods()
            .iter()
            .find(|method| method.definition_index() == Some(index))
            .cloned()
    }
}

impl PartialEq for TypeContext {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeContext {}

impl Hash for TypeContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            TypeKind::Defined(_) => "Defined",
            TypeKind::GenericInstance { .. } => "GenericInstance",
            TypeKind::SzArray(_) => "SzArray",
            TypeKind::Array { .. } => "Array",
            TypeKind::Pointer(_) => "Pointer",
            TypeKind::ByRef(_) => "ByRef",
            TypeKind::GenericParameter(_) => "GenericParameter",
            TypeKind::FunctionPointer => "FunctionPointer",
        };
        f.debug_struct("TypeContext")
            .field("id", &self.id)
            .field("kind", &kind)
            .field("name", &self.full_name())
            .finish()
    }
}

impl fmt::Display for TypeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}
