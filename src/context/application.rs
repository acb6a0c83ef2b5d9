//! The root of the context graph.

use std::{
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, OnceLock,
    },
};

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;

use crate::{
    binary::Registration,
    context::{
        assembly::AssemblyContextRc,
        extra::ExtraData,
        isa::{ImageInstructionSet, InstructionSet},
        loader,
        members::{EventContextRc, FieldContextRc, MethodContextRc, PropertyContextRc},
        options::LoadOptions,
        system::SystemTypes,
        typesystem::{TypeContextRc, TypeInterner},
    },
    metadata::{
        tables::{EventDefinition, FieldDefinition, MethodDefinition, PropertyDefinition, TypeDefinition},
        GlobalMetadata, MetadataVersion,
    },
    BinaryImage, Error, File, Result,
};

/// Identity of a concrete generic method: base method definition index plus the ids of the
/// declaring type arguments and the method arguments.
pub(crate) type ConcreteKey = (usize, Vec<u64>, Vec<u64>);

/// The analysis context of one IL2CPP application.
///
/// Owns every assembly, type and member context, the canonicalization table for synthesized
/// types, and the indices built once all assemblies are loaded:
///
/// - definition to context, for types, methods, fields, properties and events
/// - native address to every method sharing that entry point
/// - assembly name to assembly
///
/// Construction runs the load phases to completion or fails as a whole.
///
/// # Example
///
/// ```rust,no_run
/// use il2scope::prelude::*;
///
/// let app = ApplicationContext::from_files("GameAssembly.dll", "global-metadata.dat", LoadOptions::default())?;
/// let game = app.get_assembly_by_name("Assembly-CSharp").expect("no game assembly");
/// for ty in game.types() {
///     println!("{} ({} methods)", ty.full_name(), ty.methods().len());
/// }
/// # Ok::<(), il2scope::Error>(())
/// ```
pub struct ApplicationContext {
    metadata: Arc<GlobalMetadata>,
    registration: Registration,
    isa: Arc<dyn InstructionSet>,
    options: LoadOptions,
    pub(crate) interner: TypeInterner,
    pub(crate) assemblies: OnceLock<Vec<AssemblyContextRc>>,
    pub(crate) assemblies_by_name: DashMap<String, AssemblyContextRc>,
    pub(crate) types: OnceLock<Vec<TypeContextRc>>,
    pub(crate) generic_parameters: OnceLock<Vec<TypeContextRc>>,
    pub(crate) system_types: OnceLock<SystemTypes>,
    pub(crate) methods: OnceLock<Vec<Option<MethodContextRc>>>,
    pub(crate) fields: OnceLock<Vec<Option<FieldContextRc>>>,
    pub(crate) properties: OnceLock<Vec<Option<PropertyContextRc>>>,
    pub(crate) events: OnceLock<Vec<Option<EventContextRc>>>,
    pub(crate) methods_by_address: SkipMap<u64, boxcar::Vec<MethodContextRc>>,
    pub(crate) concrete_generic_methods: DashMap<ConcreteKey, MethodContextRc>,
    pub(crate) code_fetch_failures: AtomicUsize,
    /// Annotation slot for later processing stages
    pub extra: ExtraData,
}

impl ApplicationContext {
    /// Build the context graph from decoded metadata and registration.
    ///
    /// # Errors
    /// Returns the first error of any load phase; see [`crate::Error`] for the categories.
    pub fn new(
        metadata: GlobalMetadata,
        registration: Registration,
        isa: Arc<dyn InstructionSet>,
        options: LoadOptions,
    ) -> Result<Arc<ApplicationContext>> {
        let app = Arc::new(ApplicationContext {
            metadata: Arc::new(metadata),
            registration,
            isa,
            options,
            interner: TypeInterner::new(),
            assemblies: OnceLock::new(),
            assemblies_by_name: DashMap::new(),
            types: OnceLock::new(),
            generic_parameters: OnceLock::new(),
            system_types: OnceLock::new(),
            methods: OnceLock::new(),
            fields: OnceLock::new(),
            properties: OnceLock::new(),
            events: OnceLock::new(),
            methods_by_address: SkipMap::new(),
            concrete_generic_methods: DashMap::new(),
            code_fetch_failures: AtomicUsize::new(0),
            extra: ExtraData::new(),
        });

        loader::execute_loaders_in_parallel(&app)?;

        tracing::debug!(
            version = %app.version(),
            assemblies = app.assemblies().len(),
            types = app.all_types().len(),
            synthesized = app.interner.len(),
            concrete_generic_methods = app.concrete_generic_methods.len(),
            "application context ready"
        );

        Ok(app)
    }

    /// Build the context graph for metadata and the binary image it belongs to.
    ///
    /// The registration structures are located through their exported symbols, and method
    /// bytes are sliced out of `image`.
    ///
    /// # Errors
    /// Returns [`Error::RegistrationNotFound`] if the image does not export the registration,
    /// or any decoding or load error.
    pub fn from_image(
        metadata: GlobalMetadata,
        image: Arc<dyn BinaryImage>,
        options: LoadOptions,
    ) -> Result<Arc<ApplicationContext>> {
        let (code, meta) = Registration::locate(image.as_ref())?;
        let registration = Registration::read(image.as_ref(), metadata.version(), code, meta)?;
        let isa = Arc::new(ImageInstructionSet::new(image, &registration));

        Self::new(metadata, registration, isa, options)
    }

    /// Load a binary and its metadata from disk, see [`Self::from_image`]
    ///
    /// # Errors
    /// Returns an error if either file cannot be loaded, or any load error.
    pub fn from_files(
        binary: impl AsRef<Path>,
        metadata: impl AsRef<Path>,
        options: LoadOptions,
    ) -> Result<Arc<ApplicationContext>> {
        let metadata = GlobalMetadata::from_file(metadata, options.version_override)?;
        let image: Arc<dyn BinaryImage> = Arc::new(File::from_file(binary)?);

        Self::from_image(metadata, image, options)
    }

    /// The decoded metadata
    #[must_use]
    pub fn metadata(&self) -> &Arc<GlobalMetadata> {
        &self.metadata
    }

    /// The decoded native registration
    #[must_use]
    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    /// The metadata layout revision
    #[must_use]
    pub fn version(&self) -> MetadataVersion {
        self.metadata.version()
    }

    /// The options this context was loaded with
    #[must_use]
    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// The backend used to fetch method bytes
    #[must_use]
    pub fn instruction_set(&self) -> &dyn InstructionSet {
        self.isa.as_ref()
    }

    /// All assemblies, in definition order
    #[must_use]
    pub fn assemblies(&self) -> &[AssemblyContextRc] {
        self.assemblies.get().map_or(&[], Vec::as_slice)
    }

    /// Every defined type of every assembly, in definition order
    #[must_use]
    pub fn all_types(&self) -> &[TypeContextRc] {
        self.types.get().map_or(&[], Vec::as_slice)
    }

    /// The well-known types of the core library
    ///
    /// # Errors
    /// Returns [`Error::WellKnownTypeMissing`] while the context is still loading.
    pub fn system_types(&self) -> Result<&SystemTypes> {
        self.system_types
            .get()
            .ok_or(Error::WellKnownTypeMissing("System.Object"))
    }

    /// Look up an assembly by simple name; an image name (`Game.dll`) is accepted as well
    #[must_use]
    pub fn get_assembly_by_name(&self, name: &str) -> Option<AssemblyContextRc> {
        let name = name.strip_suffix(".dll").unwrap_or(name);
        self.assemblies_by_name
            .get(name)
            .map(|entry| entry.value().clone())
    }

    /// The defined type for type definition index `index`
    #[must_use]
    pub fn type_by_definition_index(&self, index: i32) -> Option<TypeContextRc> {
        let index = usize::try_from(index).ok()?;
        self.all_types().get(index).cloned()
    }

    /// The generic parameter context for generic parameter index `index`
    #[must_use]
    pub fn generic_parameter(&self, index: i32) -> Option<TypeContextRc> {
        let index = usize::try_from(index).ok()?;
        self.generic_parameters.get()?.get(index).cloned()
    }

    /// The method context for method definition index `index`
    #[must_use]
    pub fn resolve_method_by_index(&self, index: i32) -> Option<MethodContextRc> {
        let index = usize::try_from(index).ok()?;
        self.methods.get()?.get(index)?.clone()
    }

    /// The context built for a type definition row of this application
    ///
    /// # Errors
    /// Returns [`Error::ForeignDefinition`] if `definition` is not a row of this metadata.
    pub fn resolve_context_for_type(&self, definition: &TypeDefinition) -> Result<TypeContextRc> {
        self.metadata
            .type_definitions
            .index_of(definition)
            .and_then(|index| self.all_types().get(index).cloned())
            .ok_or(Error::ForeignDefinition("type"))
    }

    /// The context built for a method definition row of this application
    ///
    /// Concrete generic methods have no definition and are only reachable through their
    /// base method or [`Self::concrete_generic_methods`].
    ///
    /// # Errors
    /// Returns [`Error::ForeignDefinition`] if `definition` is not a row of this metadata.
    pub fn resolve_context_for_method(&self, definition: &MethodDefinition) -> Result<MethodContextRc> {
        resolve(&self.methods, self.metadata.methods.index_of(definition), "method")
    }

    /// The context built for a field definition row of this application
    ///
    /// # Errors
    /// Returns [`Error::ForeignDefinition`] if `definition` is not a row of this metadata.
    pub fn resolve_context_for_field(&self, definition: &FieldDefinition) -> Result<FieldContextRc> {
        resolve(&self.fields, self.metadata.fields.index_of(definition), "field")
    }

    /// The context built for a property definition row of this application
    ///
    /// # Errors
    /// Returns [`Error::ForeignDefinition`] if `definition` is not a row of this metadata.
    pub fn resolve_context_for_property(
        &self,
        definition: &PropertyDefinition,
    ) -> Result<PropertyContextRc> {
        resolve(&self.properties, self.metadata.properties.index_of(definition), "property")
    }

    /// The context built for an event definition row of this application
    ///
    /// # Errors
    /// Returns [`Error::ForeignDefinition`] if `definition` is not a row of this metadata.
    pub fn resolve_context_for_event(&self, definition: &EventDefinition) -> Result<EventContextRc> {
        resolve(&self.events, self.metadata.events.index_of(definition), "event")
    }

    /// Every method whose native entry point is `address`.
    ///
    /// Identical code folding and shared generic code make several methods share one
    /// address; the list is in load order.
    #[must_use]
    pub fn methods_by_address(&self, address: u64) -> Vec<MethodContextRc> {
        self.methods_by_address
            .get(&address)
            .map(|entry| entry.value().iter().map(|(_, method)| method.clone()).collect())
            .unwrap_or_default()
    }

    /// All native addresses with at least one method, ascending
    #[must_use]
    pub fn method_addresses(&self) -> Vec<u64> {
        self.methods_by_address.iter().map(|entry| *entry.key()).collect()
    }

    /// Every concrete generic method that was built
    #[must_use]
    pub fn concrete_generic_methods(&self) -> Vec<MethodContextRc> {
        self.concrete_generic_methods
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// The concrete generic method instantiating `base` with the given arguments
    #[must_use]
    pub fn get_concrete_generic_method(
        &self,
        base: &MethodContextRc,
        type_args: &[TypeContextRc],
        method_args: &[TypeContextRc],
    ) -> Option<MethodContextRc> {
        let key = (
            base.definition_index()?,
            type_args.iter().map(|arg| arg.id()).collect(),
            method_args.iter().map(|arg| arg.id()).collect(),
        );
        self.concrete_generic_methods
            .get(&key)
            .map(|entry| entry.value().clone())
    }

    /// Number of concrete generic methods dropped because their code could not be fetched
    #[must_use]
    pub fn code_fetch_failures(&self) -> usize {
        self.code_fetch_failures.load(Ordering::Relaxed)
    }

    /// Substitute every generic parameter in `ty` by its argument, by ordinal.
    ///
    /// Returns `ty` itself if nothing was substituted. New shapes are owned by `owner`.
    ///
    /// # Errors
    /// Returns [`Error::GenericOrdinalOutOfRange`] for a parameter without argument.
    pub fn instantiate(
        &self,
        ty: &TypeContextRc,
        type_args: &[TypeContextRc],
        method_args: &[TypeContextRc],
        owner: &AssemblyContextRc,
    ) -> Result<TypeContextRc> {
        self.interner.instantiate(ty, type_args, method_args, owner)
    }

    /// Canonical `base<args>` owned by `owner` if new
    #[must_use]
    pub fn make_generic_instance(
        &self,
        base: &TypeContextRc,
        args: Vec<TypeContextRc>,
        owner: &AssemblyContextRc,
    ) -> TypeContextRc {
        self.interner.generic_instance(base, args, owner)
    }

    /// Canonical `element[]` owned by `owner` if new
    #[must_use]
    pub fn make_sz_array(&self, element: &TypeContextRc, owner: &AssemblyContextRc) -> TypeContextRc {
        self.interner.sz_array(element, owner)
    }
}

fn resolve<T>(index: &OnceLock<Vec<Option<Arc<T>>>>, row: Option<usize>, kind: &'static str) -> Result<Arc<T>> {
    row.and_then(|row| index.get()?.get(row)?.clone())
        .ok_or(Error::ForeignDefinition(kind))
}

impl std::fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("version", &self.version())
            .field("assemblies", &self.assemblies().len())
            .field("types", &self.all_types().len())
            .finish_non_exhaustive()
    }
}
