//! `Il2CppCodeRegistration` and `Il2CppMetadataRegistration`.
//!
//! The two registration structures are the native half of the application description: the
//! metadata blob only stores indices, and the registration turns those indices into
//! `Il2CppType`s, generic instantiations and code pointers.

use std::collections::{HashMap, VecDeque};

use crate::{
    binary::types::{Il2CppType, RawType, TypeData},
    file::BinaryImage,
    metadata::{
        tables::MethodDefinition, Decode, MetadataReader, MetadataVersion, NativePtr,
        VersionRange,
    },
    Error, Result,
};

/// Exported symbol of the code registration in unstripped builds
pub const CODE_REGISTRATION_SYMBOL: &str = "g_CodeRegistration";
/// Exported symbol of the metadata registration in unstripped builds
pub const METADATA_REGISTRATION_SYMBOL: &str = "g_MetadataRegistration";

metadata_record! {
    /// Leading part of `Il2CppMetadataRegistration`: `(count, pointer)` pairs.
    pub struct MetadataRegistrationHeader {
        /// Number of generic classes
        pub generic_classes_count: NativePtr,
        /// `Il2CppGenericClass* const*`
        pub generic_classes: NativePtr,
        /// Number of generic instantiations
        pub generic_insts_count: NativePtr,
        /// `Il2CppGenericInst* const*`
        pub generic_insts: NativePtr,
        /// Number of generic method table entries
        pub generic_method_table_count: NativePtr,
        /// `Il2CppGenericMethodFunctionsDefinitions*`
        pub generic_method_table: NativePtr,
        /// Number of types
        pub types_count: NativePtr,
        /// `Il2CppType* const*`
        pub types: NativePtr,
        /// Number of method specs
        pub method_specs_count: NativePtr,
        /// `Il2CppMethodSpec*`
        pub method_specs: NativePtr,
        /// Number of field offset tables
        pub field_offsets_count: NativePtr,
        /// Field offset tables
        pub field_offsets: NativePtr,
        /// Number of type definition sizes
        pub type_definitions_sizes_count: NativePtr,
        /// Type definition sizes
        pub type_definitions_sizes: NativePtr,
        /// Number of metadata usages
        @[VersionRange::between(19.0, 24.5)]
        pub metadata_usages_count: NativePtr,
        /// Metadata usages
        @[VersionRange::between(19.0, 24.5)]
        pub metadata_usages: NativePtr,
    }
}

metadata_record! {
    /// `Il2CppCodeRegistration`
    pub struct CodeRegistrationHeader {
        /// Flat method pointer count (before per-module registration)
        @[VersionRange::until(24.1)]
        pub method_pointers_count: NativePtr,
        /// Flat method pointer table
        @[VersionRange::until(24.1)]
        pub method_pointers: NativePtr,
        /// Reverse P/Invoke wrapper count
        pub reverse_pinvoke_wrapper_count: NativePtr,
        /// Reverse P/Invoke wrappers
        pub reverse_pinvoke_wrappers: NativePtr,
        /// Generic method pointer count
        pub generic_method_pointers_count: NativePtr,
        /// Generic method pointers
        pub generic_method_pointers: NativePtr,
        /// Generic adjustor thunks
        @[VersionRange::only(24.5), VersionRange::since(27.1)]
        pub generic_adjustor_thunks: NativePtr,
        /// Invoker count
        pub invoker_pointers_count: NativePtr,
        /// Invokers
        pub invoker_pointers: NativePtr,
        /// Attribute generator count (before 27)
        @[VersionRange::until(24.5)]
        pub custom_attribute_count: NativePtr,
        /// Attribute generators (before 27)
        @[VersionRange::until(24.5)]
        pub custom_attribute_generators: NativePtr,
        /// Unresolved virtual call count
        @[VersionRange::since(22.0)]
        pub unresolved_virtual_call_count: NativePtr,
        /// Unresolved virtual call pointers
        @[VersionRange::since(22.0)]
        pub unresolved_virtual_call_pointers: NativePtr,
        /// Unresolved instance call pointers
        @[VersionRange::since(29.1)]
        pub unresolved_instance_call_pointers: NativePtr,
        /// Unresolved static call pointers
        @[VersionRange::since(29.1)]
        pub unresolved_static_call_pointers: NativePtr,
        /// Interop data count
        @[VersionRange::since(23.0)]
        pub interop_data_count: NativePtr,
        /// Interop data
        @[VersionRange::since(23.0)]
        pub interop_data: NativePtr,
        /// Windows runtime factory count
        @[VersionRange::since(24.3)]
        pub windows_runtime_factory_count: NativePtr,
        /// Windows runtime factory table
        @[VersionRange::since(24.3)]
        pub windows_runtime_factory_table: NativePtr,
        /// Code-gen module count
        @[VersionRange::since(24.2)]
        pub code_gen_modules_count: NativePtr,
        /// `Il2CppCodeGenModule* const*`
        @[VersionRange::since(24.2)]
        pub code_gen_modules: NativePtr,
    }
}

metadata_record! {
    /// Leading part of `Il2CppCodeGenModule`.
    @[VersionRange::since(24.2)]
    pub struct CodeGenModuleHeader {
        /// `const char*` module name
        pub module_name: NativePtr,
        /// Method pointer count
        pub method_pointer_count: NativePtr,
        /// Method pointers, indexed by method token rid - 1
        pub method_pointers: NativePtr,
    }
}

metadata_record! {
    /// `Il2CppMethodSpec`: a generic method instantiation.
    pub struct MethodSpec {
        /// Method definition index of the generic method
        pub method_definition_index: i32,
        /// Generic instance of the declaring type arguments, or -1
        pub class_index_index: i32,
        /// Generic instance of the method arguments, or -1
        pub method_index_index: i32,
    }
}

metadata_record! {
    /// `Il2CppGenericMethodFunctionsDefinitions`
    pub struct GenericMethodFunctions {
        /// Method spec index
        pub generic_method_index: i32,
        /// Generic method pointer index
        pub method_index: i32,
        /// Invoker index
        pub invoker_index: i32,
        /// Adjustor thunk index
        @[VersionRange::only(24.5), VersionRange::since(27.1)]
        pub adjustor_thunk_index: i32,
    }
}

/// How a generic class names its generic type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericClassBase {
    /// Before 27: a type definition index
    Definition(i32),
    /// 27+: an index into [`Registration::types`]
    Type(usize),
}

/// `Il2CppGenericClass`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericClass {
    /// The generic type definition
    pub base: GenericClassBase,
    /// Type arguments, as an index into [`Registration::generic_insts`]
    pub class_inst: Option<usize>,
    /// Method arguments, as an index into [`Registration::generic_insts`]
    pub method_inst: Option<usize>,
}

/// `Il2CppGenericInst`: an argument list, as indices into [`Registration::types`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GenericInst {
    /// Argument type indices
    pub types: Vec<usize>,
}

/// Code pointers of one module image (24.2+).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeGenModule {
    /// Module name (`Assembly-CSharp.dll`)
    pub name: String,
    /// Method pointers, indexed by method token rid - 1
    pub method_pointers: Vec<u64>,
}

/// The decoded native registration of an application.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    /// All reachable types; metadata type indices address the first `types_count` entries,
    /// nested element types follow
    pub types: Vec<Il2CppType>,
    /// Generic classes
    pub generic_classes: Vec<GenericClass>,
    /// Generic instantiations
    pub generic_insts: Vec<GenericInst>,
    /// Generic method instantiations
    pub method_specs: Vec<MethodSpec>,
    /// Generic method code table
    pub generic_method_table: Vec<GenericMethodFunctions>,
    /// Generic method pointers
    pub generic_method_pointers: Vec<u64>,
    /// Flat method pointers (before 24.2)
    pub method_pointers: Vec<u64>,
    /// Per-module method pointers (24.2+)
    pub code_gen_modules: Vec<CodeGenModule>,
}

impl Registration {
    /// Find both registration structures through their exported symbols
    ///
    /// # Errors
    /// Returns [`Error::RegistrationNotFound`] if the image does not export them.
    pub fn locate(image: &dyn BinaryImage) -> Result<(u64, u64)> {
        let code = image
            .export(CODE_REGISTRATION_SYMBOL)
            .ok_or(Error::RegistrationNotFound(CODE_REGISTRATION_SYMBOL))?;
        let metadata = image
            .export(METADATA_REGISTRATION_SYMBOL)
            .ok_or(Error::RegistrationNotFound(METADATA_REGISTRATION_SYMBOL))?;
        Ok((code.address, metadata.address))
    }

    /// Decode both registration structures at the given virtual addresses
    ///
    /// # Errors
    /// Returns an error if any structure or table lies outside the mapped image or contains
    /// invalid type tags.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn read(
        image: &dyn BinaryImage,
        version: MetadataVersion,
        code_va: u64,
        metadata_va: u64,
    ) -> Result<Registration> {
        let reader = RegistrationReader::new(image, version);

        let code: CodeRegistrationHeader = reader.read_at(code_va)?;
        let meta: MetadataRegistrationHeader = reader.read_at(metadata_va)?;

        let mut registration = reader.read_types(&meta)?;

        registration.method_specs =
            reader.read_array(meta.method_specs, meta.method_specs_count)?;
        registration.generic_method_table =
            reader.read_array(meta.generic_method_table, meta.generic_method_table_count)?;
        registration.generic_method_pointers =
            reader.read_pointers(code.generic_method_pointers, code.generic_method_pointers_count)?;

        if version.is_at_least(24.2) {
            let modules = reader.read_pointers(code.code_gen_modules, code.code_gen_modules_count)?;
            for module_va in modules {
                let module: CodeGenModuleHeader = reader.read_at(module_va)?;
                registration.code_gen_modules.push(CodeGenModule {
                    name: reader.read_c_string(module.module_name.0)?,
                    method_pointers: reader
                        .read_pointers(module.method_pointers, module.method_pointer_count)?,
                });
            }
        } else {
            registration.method_pointers =
                reader.read_pointers(code.method_pointers, code.method_pointers_count)?;
        }

        tracing::debug!(
            types = registration.types.len(),
            generic_classes = registration.generic_classes.len(),
            method_specs = registration.method_specs.len(),
            modules = registration.code_gen_modules.len(),
            "decoded registration"
        );

        Ok(registration)
    }

    /// Get a type by metadata type index; negative indices are the "none" sentinel
    #[must_use]
    pub fn type_at(&self, index: i32) -> Option<&Il2CppType> {
        usize::try_from(index).ok().and_then(|i| self.types.get(i))
    }

    /// The type definition a generic class instantiates
    #[must_use]
    pub fn generic_class_definition(&self, class: &GenericClass) -> Option<i32> {
        match class.base {
            GenericClassBase::Definition(index) => Some(index),
            GenericClassBase::Type(index) => match self.types.get(index)?.data {
                TypeData::TypeDefinition(definition) => Some(definition),
                _ => None,
            },
        }
    }

    /// The native entry point of a non-generic method defined in `image_name`
    #[must_use]
    pub fn method_pointer(
        &self,
        version: MetadataVersion,
        image_name: &str,
        method: &MethodDefinition,
    ) -> Option<u64> {
        let pointer = if version.is_at_least(24.2) {
            let module = self.code_gen_modules.iter().find(|m| m.name == image_name)?;
            let rid = (method.token & 0x00FF_FFFF) as usize;
            *module.method_pointers.get(rid.checked_sub(1)?)?
        } else {
            let index = usize::try_from(method.method_index).ok()?;
            *self.method_pointers.get(index)?
        };

        (pointer != 0).then_some(pointer)
    }

    /// Native entry points keyed by method spec index, built in one pass over the generic
    /// method table. Specs without generated code are absent; for a spec listed more than once
    /// the first non-zero pointer wins.
    #[must_use]
    pub fn generic_method_pointers_by_spec(&self) -> HashMap<usize, u64> {
        let mut pointers = HashMap::with_capacity(self.generic_method_table.len());
        for entry in &self.generic_method_table {
            let (Ok(spec), Ok(index)) = (
                usize::try_from(entry.generic_method_index),
                usize::try_from(entry.method_index),
            ) else {
                continue;
            };
            match self.generic_method_pointers.get(index) {
                Some(&pointer) if pointer != 0 => {
                    pointers.entry(spec).or_insert(pointer);
                }
                _ => {}
            }
        }
        pointers
    }

    /// Argument types of a generic instantiation index; -1 yields an empty list
    ///
    /// # Errors
    /// Returns `Malformed` for indices past the instantiation table.
    pub fn generic_inst_types(&self, index: i32) -> Result<&[usize]> {
        let Ok(index) = usize::try_from(index) else {
            return Ok(&[]);
        };
        self.generic_insts
            .get(index)
            .map(|inst| inst.types.as_slice())
            .ok_or_else(|| malformed_error!("Generic instance index out of range - {}", index))
    }
}

/// Pointer chasing over a binary image for one metadata version.
struct RegistrationReader<'a> {
    image: &'a dyn BinaryImage,
    version: MetadataVersion,
    pointer_size: usize,
}

impl<'a> RegistrationReader<'a> {
    fn new(image: &'a dyn BinaryImage, version: MetadataVersion) -> Self {
        RegistrationReader {
            image,
            version,
            pointer_size: image.pointer_size(),
        }
    }

    fn reader_at(&self, va: u64) -> Result<MetadataReader<'a>> {
        Ok(MetadataReader::from_parser(
            self.image.parser_at(va)?,
            self.version,
            self.pointer_size,
        ))
    }

    fn read_at<T: Decode>(&self, va: u64) -> Result<T> {
        self.reader_at(va)?.read::<T>()
    }

    fn read_array<T: Decode>(&self, va: NativePtr, count: NativePtr) -> Result<Vec<T>> {
        let count = count.as_count()?;
        if count == 0 {
            return Ok(Vec::new());
        }
        self.reader_at(va.0)?.read_array::<T>(count)
    }

    fn read_pointers(&self, va: NativePtr, count: NativePtr) -> Result<Vec<u64>> {
        Ok(self
            .read_array::<NativePtr>(va, count)?
            .into_iter()
            .map(|ptr| ptr.0)
            .collect())
    }

    fn read_c_string(&self, va: u64) -> Result<String> {
        let offset = self.image.va_to_offset(va)?;
        let Some(data) = self.image.data().get(offset..) else {
            return Err(out_of_bounds_error!());
        };
        let Some(len) = data.iter().position(|&b| b == 0) else {
            return Err(malformed_error!("Unterminated string at 0x{:X}", va));
        };
        Ok(String::from_utf8_lossy(&data[..len]).into_owned())
    }

    /// Decode the type table and everything reachable from it.
    ///
    /// Every `Il2CppType`, generic class and generic instantiation is identified by its address;
    /// entries referenced only through pointers are appended after the declared tables.
    fn read_types(&self, meta: &MetadataRegistrationHeader) -> Result<Registration> {
        let type_addresses = self.read_pointers(meta.types, meta.types_count)?;
        let class_addresses = self.read_pointers(meta.generic_classes, meta.generic_classes_count)?;
        let inst_addresses = self.read_pointers(meta.generic_insts, meta.generic_insts_count)?;

        let mut interner = AddressInterner::default();
        for va in type_addresses {
            interner.intern_type(va);
        }
        for va in class_addresses {
            interner.intern_class(va);
        }
        for va in inst_addresses {
            interner.intern_inst(va);
        }

        let mut registration = Registration::default();

        while let Some(work) = interner.pending.pop_front() {
            match work {
                Pending::Type(va) => {
                    let raw = RawType::read(&mut self.image.parser_at(va)?, self.version, self.pointer_size)?;
                    let data = self.type_data(&raw, &mut interner)?;
                    let index = interner.types[&va];
                    put(&mut registration.types, index, raw.resolve(data));
                }
                Pending::Class(va) => {
                    let mut reader = self.reader_at(va)?;
                    let base = if self.version.is_at_least(27.0) {
                        GenericClassBase::Type(interner.intern_type(reader.read::<NativePtr>()?.0))
                    } else {
                        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                        let definition = reader.read::<NativePtr>()?.0 as u32 as i32;
                        GenericClassBase::Definition(definition)
                    };
                    let class_inst = reader.read::<NativePtr>()?;
                    let method_inst = reader.read::<NativePtr>()?;

                    let class = GenericClass {
                        base,
                        class_inst: (!class_inst.is_null()).then(|| interner.intern_inst(class_inst.0)),
                        method_inst: (!method_inst.is_null()).then(|| interner.intern_inst(method_inst.0)),
                    };
                    let index = interner.classes[&va];
                    put(&mut registration.generic_classes, index, class);
                }
                Pending::Inst(va) => {
                    let mut reader = self.reader_at(va)?;
                    let argc = reader.read::<NativePtr>()?;
                    let argv = reader.read::<NativePtr>()?;
                    let types = self
                        .read_pointers(argv, argc)?
                        .into_iter()
                        .map(|type_va| interner.intern_type(type_va))
                        .collect();
                    let index = interner.insts[&va];
                    put(&mut registration.generic_insts, index, GenericInst { types });
                }
            }
        }

        Ok(registration)
    }

    fn type_data(&self, raw: &RawType, interner: &mut AddressInterner) -> Result<TypeData> {
        use crate::binary::Il2CppTypeEnum as K;

        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let as_index = raw.data as u32 as i32;

        Ok(match raw.kind {
            K::Var | K::MVar => TypeData::GenericParameter(as_index),
            K::Ptr | K::SzArray => TypeData::Element(interner.intern_type(raw.data)),
            K::Array => {
                let mut reader = self.reader_at(raw.data)?;
                let element = reader.read::<NativePtr>()?;
                let rank = reader.read::<u8>()?;
                TypeData::Array {
                    element: interner.intern_type(element.0),
                    rank,
                }
            }
            K::GenericInst => TypeData::GenericClass(interner.intern_class(raw.data)),
            K::FnPtr | K::End => TypeData::None,
            _ => TypeData::TypeDefinition(as_index),
        })
    }
}

/// Place `value` at `index`, growing the table with copies of it if needed.
fn put<T: Clone>(table: &mut Vec<T>, index: usize, value: T) {
    if index >= table.len() {
        table.resize(index + 1, value.clone());
    }
    table[index] = value;
}

enum Pending {
    Type(u64),
    Class(u64),
    Inst(u64),
}

#[derive(Default)]
struct AddressInterner {
    types: HashMap<u64, usize>,
    classes: HashMap<u64, usize>,
    insts: HashMap<u64, usize>,
    pending: VecDeque<Pending>,
}

impl AddressInterner {
    fn intern_type(&mut self, va: u64) -> usize {
        let next = self.types.len();
        *self.types.entry(va).or_insert_with(|| {
            self.pending.push_back(Pending::Type(va));
            next
        })
    }

    fn intern_class(&mut self, va: u64) -> usize {
        let next = self.classes.len();
        *self.classes.entry(va).or_insert_with(|| {
            self.pending.push_back(Pending::Class(va));
            next
        })
    }

    fn intern_inst(&mut self, va: u64) -> usize {
        let next = self.insts.len();
        *self.insts.entry(va).or_insert_with(|| {
            self.pending.push_back(Pending::Inst(va));
            next
        })
    }
}
