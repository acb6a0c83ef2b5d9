use std::{collections::HashMap, fmt::Write as _, sync::Arc};

use crate::{
    binary::{
        CodeGenModule, GenericClass, GenericClassBase, GenericInst, GenericMethodFunctions,
        Il2CppType, Il2CppTypeEnum, MethodSpec, Registration, TypeData,
    },
    context::{ApplicationContext, ImageInstructionSet, LoadOptions},
    metadata::{
        tables::{
            AssemblyDefinition, AssemblyNameDefinition, AttributeDataRange, AttributeTypeRange,
            EventDefinition, FieldDefinition, GenericContainer, GenericParameter,
            ImageDefinition, MethodDefinition, ParameterDefinition, PropertyDefinition,
            TypeDefinition,
        },
        Decode, Encode, GlobalMetadata, MetadataHeader, MetadataVersion, METADATA_SANITY,
    },
    BinaryImage, FlatImage, Result,
};

/// Virtual address of the first byte of the synthetic code image
pub const CODE_BASE: u64 = 0x1_0000;

const PUBLIC_TYPE: u32 = 0x0000_0001;
const NESTED_PUBLIC_TYPE: u32 = 0x0000_0002;
const PUBLIC_METHOD: u16 = 0x0006 | 0x0080;

/// Registration type indices of the core library types created by [`MetadataBuilder::corlib`].
///
/// Types left out through [`MetadataBuilder::corlib_without`] are -1.
#[derive(Debug, Clone, Copy)]
#[allow(missing_docs)]
pub struct Corlib {
    pub assembly: usize,
    pub object: i32,
    pub void: i32,
    pub boolean: i32,
    pub char: i32,
    pub sbyte: i32,
    pub byte: i32,
    pub int16: i32,
    pub uint16: i32,
    pub int32: i32,
    pub uint32: i32,
    pub int64: i32,
    pub uint64: i32,
    pub single: i32,
    pub double: i32,
    pub intptr: i32,
    pub uintptr: i32,
    pub string: i32,
    pub typed_reference: i32,
    pub value_type: i32,
    pub enum_: i32,
    pub type_: i32,
    pub exception: i32,
    pub attribute: i32,
    pub unmanaged_callers_only: i32,
}

/// Builds a metadata blob, registration and code image for one layout revision.
///
/// Rows are appended in call order. Members of one type, types of one assembly and
/// parameters of one method must be added without interleaving them with another owner;
/// index lists (nested types, interfaces, constraints, attributes) may be added in any order.
pub struct MetadataBuilder {
    version: MetadataVersion,
    strings: Vec<u8>,
    string_index: HashMap<String, i32>,
    blobs: Vec<u8>,

    assemblies: Vec<AssemblyDefinition>,
    images: Vec<ImageDefinition>,
    types: Vec<TypeDefinition>,
    type_images: Vec<usize>,
    methods: Vec<MethodDefinition>,
    parameters: Vec<ParameterDefinition>,
    fields: Vec<FieldDefinition>,
    properties: Vec<PropertyDefinition>,
    events: Vec<EventDefinition>,
    generic_containers: Vec<GenericContainer>,
    generic_parameters: Vec<GenericParameter>,

    nested: HashMap<i32, Vec<i32>>,
    interfaces: HashMap<i32, Vec<i32>>,
    constraints: HashMap<i32, Vec<i32>>,
    attribute_types: HashMap<usize, Vec<(u32, Vec<i32>)>>,
    legacy_attribute_types: Vec<Vec<i32>>,
    attribute_data: HashMap<usize, Vec<(u32, Vec<u8>)>>,

    rids: HashMap<(usize, u32), u32>,
    registration: Registration,
    method_pointers: HashMap<i32, u64>,
    code: Vec<u8>,
    corlib: Option<Corlib>,
}

impl MetadataBuilder {
    /// An empty application in layout revision `version`
    #[must_use]
    pub fn new(version: MetadataVersion) -> Self {
        MetadataBuilder {
            version,
            strings: vec![0],
            string_index: HashMap::from([(String::new(), 0)]),
            blobs: vec![0],
            assemblies: Vec::new(),
            images: Vec::new(),
            types: Vec::new(),
            type_images: Vec::new(),
            methods: Vec::new(),
            parameters: Vec::new(),
            fields: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
            generic_containers: Vec::new(),
            generic_parameters: Vec::new(),
            nested: HashMap::new(),
            interfaces: HashMap::new(),
            constraints: HashMap::new(),
            attribute_types: HashMap::new(),
            legacy_attribute_types: Vec::new(),
            attribute_data: HashMap::new(),
            rids: HashMap::new(),
            registration: Registration::default(),
            method_pointers: HashMap::new(),
            code: vec![0xCC; 16],
            corlib: None,
        }
    }

    /// The layout revision
    #[must_use]
    pub fn version(&self) -> MetadataVersion {
        self.version
    }

    /// Intern a string heap entry
    pub fn string(&mut self, value: &str) -> i32 {
        if let Some(&index) = self.string_index.get(value) {
            return index;
        }

        let index = self.strings.len() as i32;
        self.strings.extend_from_slice(value.as_bytes());
        self.strings.push(0);
        self.string_index.insert(value.to_string(), index);
        index
    }

    fn blob(&mut self, value: &[u8]) -> i32 {
        let index = self.blobs.len() as i32;
        // keys stay below 0x80 bytes in tests, so the length is a single byte
        self.blobs.push(value.len() as u8);
        self.blobs.extend_from_slice(value);
        index
    }

    /// Add an assembly and its image; returns the assembly (and image) index
    pub fn assembly(&mut self, name: &str, image: &str) -> usize {
        self.add_assembly(name, image, None)
    }

    /// Add a strong-named assembly
    pub fn assembly_with_key(&mut self, name: &str, image: &str, public_key: &[u8]) -> usize {
        self.add_assembly(name, image, Some(public_key))
    }

    fn add_assembly(&mut self, name: &str, image: &str, public_key: Option<&[u8]>) -> usize {
        let index = self.assemblies.len();
        let version = self.version;

        let public_key_index = if version.is_at_least(24.4) || version.is(24.15) {
            self.blob(public_key.unwrap_or_default())
        } else {
            match public_key {
                Some(key) => {
                    let mut literal = String::from("\"");
                    for byte in key {
                        let _ = write!(literal, "\\x{byte:X}");
                    }
                    literal.push('"');
                    self.string(&literal)
                }
                None => self.string("NULL"),
            }
        };

        let aname = AssemblyNameDefinition {
            name_index: self.string(name),
            culture_index: 0,
            public_key_index,
            major: 1,
            ..AssemblyNameDefinition::default()
        };
        self.assemblies.push(AssemblyDefinition {
            image_index: index as i32,
            token: 0x2000_0001,
            custom_attribute_index: -1,
            aname,
            ..AssemblyDefinition::default()
        });
        let image_name_index = self.string(image);
        self.images.push(ImageDefinition {
            name_index: image_name_index,
            assembly_index: index as i32,
            type_start: -1,
            entry_point_index: -1,
            token: 1,
            ..ImageDefinition::default()
        });
        self.registration.code_gen_modules.push(CodeGenModule {
            name: image.to_string(),
            method_pointers: Vec::new(),
        });
        index
    }

    fn next_rid(&mut self, image: usize, table: u32) -> u32 {
        let rid = self.rids.entry((image, table)).or_insert(0);
        *rid += 1;
        (table << 24) | *rid
    }

    /// Add a registration type
    pub fn type_use(&mut self, kind: Il2CppTypeEnum, data: TypeData) -> i32 {
        self.registration.types.push(Il2CppType {
            data,
            attrs: 0,
            kind,
            num_mods: 0,
            byref: false,
            pinned: false,
            valuetype: false,
        });
        (self.registration.types.len() - 1) as i32
    }

    /// A copy of registration type `index` with use-site attribute flags
    pub fn type_use_with_attrs(&mut self, index: i32, attrs: u16) -> i32 {
        let mut ty = self.registration.types[index as usize];
        ty.attrs = attrs;
        self.registration.types.push(ty);
        (self.registration.types.len() - 1) as i32
    }

    /// `T&` of registration type `index`
    pub fn by_ref(&mut self, index: i32) -> i32 {
        let mut ty = self.registration.types[index as usize];
        ty.byref = true;
        self.registration.types.push(ty);
        (self.registration.types.len() - 1) as i32
    }

    /// `T[]`
    pub fn sz_array(&mut self, element: i32) -> i32 {
        self.type_use(Il2CppTypeEnum::SzArray, TypeData::Element(element as usize))
    }

    /// `T*`
    pub fn pointer(&mut self, element: i32) -> i32 {
        self.type_use(Il2CppTypeEnum::Ptr, TypeData::Element(element as usize))
    }

    /// `T[,..]` with `rank` dimensions
    pub fn array(&mut self, element: i32, rank: u8) -> i32 {
        self.type_use(
            Il2CppTypeEnum::Array,
            TypeData::Array {
                element: element as usize,
                rank,
            },
        )
    }

    /// A generic instantiation list; returns its index
    pub fn generic_inst(&mut self, args: &[i32]) -> i32 {
        self.registration.generic_insts.push(GenericInst {
            types: args.iter().map(|&arg| arg as usize).collect(),
        });
        (self.registration.generic_insts.len() - 1) as i32
    }

    /// `Definition<args>` as registration type
    pub fn generic_instance(&mut self, definition: i32, args: &[i32]) -> i32 {
        let inst = self.generic_inst(args);
        let base = if self.version.is_at_least(27.0) {
            GenericClassBase::Type(self.type_of(definition) as usize)
        } else {
            GenericClassBase::Definition(definition)
        };
        self.registration.generic_classes.push(GenericClass {
            base,
            class_inst: Some(inst as usize),
            method_inst: None,
        });
        let class = self.registration.generic_classes.len() - 1;
        self.type_use(Il2CppTypeEnum::GenericInst, TypeData::GenericClass(class))
    }

    /// The by-value registration type of type definition `ty`
    #[must_use]
    pub fn type_of(&self, ty: i32) -> i32 {
        self.types[ty as usize].byval_type_index
    }

    /// A reference type in assembly `assembly`; returns the type definition index
    pub fn type_def(&mut self, assembly: usize, namespace: &str, name: &str) -> i32 {
        self.add_type(assembly, namespace, name, Il2CppTypeEnum::Class, PUBLIC_TYPE, 0)
    }

    /// A value type in assembly `assembly`
    pub fn value_type_def(&mut self, assembly: usize, namespace: &str, name: &str) -> i32 {
        let ty = self.add_type(assembly, namespace, name, Il2CppTypeEnum::ValueType, PUBLIC_TYPE, 0x1);
        if let Some(corlib) = self.corlib {
            self.set_parent(ty, corlib.value_type);
        }
        ty
    }

    /// An enum with underlying registration type `underlying`
    pub fn enum_def(&mut self, assembly: usize, namespace: &str, name: &str, underlying: i32) -> i32 {
        let ty = self.add_type(assembly, namespace, name, Il2CppTypeEnum::ValueType, PUBLIC_TYPE, 0x3);
        self.types[ty as usize].element_type_index = underlying;
        if let Some(corlib) = self.corlib {
            self.set_parent(ty, corlib.enum_);
        }
        ty
    }

    /// A generic reference type with type parameters `parameters`
    pub fn generic_type_def(
        &mut self,
        assembly: usize,
        namespace: &str,
        name: &str,
        parameters: &[&str],
    ) -> i32 {
        let ty = self.type_def(assembly, namespace, name);
        let (container, _) = self.container(ty, false, parameters);
        self.types[ty as usize].generic_container_index = container;
        ty
    }

    /// A type nested in `parent`, in the parent's assembly
    pub fn nested_type_def(&mut self, parent: i32, name: &str) -> i32 {
        let assembly = self.type_images[parent as usize];
        let ty = self.add_type(assembly, "", name, Il2CppTypeEnum::Class, NESTED_PUBLIC_TYPE, 0);
        self.nest(parent, ty);
        ty
    }

    fn add_type(
        &mut self,
        image: usize,
        namespace: &str,
        name: &str,
        kind: Il2CppTypeEnum,
        flags: u32,
        bitfield: u32,
    ) -> i32 {
        let index = self.types.len() as i32;
        let record = &mut self.images[image];
        if record.type_count == 0 {
            record.type_start = index;
        } else {
            assert_eq!(
                record.type_start + record.type_count as i32,
                index,
                "types of one assembly must be added together"
            );
        }
        record.type_count += 1;

        let byval = self.type_use(kind, TypeData::TypeDefinition(index));
        self.registration.types[byval as usize].valuetype = bitfield & 1 != 0;
        let byref = self.by_ref(byval);
        let token = self.next_rid(image, 0x02);
        let name_index = self.string(name);
        let namespace_index = self.string(namespace);

        self.types.push(TypeDefinition {
            name_index,
            namespace_index,
            custom_attribute_index: -1,
            byval_type_index: byval,
            byref_type_index: byref,
            declaring_type_index: -1,
            parent_index: -1,
            element_type_index: -1,
            rgctx_start_index: -1,
            generic_container_index: -1,
            flags,
            field_start: -1,
            method_start: -1,
            event_start: -1,
            property_start: -1,
            nested_types_start: -1,
            interfaces_start: -1,
            vtable_start: -1,
            interface_offsets_start: -1,
            bitfield,
            token,
            ..TypeDefinition::default()
        });
        self.type_images.push(image);
        index
    }

    /// Declare `child` as nested type of `parent`
    pub fn nest(&mut self, parent: i32, child: i32) {
        self.types[child as usize].declaring_type_index = self.type_of(parent);
        self.nested.entry(parent).or_default().push(child);
    }

    /// Set the base type of `ty` to registration type `parent`
    pub fn set_parent(&mut self, ty: i32, parent: i32) {
        self.types[ty as usize].parent_index = parent;
    }

    /// Add an implemented interface (registration type) to `ty`
    pub fn add_interface(&mut self, ty: i32, interface: i32) {
        self.interfaces.entry(ty).or_default().push(interface);
    }

    fn container(&mut self, owner: i32, is_method: bool, parameters: &[&str]) -> (i32, Vec<i32>) {
        let container = self.generic_containers.len() as i32;
        let start = self.generic_parameters.len() as i32;

        let indices = parameters
            .iter()
            .enumerate()
            .map(|(ordinal, name)| {
                let name_index = self.string(name);
                self.generic_parameters.push(GenericParameter {
                    owner_index: container,
                    name_index,
                    constraints_start: -1,
                    constraints_count: 0,
                    num: ordinal as u16,
                    flags: 0,
                });
                (self.generic_parameters.len() - 1) as i32
            })
            .collect();

        self.generic_containers.push(GenericContainer {
            owner_index: owner,
            type_argc: parameters.len() as i32,
            is_method: i32::from(is_method),
            generic_parameter_start: start,
        });
        (container, indices)
    }

    /// The generic parameter row of ordinal `ordinal` of generic type `ty`
    #[must_use]
    pub fn type_generic_parameter(&self, ty: i32, ordinal: usize) -> i32 {
        let container = &self.generic_containers[self.types[ty as usize].generic_container_index as usize];
        container.generic_parameter_start + ordinal as i32
    }

    /// Method generic parameters for the next method added with [`Self::method_full`].
    ///
    /// Returns the container and the parameter rows; the container is bound to the method
    /// that passes it.
    pub fn method_generic_parameters(&mut self, parameters: &[&str]) -> (i32, Vec<i32>) {
        self.container(-1, true, parameters)
    }

    /// `T` (`Var`) or `!!T` (`MVar`) of generic parameter row `parameter`
    pub fn generic_parameter_type(&mut self, parameter: i32) -> i32 {
        let owner = self.generic_parameters[parameter as usize].owner_index;
        let kind = if self.generic_containers[owner as usize].is_method() {
            Il2CppTypeEnum::MVar
        } else {
            Il2CppTypeEnum::Var
        };
        self.type_use(kind, TypeData::GenericParameter(parameter))
    }

    /// Add a constraint (registration type) to generic parameter row `parameter`
    pub fn constrain(&mut self, parameter: i32, constraint: i32) {
        self.constraints.entry(parameter).or_default().push(constraint);
    }

    /// A public instance method returning `System.Void` (or nothing resolvable without
    /// [`Self::corlib`]); `parameters` are `(name, registration type)` pairs
    pub fn method(&mut self, ty: i32, name: &str, parameters: &[(&str, i32)]) -> i32 {
        let void = self.corlib.map_or(-1, |corlib| corlib.void);
        self.method_full(ty, name, void, parameters, PUBLIC_METHOD, -1)
    }

    /// Add a method with every detail spelled out
    pub fn method_full(
        &mut self,
        ty: i32,
        name: &str,
        return_type: i32,
        parameters: &[(&str, i32)],
        flags: u16,
        generic_container: i32,
    ) -> i32 {
        let index = self.methods.len() as i32;
        let definition = &mut self.types[ty as usize];
        if definition.method_count == 0 {
            definition.method_start = index;
        } else {
            assert_eq!(
                definition.method_start + i32::from(definition.method_count),
                index,
                "methods of one type must be added together"
            );
        }
        definition.method_count += 1;

        if generic_container >= 0 {
            self.generic_containers[generic_container as usize].owner_index = index;
        }

        let image = self.type_images[ty as usize];
        let parameter_start = self.parameters.len() as i32;
        for (name, type_index) in parameters {
            let name_index = self.string(name);
            let token = self.next_rid(image, 0x08);
            self.parameters.push(ParameterDefinition {
                name_index,
                token,
                custom_attribute_index: -1,
                type_index: *type_index,
            });
        }

        let token = self.next_rid(image, 0x06);
        let name_index = self.string(name);
        self.methods.push(MethodDefinition {
            name_index,
            declaring_type: ty,
            return_type,
            parameter_start: if parameters.is_empty() { -1 } else { parameter_start },
            custom_attribute_index: -1,
            generic_container_index: generic_container,
            method_index: -1,
            invoker_index: -1,
            delegate_wrapper_index: -1,
            rgctx_start_index: -1,
            token,
            flags,
            parameter_count: parameters.len() as u16,
            ..MethodDefinition::default()
        });
        index
    }

    /// Add a field; `attrs` become the use-site flags of its type
    pub fn field(&mut self, ty: i32, name: &str, field_type: i32, attrs: u16) -> i32 {
        let index = self.fields.len() as i32;
        let definition = &mut self.types[ty as usize];
        if definition.field_count == 0 {
            definition.field_start = index;
        } else {
            assert_eq!(
                definition.field_start + i32::from(definition.field_count),
                index,
                "fields of one type must be added together"
            );
        }
        definition.field_count += 1;

        let type_index = if attrs == 0 {
            field_type
        } else {
            self.type_use_with_attrs(field_type, attrs)
        };
        let image = self.type_images[ty as usize];
        let token = self.next_rid(image, 0x04);
        let name_index = self.string(name);
        self.fields.push(FieldDefinition {
            name_index,
            type_index,
            custom_attribute_index: -1,
            token,
        });
        index
    }

    /// Add a property with accessor method definitions of `ty`
    pub fn property(&mut self, ty: i32, name: &str, getter: Option<i32>, setter: Option<i32>) -> i32 {
        let index = self.properties.len() as i32;
        let definition = &mut self.types[ty as usize];
        if definition.property_count == 0 {
            definition.property_start = index;
        } else {
            assert_eq!(
                definition.property_start + i32::from(definition.property_count),
                index,
                "properties of one type must be added together"
            );
        }
        definition.property_count += 1;
        let method_start = definition.method_start;

        let image = self.type_images[ty as usize];
        let token = self.next_rid(image, 0x17);
        let name_index = self.string(name);
        self.properties.push(PropertyDefinition {
            name_index,
            get: getter.map_or(-1, |method| method - method_start),
            set: setter.map_or(-1, |method| method - method_start),
            attrs: 0,
            custom_attribute_index: -1,
            token,
        });
        index
    }

    /// Add an event with accessor method definitions `[add, remove, raise]` of `ty`
    pub fn event(&mut self, ty: i32, name: &str, event_type: i32, accessors: [Option<i32>; 3]) -> i32 {
        let index = self.events.len() as i32;
        let definition = &mut self.types[ty as usize];
        if definition.event_count == 0 {
            definition.event_start = index;
        } else {
            assert_eq!(
                definition.event_start + i32::from(definition.event_count),
                index,
                "events of one type must be added together"
            );
        }
        definition.event_count += 1;
        let method_start = definition.method_start;
        let relative = |method: Option<i32>| method.map_or(-1, |method| method - method_start);

        let image = self.type_images[ty as usize];
        let token = self.next_rid(image, 0x14);
        let name_index = self.string(name);
        self.events.push(EventDefinition {
            name_index,
            type_index: event_type,
            add: relative(accessors[0]),
            remove: relative(accessors[1]),
            raise: relative(accessors[2]),
            custom_attribute_index: -1,
            token,
        });
        index
    }

    /// Metadata token of type definition `ty`
    #[must_use]
    pub fn type_token(&self, ty: i32) -> u32 {
        self.types[ty as usize].token
    }

    /// Metadata token of method definition `method`
    #[must_use]
    pub fn method_token(&self, method: i32) -> u32 {
        self.methods[method as usize].token
    }

    /// Append code bytes to the image; returns their address
    pub fn code_block(&mut self, bytes: &[u8]) -> u64 {
        let address = CODE_BASE + self.code.len() as u64;
        self.code.extend_from_slice(bytes);
        address
    }

    /// Register the native entry point of method definition `method`
    pub fn method_pointer(&mut self, method: i32, address: u64) {
        self.method_pointers.insert(method, address);
    }

    /// Add a method spec instantiating `method`; `pointer` 0 means no generated code.
    /// Returns the spec index.
    pub fn method_spec(&mut self, method: i32, type_args: &[i32], method_args: &[i32], pointer: u64) -> usize {
        let class_index_index = if type_args.is_empty() { -1 } else { self.generic_inst(type_args) };
        let method_index_index = if method_args.is_empty() { -1 } else { self.generic_inst(method_args) };

        let spec = self.registration.method_specs.len();
        self.registration.method_specs.push(MethodSpec {
            method_definition_index: method,
            class_index_index,
            method_index_index,
        });

        if pointer != 0 {
            self.registration.generic_method_pointers.push(pointer);
            self.registration.generic_method_table.push(GenericMethodFunctions {
                generic_method_index: spec as i32,
                method_index: (self.registration.generic_method_pointers.len() - 1) as i32,
                invoker_index: -1,
                adjustor_thunk_index: -1,
            });
        }
        spec
    }

    /// Attribute types of `token` in assembly `assembly` (24.1 up to 29)
    pub fn attribute_types(&mut self, assembly: usize, token: u32, types: &[i32]) {
        self.attribute_types
            .entry(assembly)
            .or_default()
            .push((token, types.to_vec()));
    }

    /// Attribute types addressed by a legacy custom attribute index (before 24.1); returns the
    /// index
    pub fn legacy_attribute_types(&mut self, types: &[i32]) -> i32 {
        self.legacy_attribute_types.push(types.to_vec());
        (self.legacy_attribute_types.len() - 1) as i32
    }

    /// Attribute blob of `token` in assembly `assembly` (29+)
    pub fn custom_attribute_data(&mut self, assembly: usize, token: u32, blob: Vec<u8>) {
        self.attribute_data
            .entry(assembly)
            .or_default()
            .push((token, blob));
    }

    /// A core library named `mscorlib` with every well-known system type
    pub fn corlib(&mut self) -> Corlib {
        self.corlib_without(&[])
    }

    /// A core library lacking the types named in `missing` (full names)
    pub fn corlib_without(&mut self, missing: &[&str]) -> Corlib {
        let assembly = self.assembly("mscorlib", "mscorlib.dll");

        let add = |builder: &mut Self, name: &str, kind: Il2CppTypeEnum, value_type: bool| -> i32 {
            let full_name = format!("System.{name}");
            if missing.contains(&full_name.as_str()) {
                return -1;
            }
            let ty = builder.add_type(assembly, "System", name, kind, PUBLIC_TYPE, u32::from(value_type));
            builder.type_of(ty)
        };

        let object = add(self, "Object", Il2CppTypeEnum::Object, false);
        let value_type = add(self, "ValueType", Il2CppTypeEnum::Class, false);
        let enum_ = add(self, "Enum", Il2CppTypeEnum::Class, false);
        let mut corlib = Corlib {
            assembly,
            object,
            void: add(self, "Void", Il2CppTypeEnum::Void, true),
            boolean: add(self, "Boolean", Il2CppTypeEnum::Boolean, true),
            char: add(self, "Char", Il2CppTypeEnum::Char, true),
            sbyte: add(self, "SByte", Il2CppTypeEnum::I1, true),
            byte: add(self, "Byte", Il2CppTypeEnum::U1, true),
            int16: add(self, "Int16", Il2CppTypeEnum::I2, true),
            uint16: add(self, "UInt16", Il2CppTypeEnum::U2, true),
            int32: add(self, "Int32", Il2CppTypeEnum::I4, true),
            uint32: add(self, "UInt32", Il2CppTypeEnum::U4, true),
            int64: add(self, "Int64", Il2CppTypeEnum::I8, true),
            uint64: add(self, "UInt64", Il2CppTypeEnum::U8, true),
            single: add(self, "Single", Il2CppTypeEnum::R4, true),
            double: add(self, "Double", Il2CppTypeEnum::R8, true),
            intptr: add(self, "IntPtr", Il2CppTypeEnum::I, true),
            uintptr: add(self, "UIntPtr", Il2CppTypeEnum::U, true),
            string: add(self, "String", Il2CppTypeEnum::String, false),
            typed_reference: add(self, "TypedReference", Il2CppTypeEnum::TypedByRef, true),
            value_type,
            enum_,
            type_: add(self, "Type", Il2CppTypeEnum::Class, false),
            exception: add(self, "Exception", Il2CppTypeEnum::Class, false),
            attribute: add(self, "Attribute", Il2CppTypeEnum::Class, false),
            unmanaged_callers_only: -1,
        };

        let uco_name = "System.Runtime.InteropServices.UnmanagedCallersOnlyAttribute";
        if !missing.contains(&uco_name) {
            let ty = self.add_type(
                assembly,
                "System.Runtime.InteropServices",
                "UnmanagedCallersOnlyAttribute",
                Il2CppTypeEnum::Class,
                PUBLIC_TYPE,
                0,
            );
            corlib.unmanaged_callers_only = self.type_of(ty);
        }

        let start = self.images[assembly].type_start as usize;
        let count = self.images[assembly].type_count as usize;
        for ty in &mut self.types[start..start + count] {
            ty.parent_index = if ty.byval_type_index == object {
                -1
            } else if ty.bitfield & 1 != 0 || ty.byval_type_index == enum_ {
                value_type
            } else {
                object
            };
        }

        self.corlib = Some(corlib);
        corlib
    }

    /// The core library added by [`Self::corlib`]
    ///
    /// # Panics
    /// Panics if no core library has been added.
    #[must_use]
    pub fn core(&self) -> Corlib {
        self.corlib.expect("corlib() has not been called")
    }

    /// Encode the metadata blob
    ///
    /// # Errors
    /// Returns an error if the encoded blob does not decode again.
    pub fn build(&self) -> Result<GlobalMetadata> {
        GlobalMetadata::from_mem(self.encode(), Some(self.version))
    }

    /// The raw `global-metadata.dat` bytes
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let version = self.version;
        let mut types = self.types.clone();
        let mut images = self.images.clone();
        let mut generic_parameters = self.generic_parameters.clone();

        let nested = layout_lists(&self.nested, |ty, start, count| {
            types[ty as usize].nested_types_start = start;
            types[ty as usize].nested_type_count = count as u16;
        });
        let interfaces = layout_lists(&self.interfaces, |ty, start, count| {
            types[ty as usize].interfaces_start = start;
            types[ty as usize].interfaces_count = count as u16;
        });
        let constraints = layout_lists(&self.constraints, |parameter, start, count| {
            generic_parameters[parameter as usize].constraints_start = start as i16;
            generic_parameters[parameter as usize].constraints_count = count as i16;
        });

        let mut methods = self.methods.clone();
        if version.is_less_than(24.2) {
            for (index, method) in methods.iter_mut().enumerate() {
                method.method_index = index as i32;
            }
        }

        let mut attribute_ranges = Vec::new();
        let mut attribute_types = Vec::new();
        let mut data_ranges = Vec::new();
        let mut attribute_heap = Vec::new();

        if version.is_less_than(24.1) {
            for list in &self.legacy_attribute_types {
                attribute_ranges.push(AttributeTypeRange {
                    token: 0,
                    start: attribute_types.len() as i32,
                    count: list.len() as i32,
                });
                attribute_types.extend_from_slice(list);
            }
        } else {
            for (index, image) in images.iter_mut().enumerate() {
                if version.is_at_least(29.0) {
                    let mut entries = self.attribute_data.get(&index).cloned().unwrap_or_default();
                    entries.sort_by_key(|(token, _)| *token);
                    image.custom_attribute_start = data_ranges.len() as i32;
                    image.custom_attribute_count = entries.len() as u32;
                    for (token, blob) in entries {
                        data_ranges.push(AttributeDataRange {
                            token,
                            start_offset: attribute_heap.len() as u32,
                        });
                        attribute_heap.extend_from_slice(&blob);
                    }
                } else {
                    let mut entries = self.attribute_types.get(&index).cloned().unwrap_or_default();
                    entries.sort_by_key(|(token, _)| *token);
                    image.custom_attribute_start = attribute_ranges.len() as i32;
                    image.custom_attribute_count = entries.len() as u32;
                    for (token, list) in entries {
                        attribute_ranges.push(AttributeTypeRange {
                            token,
                            start: attribute_types.len() as i32,
                            count: list.len() as i32,
                        });
                        attribute_types.extend_from_slice(&list);
                    }
                }
            }
        }

        let header_size = MetadataHeader::encoded_size(version, 8);
        let mut out = vec![0u8; header_size];
        let mut header = MetadataHeader {
            sanity: METADATA_SANITY,
            version: version.value() as i32,
            ..MetadataHeader::default()
        };

        let region = |out: &mut Vec<u8>, bytes: Vec<u8>| -> (i32, i32) {
            while out.len() % 4 != 0 {
                out.push(0);
            }
            let offset = out.len() as i32;
            out.extend_from_slice(&bytes);
            (offset, bytes.len() as i32)
        };

        (header.string_offset, header.string_size) = region(&mut out, self.strings.clone());
        (
            header.field_and_parameter_default_value_data_offset,
            header.field_and_parameter_default_value_data_size,
        ) = region(&mut out, self.blobs.clone());
        (header.assemblies_offset, header.assemblies_size) = region(&mut out, rows(&self.assemblies, version));
        (header.images_offset, header.images_size) = region(&mut out, rows(&images, version));
        (header.type_definitions_offset, header.type_definitions_size) = region(&mut out, rows(&types, version));
        (header.methods_offset, header.methods_size) = region(&mut out, rows(&methods, version));
        (header.parameters_offset, header.parameters_size) = region(&mut out, rows(&self.parameters, version));
        (header.fields_offset, header.fields_size) = region(&mut out, rows(&self.fields, version));
        (header.properties_offset, header.properties_size) = region(&mut out, rows(&self.properties, version));
        (header.events_offset, header.events_size) = region(&mut out, rows(&self.events, version));
        (header.generic_containers_offset, header.generic_containers_size) =
            region(&mut out, rows(&self.generic_containers, version));
        (header.generic_parameters_offset, header.generic_parameters_size) =
            region(&mut out, rows(&generic_parameters, version));
        (
            header.generic_parameter_constraints_offset,
            header.generic_parameter_constraints_size,
        ) = region(&mut out, rows(&constraints, version));
        (header.nested_types_offset, header.nested_types_size) = region(&mut out, rows(&nested, version));
        (header.interfaces_offset, header.interfaces_size) = region(&mut out, rows(&interfaces, version));
        (header.referenced_assemblies_offset, header.referenced_assemblies_size) = region(&mut out, Vec::new());

        if version.is_at_least(29.0) {
            (header.attribute_data_offset, header.attribute_data_size) = region(&mut out, attribute_heap);
            (header.attribute_data_range_offset, header.attribute_data_range_size) =
                region(&mut out, rows(&data_ranges, version));
        } else {
            (header.attributes_info_offset, header.attributes_info_size) =
                region(&mut out, rows(&attribute_ranges, version));
            (header.attribute_types_offset, header.attribute_types_size) =
                region(&mut out, rows(&attribute_types, version));
        }

        let mut encoded = Vec::with_capacity(header_size);
        header.encode(version, 8, &mut encoded);
        out[..header_size].copy_from_slice(&encoded);
        out
    }

    /// The native registration matching [`Self::build`]
    #[must_use]
    pub fn build_registration(&self) -> Registration {
        let mut registration = self.registration.clone();

        if self.version.is_at_least(24.2) {
            for (image, module) in registration.code_gen_modules.iter_mut().enumerate() {
                let start = self.images[image].type_start;
                let count = self.images[image].type_count as i32;
                let methods = self
                    .methods
                    .iter()
                    .enumerate()
                    .filter(|(_, method)| (start..start + count).contains(&method.declaring_type));

                for (index, method) in methods {
                    let rid = (method.token & 0x00FF_FFFF) as usize;
                    if module.method_pointers.len() < rid {
                        module.method_pointers.resize(rid, 0);
                    }
                    if let Some(&pointer) = self.method_pointers.get(&(index as i32)) {
                        module.method_pointers[rid - 1] = pointer;
                    }
                }
            }
        } else {
            registration.code_gen_modules.clear();
            registration.method_pointers = (0..self.methods.len())
                .map(|index| self.method_pointers.get(&(index as i32)).copied().unwrap_or(0))
                .collect();
        }

        registration
    }

    /// The synthetic code image
    ///
    /// # Errors
    /// Never fails for the fixed 64-bit layout.
    pub fn build_image(&self) -> Result<FlatImage> {
        FlatImage::new(self.code.clone(), CODE_BASE, 8)
    }

    /// Build the full application context
    ///
    /// # Errors
    /// Returns any metadata or load error.
    pub fn build_context(&self, options: LoadOptions) -> Result<Arc<ApplicationContext>> {
        let metadata = self.build()?;
        let registration = self.build_registration();
        let image: Arc<dyn BinaryImage> = Arc::new(self.build_image()?);
        let isa = Arc::new(ImageInstructionSet::new(image, &registration));

        ApplicationContext::new(metadata, registration, isa, options)
    }
}

fn rows<T: Encode>(records: &[T], version: MetadataVersion) -> Vec<u8> {
    let mut out = Vec::new();
    for record in records {
        record.encode(version, 8, &mut out);
    }
    out
}

/// Concatenate per-owner index lists in owner order, reporting each owner's range
fn layout_lists(lists: &HashMap<i32, Vec<i32>>, mut place: impl FnMut(i32, i32, usize)) -> Vec<i32> {
    let mut owners: Vec<_> = lists.keys().copied().collect();
    owners.sort_unstable();

    let mut out = Vec::new();
    for owner in owners {
        let list = &lists[&owner];
        place(owner, out.len() as i32, list.len());
        out.extend_from_slice(list);
    }
    out
}
