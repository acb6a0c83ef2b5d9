//! Decoder for the attribute data blobs of metadata 29+.
//!
//! ```text
//! blob      := count:cuint ctor:u32[count] attribute[count]
//! attribute := args:cuint fields:cuint props:cuint value[args] named[fields] named[props]
//! named     := value member:cint [declaring_type:cuint if member < 0]
//! value     := type:u8 [enum_type:cint if type == 0x55] payload
//! array     := len:cint [element_type:u8 differ:u8 element[len] if len != -1]
//! ```

use std::sync::Arc;

use crate::{
    binary::Il2CppTypeEnum,
    context::{
        assembly::AssemblyContextRc,
        customattributes::{
            CustomAttribute, CustomAttributeField, CustomAttributeParameter, CustomAttributeProperty,
            CustomAttributeTypeParameter,
        },
        members::MethodContextRc,
        typesystem::TypeContextRc,
        ApplicationContext,
    },
    file::parser::Parser,
    Result,
};

/// Array flag: every element carries its own type byte
const ELEMENTS_DIFFER: u8 = 1;

/// A value type, after enum encodings have been replaced by their underlying type
struct EncodedType {
    kind: Il2CppTypeEnum,
    enum_type: Option<TypeContextRc>,
}

struct Decoder<'a> {
    app: &'a Arc<ApplicationContext>,
    assembly: &'a AssemblyContextRc,
    parser: Parser<'a>,
}

/// Decode all attributes of one attribute data blob
pub(super) fn decode(
    app: &Arc<ApplicationContext>,
    assembly: &AssemblyContextRc,
    blob: &[u8],
) -> Result<Vec<CustomAttribute>> {
    let mut decoder = Decoder {
        app,
        assembly,
        parser: Parser::new(blob),
    };

    let count = decoder.parser.read_compressed_uint()? as usize;
    let constructors = (0..count)
        .map(|_| {
            let index = decoder.parser.read_le::<u32>()?;
            i32::try_from(index)
                .ok()
                .and_then(|index| app.resolve_method_by_index(index))
                .ok_or_else(|| malformed_error!("Attribute constructor {} is not a method", index))
        })
        .collect::<Result<Vec<_>>>()?;

    constructors
        .into_iter()
        .map(|constructor| decoder.attribute(constructor))
        .collect()
}

impl Decoder<'_> {
    fn attribute(&mut self, constructor: MethodContextRc) -> Result<CustomAttribute> {
        let argument_count = self.parser.read_compressed_uint()? as usize;
        let field_count = self.parser.read_compressed_uint()? as usize;
        let property_count = self.parser.read_compressed_uint()? as usize;

        let arguments = (0..argument_count)
            .map(|_| self.value())
            .collect::<Result<Vec<_>>>()?;

        let attribute_type = constructor
            .declaring_type()
            .ok_or_else(|| malformed_error!("Attribute constructor {} has no declaring type", constructor.name()))?;

        let mut fields = Vec::with_capacity(field_count);
        for _ in 0..field_count {
            let value = self.value()?;
            let (declaring, index) = self.named_member(&attribute_type)?;
            let field = declaring.fields().get(index).cloned().ok_or_else(|| {
                malformed_error!("Attribute field {} out of range for {}", index, declaring)
            })?;
            fields.push(CustomAttributeField { field, value });
        }

        let mut properties = Vec::with_capacity(property_count);
        for _ in 0..property_count {
            let value = self.value()?;
            let (declaring, index) = self.named_member(&attribute_type)?;
            let property = declaring.properties().get(index).cloned().ok_or_else(|| {
                malformed_error!("Attribute property {} out of range for {}", index, declaring)
            })?;
            properties.push(CustomAttributeProperty { property, value });
        }

        Ok(CustomAttribute {
            constructor,
            arguments,
            fields,
            properties,
        })
    }

    /// The declaring type and type-relative index of a named argument's member.
    ///
    /// Non-negative indices are members of the attribute type itself; inherited members are
    /// stored as `-(index + 1)` followed by the declaring type definition.
    fn named_member(&mut self, attribute_type: &TypeContextRc) -> Result<(TypeContextRc, usize)> {
        let member = self.parser.read_compressed_int()?;
        if let Ok(index) = usize::try_from(member) {
            return Ok((attribute_type.clone(), index));
        }

        let index = usize::try_from(-(i64::from(member) + 1))
            .map_err(|_| malformed_error!("Invalid named argument index - {}", member))?;
        let definition = self.parser.read_compressed_uint()?;
        let declaring = i32::try_from(definition)
            .ok()
            .and_then(|definition| self.app.type_by_definition_index(definition))
            .ok_or_else(|| malformed_error!("Named argument declared by missing type {}", definition))?;
        Ok((declaring, index))
    }

    fn encoded_type(&mut self) -> Result<EncodedType> {
        let byte = self.parser.read_le::<u8>()?;
        let kind = Il2CppTypeEnum::from_byte(byte)?;

        if kind != Il2CppTypeEnum::Enum {
            return Ok(EncodedType {
                kind,
                enum_type: None,
            });
        }

        let type_index = self.parser.read_compressed_int()?;
        let enum_type = self.assembly.resolve_il2cpp_type(type_index)?;
        let underlying = enum_type
            .definition()
            .and_then(|definition| self.app.registration().type_at(definition.element_type_index))
            .ok_or_else(|| malformed_error!("Enum {} has no underlying type", enum_type))?;

        Ok(EncodedType {
            kind: underlying.kind,
            enum_type: Some(enum_type),
        })
    }

    fn value(&mut self) -> Result<CustomAttributeParameter> {
        let ty = self.encoded_type()?;
        self.payload(&ty)
    }

    fn payload(&mut self, ty: &EncodedType) -> Result<CustomAttributeParameter> {
        let value = self.constant(ty.kind)?;
        Ok(match &ty.enum_type {
            Some(enum_type) => CustomAttributeParameter::Enum {
                enum_type: enum_type.clone(),
                value: Box::new(value),
            },
            None => value,
        })
    }

    fn constant(&mut self, kind: Il2CppTypeEnum) -> Result<CustomAttributeParameter> {
        match kind {
            // Boxed value, the actual type follows
            Il2CppTypeEnum::Object => return self.value(),
            Il2CppTypeEnum::SzArray => return self.array(),
            _ => {}
        }

        let parser = &mut self.parser;

        Ok(match kind {
            Il2CppTypeEnum::Boolean => CustomAttributeParameter::Bool(parser.read_le::<u8>()? != 0),
            Il2CppTypeEnum::Char => CustomAttributeParameter::Char(parser.read_le()?),
            Il2CppTypeEnum::I1 => CustomAttributeParameter::I1(parser.read_le()?),
            Il2CppTypeEnum::U1 => CustomAttributeParameter::U1(parser.read_le()?),
            Il2CppTypeEnum::I2 => CustomAttributeParameter::I2(parser.read_le()?),
            Il2CppTypeEnum::U2 => CustomAttributeParameter::U2(parser.read_le()?),
            Il2CppTypeEnum::I4 => CustomAttributeParameter::I4(parser.read_compressed_int()?),
            Il2CppTypeEnum::U4 => CustomAttributeParameter::U4(parser.read_compressed_uint()?),
            Il2CppTypeEnum::I8 => CustomAttributeParameter::I8(parser.read_le()?),
            Il2CppTypeEnum::U8 => CustomAttributeParameter::U8(parser.read_le()?),
            Il2CppTypeEnum::R4 => CustomAttributeParameter::R4(parser.read_le()?),
            Il2CppTypeEnum::R8 => CustomAttributeParameter::R8(parser.read_le()?),
            Il2CppTypeEnum::String => match parser.read_compressed_int()? {
                -1 => CustomAttributeParameter::String(None),
                len => {
                    let len = usize::try_from(len)
                        .map_err(|_| malformed_error!("Invalid attribute string length - {}", len))?;
                    CustomAttributeParameter::String(Some(parser.read_string_utf8_len(len)?))
                }
            },
            Il2CppTypeEnum::Il2CppTypeIndex => {
                let type_index = parser.read_compressed_int()?;
                CustomAttributeParameter::Type(CustomAttributeTypeParameter::new(
                    self.assembly,
                    type_index,
                ))
            }
            other => {
                return Err(malformed_error!("Unsupported attribute value type - {}", other));
            }
        })
    }

    fn array(&mut self) -> Result<CustomAttributeParameter> {
        let len = match self.parser.read_compressed_int()? {
            -1 => return Ok(CustomAttributeParameter::Array(None)),
            len => usize::try_from(len)
                .map_err(|_| malformed_error!("Invalid attribute array length - {}", len))?,
        };

        let element_type = self.encoded_type()?;
        let elements_differ = self.parser.read_le::<u8>()? == ELEMENTS_DIFFER;

        let elements = (0..len)
            .map(|_| {
                if elements_differ {
                    self.value()
                } else {
                    self.payload(&element_type)
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(CustomAttributeParameter::Array(Some(elements)))
    }
}
