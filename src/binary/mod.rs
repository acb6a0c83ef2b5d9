//! Native half of an IL2CPP application.
//!
//! The generated binary carries two registration structures next to the compiled code:
//! `Il2CppCodeRegistration` (method, generic method and invoker pointers) and
//! `Il2CppMetadataRegistration` (the `Il2CppType` table, generic classes and instantiations,
//! method specs). [`Registration`] decodes both for one metadata version and normalises all
//! nested pointers into table indices, so nothing downstream needs to chase addresses again.
//!
//! # Key Components
//!
//! - [`Registration`] - Decoded registration tables and code pointer lookups
//! - [`Il2CppType`] / [`Il2CppTypeEnum`] - Type usages as referenced by metadata indices
//! - [`GenericMethodRef`] - One concrete generic method instantiation

mod generics;
mod registration;
mod types;

pub use generics::GenericMethodRef;
pub use registration::{
    CodeGenModule, CodeGenModuleHeader, CodeRegistrationHeader, GenericClass, GenericClassBase,
    GenericInst, GenericMethodFunctions, MetadataRegistrationHeader, MethodSpec, Registration,
    CODE_REGISTRATION_SYMBOL, METADATA_REGISTRATION_SYMBOL,
};
pub use types::{Il2CppType, Il2CppTypeEnum, TypeData};
