//! # il2scope Prelude
//!
//! The most commonly used types and traits of il2scope, for glob imports.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all il2scope operations
pub use crate::Error;

/// The result type used throughout il2scope
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// The application graph and its load configuration
pub use crate::context::{ApplicationContext, LoadOptions};

/// Binary images and low-level parsing
pub use crate::{BinaryImage, File, FlatImage, Parser};

// ================================================================================================
// Metadata
// ================================================================================================

/// The decoded metadata blob and its layout revision
pub use crate::metadata::{GlobalMetadata, MetadataVersion};

/// Raw definition rows
pub use crate::metadata::tables::{
    AssemblyDefinition, EventDefinition, FieldDefinition, ImageDefinition, MethodDefinition,
    PropertyDefinition, TypeDefinition,
};

/// Definition flags
pub use crate::metadata::{
    FieldAttributes, GenericParameterAttributes, MethodAttributes, ParameterAttributes,
    TypeAttributes,
};

// ================================================================================================
// Native Registration
// ================================================================================================

/// The decoded registration tables
pub use crate::binary::{GenericMethodRef, Il2CppType, Il2CppTypeEnum, Registration};

// ================================================================================================
// Context Graph
// ================================================================================================

/// Assemblies
pub use crate::context::{AssemblyContext, AssemblyContextRc};

/// Type uses
pub use crate::context::{
    GenericParameterScope, SystemTypes, TypeContext, TypeContextRc, TypeContextRef, TypeKind,
};

/// Members
pub use crate::context::{
    EventContext, EventContextRc, FieldContext, FieldContextRc, MethodContext, MethodContextRc,
    MethodOrigin, ParameterContext, ParameterContextRc, PropertyContext, PropertyContextRc,
};

/// Custom attributes
pub use crate::context::{CustomAttribute, CustomAttributeParameter};

/// Native code access
pub use crate::context::{ImageInstructionSet, InstructionSet};
