//! The application analysis context.
//!
//! An [`ApplicationContext`] turns the flat metadata tables and the native registration into
//! one cross-referenced graph: assemblies own their defined types, types own their members,
//! and every type use that is not a plain definition (generic instances, arrays, pointers,
//! by-reference types) is synthesized once and shared. Concrete generic methods are built from
//! the registration method specs, and every method with generated code is indexed by its
//! native address.
//!
//! # Ownership
//!
//! Owning edges point downwards (application to assemblies to types to members). Edges that
//! point sideways or upwards are [`TypeContextRef`]s or weak back-references, so that cyclic
//! type relationships do not keep the graph alive. Accessors that follow a back-reference
//! return [`crate::Error::DroppedReference`] once the application has been dropped.
//!
//! # Key Components
//!
//! - [`ApplicationContext`] - Root of the graph and its indices
//! - [`AssemblyContext`] - One assembly with its types and custom attributes
//! - [`TypeContext`] - One type use, defined or synthesized
//! - [`MethodContext`], [`FieldContext`], [`PropertyContext`], [`EventContext`] - Members
//! - [`SystemTypes`] - The well-known types of the core library
//! - [`CustomAttribute`] - Decoded attribute blobs (29+)
//! - [`LoadOptions`] - What to build on top of the structural graph

mod application;
mod assembly;
mod customattributes;
mod extra;
mod isa;
mod loader;
mod members;
mod options;
mod system;
mod typesystem;

pub use application::ApplicationContext;
pub use assembly::{AssemblyContext, AssemblyContextRc};
pub use customattributes::{
    CustomAttribute, CustomAttributeField, CustomAttributeParameter, CustomAttributeProperty,
    CustomAttributeTypeParameter,
};
pub use extra::ExtraData;
pub use isa::{ImageInstructionSet, InstructionSet};
pub use members::{
    ConcreteGenericMethod, EventContext, EventContextRc, FieldContext, FieldContextRc,
    MethodContext, MethodContextRc, MethodOrigin, ParameterContext, ParameterContextRc,
    PropertyContext, PropertyContextRc,
};
pub use options::LoadOptions;
pub use system::SystemTypes;
pub use typesystem::{
    DefinedType, GenericParameterContext, GenericParameterScope, TypeContext, TypeContextRc,
    TypeContextRef, TypeKind,
};
