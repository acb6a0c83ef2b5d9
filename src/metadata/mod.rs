//! IL2CPP global metadata.
//!
//! This module decodes `global-metadata.dat`: the header, the string and blob heaps, and the
//! raw definition tables (assemblies, images, types, methods, fields, properties, events,
//! parameters, generic containers and parameters, custom attribute ranges).
//!
//! # Versioning
//!
//! Record layouts differ field by field between metadata revisions. Instead of one struct per
//! revision, each record declares its fields once together with the [`VersionRange`]s in which
//! they exist, and a [`MetadataReader`] created for one [`MetadataVersion`] skips any field
//! outside of those ranges. The version is carried by the reader, never stored globally.
//!
//! # Key Components
//!
//! - [`GlobalMetadata`] - All tables and heaps of one blob
//! - [`MetadataReader`] / [`Decode`] - Version-aware record decoding
//! - [`tables`] - The record definitions and [`tables::MetadataTable`]

mod flags;
mod global;
mod header;
mod reader;
mod version;

pub mod tables;

pub use flags::{
    FieldAttributes, GenericParameterAttributes, MethodAttributes, ParameterAttributes,
    TypeAttributes, MEMBER_ACCESS_MASK, TYPE_VISIBILITY_MASK,
};
pub use global::GlobalMetadata;
pub use header::{MetadataHeader, METADATA_SANITY};
#[cfg(any(test, feature = "fixtures"))]
pub use reader::Encode;
pub use reader::{Decode, FieldSpec, MetadataReader, NativePtr};
pub use version::{MetadataVersion, VersionRange};
