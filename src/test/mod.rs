//! Synthetic applications for unit- and integration-tests.
//!
//! [`MetadataBuilder`] assembles a `global-metadata.dat` blob for any supported layout
//! revision together with the matching native [`crate::binary::Registration`] and a flat code
//! image, so whole application contexts can be built without a real game binary.
//! [`AttributeBlobWriter`] encodes 29+ custom attribute blobs.

mod blob;
mod builder;

pub use blob::AttributeBlobWriter;
pub use builder::{Corlib, MetadataBuilder, CODE_BASE};
