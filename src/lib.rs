// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

//! # il2scope
//!
//! A cross-referenced analysis model of IL2CPP applications.
//!
//! Unity's IL2CPP backend compiles managed assemblies to native code and leaves two artifacts
//! behind: the game binary, whose registration structures describe every type use and every
//! generated method, and `global-metadata.dat`, which holds the type definitions, members and
//! names. `il2scope` decodes both for any supported metadata revision (23 through 31,
//! including sub-revisions such as 24.2 and 29.1) and builds one graph over them.
//!
//! # Architecture
//!
//! - [`metadata`] - Version-aware decoding of the metadata header, heaps and tables
//! - [`binary`] - The native registration: `Il2CppType` table, generic instances, code pointers
//! - [`file`] - Byte access to PE, ELF and Mach-O images or raw memory dumps
//! - [`context`] - The application graph built from both halves
//!
//! # Example
//!
//! ```rust,no_run
//! use il2scope::prelude::*;
//!
//! let app = ApplicationContext::from_files(
//!     "GameAssembly.dll",
//!     "global-metadata.dat",
//!     LoadOptions::default(),
//! )?;
//!
//! let system = app.system_types()?;
//! println!("System.Object is type {}", system.object.full_name());
//!
//! for address in app.method_addresses().iter().take(10) {
//!     for method in app.methods_by_address(*address) {
//!         println!("0x{address:X} {}", method.name());
//!     }
//! }
//! # Ok::<(), il2scope::Error>(())
//! ```

#![doc(html_no_source)]
#![warn(missing_docs)]
#![allow(dead_code)]
#![allow(clippy::too_many_arguments)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Synthetic applications, shared by unit-tests, integration-tests and benchmarks
#[cfg(any(test, feature = "fixtures"))]
#[doc(hidden)]
pub mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use il2scope::prelude::*;
///
/// let metadata = GlobalMetadata::from_file("global-metadata.dat", None)?;
/// println!("{} type definitions", metadata.type_definitions.len());
/// # Ok::<(), il2scope::Error>(())
/// ```
pub mod prelude;

pub mod binary;
pub mod context;
pub mod file;
pub mod metadata;

/// `il2scope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `il2scope` Error type
///
/// # Examples
///
/// ```rust,no_run
/// use il2scope::{metadata::GlobalMetadata, Error};
///
/// match GlobalMetadata::from_file("global-metadata.dat", None) {
///     Ok(metadata) => println!("version {}", metadata.version()),
///     Err(Error::InvalidSanity(sanity)) => println!("not metadata: 0x{sanity:08X}"),
///     Err(Error::UnsupportedVersion(version)) => println!("unsupported revision {version}"),
///     Err(e) => println!("Error: {e}"),
/// }
/// ```
pub use error::Error;

/// Main entry point for working with an IL2CPP application.
///
/// See [`context::ApplicationContext`] for the graph and its indices.
pub use context::{ApplicationContext, LoadOptions};

/// Binary images and the low-level [`Parser`] used for metadata and registration decoding.
///
/// # Example
///
/// ```rust,no_run
/// use il2scope::Parser;
///
/// let data = [0x81, 0x02];
/// let mut parser = Parser::new(&data);
/// assert_eq!(parser.read_compressed_uint()?, 0x102);
/// # Ok::<(), il2scope::Error>(())
/// ```
pub use file::{parser::Parser, BinaryImage, File, FlatImage};
