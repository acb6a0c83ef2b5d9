use thiserror::Error;

use crate::metadata::MetadataVersion;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::Malformed`] - Corrupted metadata or registration structures
/// - [`Error::OutOfBounds`] - A read would leave the underlying buffer
/// - [`Error::NotSupported`] - Unsupported executable format
/// - [`Error::UnsupportedVersion`] - Metadata version outside of the supported range
/// - [`Error::UnsupportedRecord`] - Record kind absent from the active version
/// - [`Error::InvalidSanity`] - The metadata blob does not start with the IL2CPP magic
///
/// ## Resolution Errors
/// - [`Error::AssemblyNotFound`], [`Error::TypeNotFound`], [`Error::MethodNotFound`]
/// - [`Error::WellKnownTypeMissing`] - The core library lacks a required system type
/// - [`Error::GenericOrdinalOutOfRange`] - A generic parameter references a missing argument
///
/// ## Integration Errors
/// - [`Error::ForeignDefinition`] - A raw definition that does not belong to this context
///
/// # Examples
///
/// ```rust,ignore
/// use il2scope::{Error, metadata::GlobalMetadata};
///
/// match GlobalMetadata::from_file("global-metadata.dat", None) {
///     Ok(metadata) => println!("version {}", metadata.version()),
///     Err(Error::InvalidSanity(magic)) => eprintln!("not a metadata file: {magic:08X}"),
///     Err(e) => eprintln!("{e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The input is damaged and could not be parsed.
    ///
    /// Carries the source location where the malformation was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// This file type is not supported.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Error from the executable parser.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// The metadata declares a version this crate has no layout for.
    #[error("Unsupported metadata version - {0}")]
    UnsupportedVersion(MetadataVersion),

    /// A record kind was requested that does not exist in the active metadata version.
    #[error("Record {record} is not part of metadata version {version}")]
    UnsupportedRecord {
        /// Record kind that was requested
        record: &'static str,
        /// The active version
        version: MetadataVersion,
    },

    /// The metadata blob does not start with `0xFAB11BAF`.
    #[error("Invalid metadata sanity - 0x{0:08X}")]
    InvalidSanity(u32),

    /// An assembly could not be found by name.
    #[error("Assembly not found - {0}")]
    AssemblyNotFound(String),

    /// A type could not be resolved.
    #[error("Type not found - {0}")]
    TypeNotFound(String),

    /// A method could not be resolved.
    #[error("Method not found - {0}")]
    MethodNotFound(String),

    /// The core library is missing one of the types every model depends on.
    #[error("Well-known type missing from the core library - {0}")]
    WellKnownTypeMissing(&'static str),

    /// A generic parameter refers to an argument position that was not supplied.
    #[error("Generic parameter ordinal {ordinal} out of range ({count} arguments)")]
    GenericOrdinalOutOfRange {
        /// Position requested by the parameter
        ordinal: usize,
        /// Number of arguments available
        count: usize,
    },

    /// A raw definition was passed that is not part of this application context.
    ///
    /// This signals an integration bug in the caller, not bad input data.
    #[error("Definition does not belong to this context - {0}")]
    ForeignDefinition(&'static str),

    /// Raw code bytes could not be fetched for a method pointer.
    #[error("Failed to fetch code at 0x{address:X} - {reason}")]
    CodeFetch {
        /// Virtual address that was requested
        address: u64,
        /// What went wrong
        reason: String,
    },

    /// A native registration structure could not be located.
    #[error("Registration structure not found - {0}")]
    RegistrationNotFound(&'static str),

    /// A weak reference in the context graph no longer has an owner.
    #[error("Context graph element has been dropped")]
    DroppedReference,

    /// Loader graph / phase ordering error.
    #[error("{0}")]
    GraphError(String),
}
