use std::sync::Arc;

use crate::{
    context::{
        extra::ExtraData,
        typesystem::{TypeContextRc, TypeContextRef},
    },
    metadata::{tables::ParameterDefinition, GlobalMetadata, ParameterAttributes},
    Result,
};

/// Reference counted [`ParameterContext`]
pub type ParameterContextRc = Arc<ParameterContext>;

enum ParameterOrigin {
    Defined { metadata: Arc<GlobalMetadata>, index: usize },
    Injected,
}

/// A method parameter.
///
/// Parameters of concrete generic methods whose type changed under instantiation are
/// *injected*: they carry the instantiated type but no parameter definition.
pub struct ParameterContext {
    origin: ParameterOrigin,
    /// Declared name
    pub name: String,
    /// Zero-based position in the signature
    pub position: usize,
    /// Attribute flags of the parameter type use
    pub flags: ParameterAttributes,
    parameter_type: TypeContextRef,
    /// Annotation slot for later processing stages
    pub extra: ExtraData,
}

impl ParameterContext {
    pub(crate) fn defined(
        metadata: Arc<GlobalMetadata>,
        index: usize,
        name: String,
        position: usize,
        flags: ParameterAttributes,
        parameter_type: &TypeContextRc,
    ) -> Self {
        ParameterContext {
            origin: ParameterOrigin::Defined { metadata, index },
            name,
            position,
            flags,
            parameter_type: TypeContextRef::new(parameter_type),
            extra: ExtraData::new(),
        }
    }

    /// A copy of `original` with a substituted type
    pub(crate) fn injected(original: &ParameterContext, parameter_type: &TypeContextRc) -> Self {
        ParameterContext {
            origin: ParameterOrigin::Injected,
            name: original.name.clone(),
            position: original.position,
            flags: original.flags,
            parameter_type: TypeContextRef::new(parameter_type),
            extra: ExtraData::new(),
        }
    }

    /// The parameter definition row, `None` for injected parameters
    #[must_use]
    pub fn definition(&self) -> Option<&ParameterDefinition> {
        match &self.origin {
            ParameterOrigin::Defined { metadata, index } => metadata.parameters.as_slice().get(*index),
            ParameterOrigin::Injected => None,
        }
    }

    /// True if this parameter was synthesized for a generic instantiation
    #[must_use]
    pub fn is_injected(&self) -> bool {
        matches!(self.origin, ParameterOrigin::Injected)
    }

    /// The parameter type
    ///
    /// # Errors
    /// Returns [`crate::Error::DroppedReference`] if the application context is gone.
    pub fn parameter_type(&self) -> Result<TypeContextRc> {
        self.parameter_type.get()
    }
}
