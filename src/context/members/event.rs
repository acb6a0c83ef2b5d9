use std::sync::{Arc, Weak};

use crate::{
    context::{
        extra::ExtraData,
        members::{MethodContext, MethodContextRc},
        typesystem::{TypeContextRc, TypeContextRef},
    },
    metadata::{tables::EventDefinition, GlobalMetadata},
    Result,
};

/// Reference counted [`EventContext`]
pub type EventContextRc = Arc<EventContext>;

/// An event bound to its declaring type.
pub struct EventContext {
    metadata: Arc<GlobalMetadata>,
    index: usize,
    declaring_type: TypeContextRef,
    event_type: TypeContextRef,
    adder: Option<Weak<MethodContext>>,
    remover: Option<Weak<MethodContext>>,
    invoker: Option<Weak<MethodContext>>,
    /// Declared name
    pub name: String,
    /// Annotation slot for later processing stages
    pub extra: ExtraData,
}

/// The accessor methods of an event, any of which may be absent
pub(crate) struct EventAccessors<'a> {
    pub add: Option<&'a MethodContextRc>,
    pub remove: Option<&'a MethodContextRc>,
    pub raise: Option<&'a MethodContextRc>,
}

impl EventContext {
    pub(crate) fn new(
        metadata: Arc<GlobalMetadata>,
        index: usize,
        name: String,
        declaring_type: &TypeContextRc,
        event_type: &TypeContextRc,
        accessors: EventAccessors<'_>,
    ) -> Self {
        EventContext {
            metadata,
            index,
            declaring_type: TypeContextRef::new(declaring_type),
            event_type: TypeContextRef::new(event_type),
            adder: accessors.add.map(Arc::downgrade),
            remover: accessors.remove.map(Arc::downgrade),
            invoker: accessors.raise.map(Arc::downgrade),
            name,
            extra: ExtraData::new(),
        }
    }

    /// The event definition row
    #[must_use]
    pub fn definition(&self) -> &EventDefinition {
        &self.metadata.events[self.index]
    }

    /// Row index in the event table
    #[must_use]
    pub fn definition_index(&self) -> usize {
        self.index
    }

    /// The declaring type
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeContextRc> {
        self.declaring_type.upgrade()
    }

    /// The delegate type of the event
    ///
    /// # Errors
    /// Returns [`crate::Error::DroppedReference`] if the application context is gone.
    pub fn event_type(&self) -> Result<TypeContextRc> {
        self.event_type.get()
    }

    /// The `add_` accessor
    #[must_use]
    pub fn adder(&self) -> Option<MethodContextRc> {
        self.adder.as_ref()?.upgrade()
    }

    /// The `remove_` accessor
    #[must_use]
    pub fn remover(&self) -> Option<MethodContextRc> {
        self.remover.as_ref()?.upgrade()
    }

    /// The `raise_` accessor, rarely emitted by C# compilers
    #[must_use]
    pub fn invoker(&self) -> Option<MethodContextRc> {
        self.invoker.as_ref()?.upgrade()
    }

    /// Metadata token
    #[must_use]
    pub fn token(&self) -> u32 {
        self.definition().token
    }
}

impl std::fmt::Debug for EventContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventContext")
            .field("name", &self.name)
            .field("index", &self.index)
            .finish()
    }
}
