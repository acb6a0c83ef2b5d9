//! Member contexts: methods, parameters, fields, properties and events.
//!
//! Every member is bound to exactly one declaring type through a weak reference; the declaring
//! defined type owns its members. Members backed by a metadata row expose it through
//! `definition()`. Concrete generic methods have no row and point at their base method
//! instead, see [`MethodContext::concrete_generic`].

mod event;
mod field;
mod generic;
mod method;
mod parameter;
mod property;

pub(crate) use event::EventAccessors;
pub use event::{EventContext, EventContextRc};
pub use field::{FieldContext, FieldContextRc};
pub use method::{ConcreteGenericMethod, MethodContext, MethodContextRc, MethodOrigin};
pub use parameter::{ParameterContext, ParameterContextRc};
pub use property::{PropertyContext, PropertyContextRc};
