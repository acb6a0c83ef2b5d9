//! Well-known types of the core library.
use std::sync::Arc;

use crate::{
    context::{
        loader::{set_once, ContextLoader, LoadPhase},
        system::SystemTypes,
        ApplicationContext,
    },
    Error, Result,
};

/// Resolves [`SystemTypes`] from the configured core assembly.
pub(crate) struct SystemTypesLoader;

impl ContextLoader for SystemTypesLoader {
    #[tracing::instrument(level = "debug", skip_all)]
    fn load(&self, app: &Arc<ApplicationContext>) -> Result<()> {
        let name = &app.options().core_assembly;
        let core = app
            .get_assembly_by_name(name)
            .ok_or_else(|| Error::AssemblyNotFound(name.clone()))?;

        let system = SystemTypes::resolve(&core, app.options().require_unmanaged_callers_only)?;
        set_once(&app.system_types, system, "system types")
    }

    fn phase(&self) -> LoadPhase {
        LoadPhase::SystemTypes
    }

    fn dependencies(&self) -> &'static [LoadPhase] {
        &[LoadPhase::Nesting]
    }
}
