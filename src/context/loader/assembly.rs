//! Assembly contexts and the name index.
use std::sync::Arc;

use rayon::prelude::*;

use crate::{
    context::{
        assembly::AssemblyContext,
        loader::{set_once, ContextLoader, LoadPhase},
        ApplicationContext,
    },
    Result,
};

/// Creates one [`AssemblyContext`] per assembly definition.
pub(crate) struct AssemblyLoader;

impl ContextLoader for AssemblyLoader {
    #[tracing::instrument(level = "debug", skip_all)]
    fn load(&self, app: &Arc<ApplicationContext>) -> Result<()> {
        let metadata = app.metadata();

        let assemblies = (0..metadata.assemblies.len())
            .into_par_iter()
            .map(|index| {
                let definition = &metadata.assemblies[index];
                let name = definition.aname.name(metadata)?.to_string();
                let image_name = metadata
                    .images
                    .get(definition.image_index)
                    .ok_or_else(|| malformed_error!("Assembly {} has no image", name))?
                    .name(metadata)?
                    .to_string();

                Ok(Arc::new(AssemblyContext::new(app, index, name, image_name)?))
            })
            .collect::<Result<Vec<_>>>()?;

        for assembly in &assemblies {
            if app
                .assemblies_by_name
                .insert(assembly.name.clone(), assembly.clone())
                .is_some()
            {
                tracing::warn!(name = %assembly.name, "duplicate assembly name, keeping the last");
            }
        }

        tracing::debug!(assemblies = assemblies.len(), "loaded assemblies");
        set_once(&app.assemblies, assemblies, "assemblies")
    }

    fn phase(&self) -> LoadPhase {
        LoadPhase::Assemblies
    }

    fn dependencies(&self) -> &'static [LoadPhase] {
        &[]
    }
}
