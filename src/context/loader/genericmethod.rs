//! Concrete generic method construction.
use std::sync::{atomic::Ordering, Arc};

use rayon::prelude::*;

use crate::{
    binary::GenericMethodRef,
    context::{
        loader::{ContextLoader, LoadPhase},
        members::MethodContext,
        ApplicationContext,
    },
    Error, Result,
};

/// Builds one method context for every generic method instantiation in the registration.
///
/// An instantiation whose code cannot be fetched is skipped and counted; any other failure
/// aborts the load.
pub(crate) struct GenericMethodLoader;

impl ContextLoader for GenericMethodLoader {
    #[tracing::instrument(level = "debug", skip_all)]
    fn load(&self, app: &Arc<ApplicationContext>) -> Result<()> {
        if !app.options().build_generic_methods {
            return Ok(());
        }

        let references = GenericMethodRef::collect(app.registration(), app.metadata())?;

        references.par_iter().try_for_each(|reference| {
            match MethodContext::concrete_generic(app, reference) {
                Ok(method) => {
                    let Some(concrete) = method.concrete() else {
                        return Ok(());
                    };
                    let key = (
                        concrete.base.definition_index().unwrap_or_default(),
                        concrete.type_args.iter().map(|arg| arg.id()).collect(),
                        concrete.method_args.iter().map(|arg| arg.id()).collect(),
                    );
                    app.concrete_generic_methods.entry(key).or_insert(method);
                    Ok(())
                }
                Err(Error::CodeFetch { address, reason }) => {
                    tracing::warn!(
                        spec = reference.spec_index,
                        method = %reference.base_method_name,
                        address = format_args!("0x{address:X}"),
                        %reason,
                        "skipping concrete generic method without code"
                    );
                    app.code_fetch_failures.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }
                Err(error) => Err(error),
            }
        })?;

        tracing::debug!(
            references = references.len(),
            built = app.concrete_generic_methods.len(),
            skipped = app.code_fetch_failures(),
            "built concrete generic methods"
        );
        Ok(())
    }

    fn phase(&self) -> LoadPhase {
        LoadPhase::GenericMethods
    }

    fn dependencies(&self) -> &'static [LoadPhase] {
        &[LoadPhase::DefinitionIndex, LoadPhase::SystemTypes]
    }
}
