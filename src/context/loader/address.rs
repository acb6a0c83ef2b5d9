//! Native address to method lookups.
use std::sync::Arc;

use crate::{
    context::{
        loader::{ContextLoader, LoadPhase},
        members::MethodContextRc,
        ApplicationContext,
    },
    Result,
};

/// Indexes every method with generated code by its entry point.
///
/// Defined methods are added in definition order, concrete generic methods after them in
/// base method order, so the per-address lists do not depend on worker scheduling.
pub(crate) struct AddressIndexLoader;

impl ContextLoader for AddressIndexLoader {
    #[tracing::instrument(level = "debug", skip_all)]
    fn load(&self, app: &Arc<ApplicationContext>) -> Result<()> {
        if !app.options().build_address_index {
            return Ok(());
        }

        let mut concrete = app.concrete_generic_methods();
        concrete.sort_by_key(|method| {
            method.concrete().map(|generic| {
                (
                    generic.base.definition_index().unwrap_or_default(),
                    generic.type_args.iter().map(|arg| arg.id()).collect::<Vec<_>>(),
                    generic.method_args.iter().map(|arg| arg.id()).collect::<Vec<_>>(),
                )
            })
        });

        let defined = app.methods.get().into_iter().flatten().flatten();
        let mut indexed = 0usize;
        for method in defined.chain(concrete.iter()) {
            let address = method.underlying_pointer();
            if address == 0 {
                continue;
            }
            insert(app, address, method);
            indexed += 1;
        }

        tracing::debug!(
            methods = indexed,
            addresses = app.methods_by_address.len(),
            "indexed method addresses"
        );
        Ok(())
    }

    fn phase(&self) -> LoadPhase {
        LoadPhase::AddressIndex
    }

    fn dependencies(&self) -> &'static [LoadPhase] {
        &[LoadPhase::GenericMethods]
    }
}

fn insert(app: &ApplicationContext, address: u64, method: &MethodContextRc) {
    app.methods_by_address
        .get_or_insert_with(address, boxcar::Vec::new)
        .value()
        .push(method.clone());
}
