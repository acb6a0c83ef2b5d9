//! Context Loader Module
//!
//! Builds the context graph of an [`ApplicationContext`] in dependency-ordered phases.
//! Every phase is one [`ContextLoader`]; the loaders declare the phases they consume, the
//! [`graph`] orders them into levels, and the loaders of one level run on `rayon` workers.
//! Within a loader, per-assembly or per-type work is parallel as well.
//!
//! Every phase writes its results exactly once (`OnceLock` fields, append-only `boxcar`
//! lists, or the `DashMap`/`SkipMap` indices) and only reads results of earlier levels.
//!
//! # Phases
//! 1. `Assemblies` - assembly contexts and the name index
//! 2. `Types` - one defined type per type definition
//! 3. `GenericParameters`, `Nesting` - generic parameter contexts; declaring/nested types and full names
//! 4. `SystemTypes`, `Hierarchy` - well-known types; base types, interfaces and constraints
//! 5. `Methods`, `Fields` - member contexts with resolved signatures
//! 6. `Properties`, `Events` - accessors wired to their methods
//! 7. `DefinitionIndex` - definition to context lookups
//! 8. `GenericMethods` - concrete generic method contexts
//! 9. `AddressIndex` - native address to methods

mod address;
mod assembly;
mod event;
mod field;
mod genericmethod;
mod genericparam;
mod graph;
mod hierarchy;
mod index;
mod method;
mod nesting;
mod property;
mod system;
mod typedef;

use std::sync::{Arc, OnceLock};

use rayon::prelude::*;

use crate::{context::ApplicationContext, Error::GraphError, Result};

/// A load phase; every phase is produced by exactly one loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum LoadPhase {
    Assemblies,
    Types,
    GenericParameters,
    Nesting,
    SystemTypes,
    Hierarchy,
    Methods,
    Fields,
    Properties,
    Events,
    DefinitionIndex,
    GenericMethods,
    AddressIndex,
}

static LOADERS: [&'static dyn ContextLoader; 13] = [
    &address::AddressIndexLoader,
    &assembly::AssemblyLoader,
    &event::EventLoader,
    &field::FieldLoader,
    &genericmethod::GenericMethodLoader,
    &genericparam::GenericParameterLoader,
    &hierarchy::HierarchyLoader,
    &index::DefinitionIndexLoader,
    &method::MethodLoader,
    &nesting::NestingLoader,
    &property::PropertyLoader,
    &system::SystemTypesLoader,
    &typedef::TypeDefLoader,
];

/// One load phase of the context graph.
pub(crate) trait ContextLoader: Send + Sync {
    /// Run this phase against a partially built application context.
    ///
    /// # Errors
    /// Returns an error if the input is malformed; the whole load is abandoned.
    fn load(&self, app: &Arc<ApplicationContext>) -> Result<()>;

    /// The phase this loader produces
    fn phase(&self) -> LoadPhase;

    /// Phases that must be complete before this loader runs
    fn dependencies(&self) -> &'static [LoadPhase];
}

fn build_dependency_graph(
    loaders: &[&'static dyn ContextLoader],
) -> Result<graph::LoaderGraph<'static>> {
    let mut graph = graph::LoaderGraph::new();

    for loader in loaders {
        graph.add_loader(*loader)?;
    }

    graph.build_relationships()?;
    Ok(graph)
}

/// Execute all loaders level by level.
///
/// Every loader of a level runs to completion before its result is inspected, and results
/// are checked in phase order, so the reported error does not depend on worker scheduling.
///
/// # Errors
/// Returns the first error in phase order of the first failing level.
pub(crate) fn execute_loaders_in_parallel(app: &Arc<ApplicationContext>) -> Result<()> {
    let graph = build_dependency_graph(&LOADERS)?;
    let levels = graph.topological_levels()?;

    for level in levels {
        let results: Vec<Result<()>> = level.par_iter().map(|loader| loader.load(app)).collect();

        for result in results {
            result?;
        }
    }

    Ok(())
}

/// Store the result of a phase
fn set_once<T>(cell: &OnceLock<T>, value: T, what: &str) -> Result<()> {
    cell.set(value)
        .map_err(|_| GraphError(format!("{what} was loaded twice")))
}

/// `list[start..start + count]` of an index list referenced by a definition row
pub(crate) fn index_slice(list: &[i32], start: i32, count: usize) -> Result<&[i32]> {
    if count == 0 {
        return Ok(&[]);
    }

    usize::try_from(start)
        .ok()
        .and_then(|start| list.get(start..start.checked_add(count)?))
        .ok_or_else(|| {
            malformed_error!(
                "Index list range {}+{} exceeds {} entries",
                start,
                count,
                list.len()
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_orders_every_phase() {
        let graph = build_dependency_graph(&LOADERS).unwrap();
        let levels = graph.topological_levels().unwrap();

        let position = |phase: LoadPhase| {
            levels
                .iter()
                .position(|level| level.iter().any(|loader| loader.phase() == phase))
                .unwrap()
        };

        assert_eq!(levels.iter().map(Vec::len).sum::<usize>(), LOADERS.len());
        assert!(position(LoadPhase::Assemblies) < position(LoadPhase::Types));
        assert!(position(LoadPhase::Hierarchy) < position(LoadPhase::Methods));
        assert!(position(LoadPhase::Methods) < position(LoadPhase::Properties));
        assert!(position(LoadPhase::DefinitionIndex) < position(LoadPhase::GenericMethods));
        assert!(position(LoadPhase::SystemTypes) < position(LoadPhase::GenericMethods));
        assert_eq!(position(LoadPhase::AddressIndex), levels.len() - 1);
    }

    #[test]
    fn test_index_slice() {
        let list = [10, 11, 12, 13];
        assert_eq!(index_slice(&list, 1, 2).unwrap(), &[11, 12]);
        assert!(index_slice(&list, -1, 0).unwrap().is_empty());
        assert!(index_slice(&list, 3, 2).is_err());
        assert!(index_slice(&list, -1, 1).is_err());
    }
}
