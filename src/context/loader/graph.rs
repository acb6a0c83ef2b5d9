//! Dependency graph of the context load phases.
//!
//! Each [`ContextLoader`] produces one [`LoadPhase`] and names the phases it consumes. The graph
//! validates that every consumed phase has a producer, rejects cycles, and groups the loaders
//! into levels: a level only depends on earlier levels, so all loaders of one level may run
//! on parallel workers.
//!
//! # Thread Safety
//!
//! - Construction: Single-threaded only
//! - Generated plans: Thread-safe for parallel execution

use std::{
    collections::{HashMap, HashSet},
    fmt::Write,
};

use crate::{
    context::loader::{ContextLoader, LoadPhase},
    Error::GraphError,
    Result,
};

/// A directed graph of load phases.
///
/// # Lifecycle
///
/// 1. Create with `LoaderGraph::new()`
/// 2. Add loaders with `add_loader()`
/// 3. Build and validate with `build_relationships()`
/// 4. Generate execution plan with `topological_levels()`
#[derive(Default)]
pub(crate) struct LoaderGraph<'a> {
    /// Maps a phase to its loader
    loaders: HashMap<LoadPhase, &'a dyn ContextLoader>,
    /// Maps a phase to the phases that consume it (reverse dependencies)
    dependents: HashMap<LoadPhase, HashSet<LoadPhase>>,
    /// Maps a phase to the phases it consumes (forward dependencies)
    dependencies: HashMap<LoadPhase, HashSet<LoadPhase>>,
}

impl<'a> LoaderGraph<'a> {
    /// Creates a new empty loader graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a loader to the graph.
    ///
    /// Dependencies are not resolved until `build_relationships()` is called.
    ///
    /// # Errors
    ///
    /// Returns `GraphError` if another loader already produces the same phase.
    pub fn add_loader(&mut self, loader: &'a dyn ContextLoader) -> Result<()> {
        let phase = loader.phase();
        if self.loaders.insert(phase, loader).is_some() {
            return Err(GraphError(format!("Phase {phase:?} has more than one loader")));
        }

        self.dependencies.entry(phase).or_default();
        self.dependents.entry(phase).or_default();
        Ok(())
    }

    /// Builds dependency relationships after all loaders have been added.
    ///
    /// # Errors
    ///
    /// Returns `GraphError` if a loader depends on a phase without a registered loader, or if
    /// circular dependencies are detected.
    pub fn build_relationships(&mut self) -> Result<()> {
        self.dependencies.values_mut().for_each(HashSet::clear);
        self.dependents.values_mut().for_each(HashSet::clear);

        for (phase, loader) in &self.loaders {
            for dependency in loader.dependencies() {
                if !self.loaders.contains_key(dependency) {
                    return Err(GraphError(format!(
                        "Loader {phase:?} depends on phase {dependency:?}, but no loader for that phase exists"
                    )));
                }

                self.dependencies
                    .get_mut(phase)
                    .ok_or_else(|| {
                        GraphError(format!(
                            "Internal error: phase {phase:?} not found in dependencies map"
                        ))
                    })?
                    .insert(*dependency);

                self.dependents
                    .get_mut(dependency)
                    .ok_or_else(|| {
                        GraphError(format!(
                            "Internal error: phase {dependency:?} not found in dependents map"
                        ))
                    })?
                    .insert(*phase);
            }
        }

        self.check_circular_dependencies()
    }

    /// Checks for circular dependencies using depth-first search with stack tracking.
    fn check_circular_dependencies(&self) -> Result<()> {
        let mut visited = HashSet::new();
        let mut stack = HashSet::new();

        for phase in self.loaders.keys() {
            if !visited.contains(phase) {
                self.detect_cycle(*phase, &mut visited, &mut stack)?;
            }
        }

        Ok(())
    }

    fn detect_cycle(
        &self,
        phase: LoadPhase,
        visited: &mut HashSet<LoadPhase>,
        stack: &mut HashSet<LoadPhase>,
    ) -> Result<()> {
        visited.insert(phase);
        stack.insert(phase);

        if let Some(deps) = self.dependencies.get(&phase) {
            for &dep in deps {
                if !visited.contains(&dep) {
                    self.detect_cycle(dep, visited, stack)?;
                } else if stack.contains(&dep) {
                    return Err(GraphError(format!(
                        "Circular dependency detected involving phase {dep:?}"
                    )));
                }
            }
        }

        stack.remove(&phase);
        Ok(())
    }

    /// Returns loaders grouped by dependency level (topological sort).
    ///
    /// Level 0 contains independent loaders; level N contains loaders depending only on
    /// loaders from levels 0 through N-1. Loaders within a level are ordered by phase, so the
    /// plan is the same on every run.
    ///
    /// # Errors
    ///
    /// Returns `GraphError` if circular dependencies prevent topological ordering.
    pub fn topological_levels(&self) -> Result<Vec<Vec<&'a dyn ContextLoader>>> {
        let mut levels = Vec::new();
        let mut unscheduled = self.loaders.keys().copied().collect::<HashSet<_>>();
        let mut satisfied = HashSet::new();

        while !unscheduled.is_empty() {
            let mut ready: Vec<LoadPhase> = unscheduled
                .iter()
                .filter(|phase| {
                    self.dependencies
                        .get(phase)
                        .map_or(true, |deps| deps.iter().all(|dep| satisfied.contains(dep)))
                })
                .copied()
                .collect();

            if ready.is_empty() {
                return Err(GraphError(
                    "Unable to resolve dependency order, possible circular dependency".to_string(),
                ));
            }
            ready.sort_unstable();

            let mut level = Vec::with_capacity(ready.len());
            for phase in ready {
                if let Some(loader) = self.loaders.get(&phase) {
                    level.push(*loader);
                }
                unscheduled.remove(&phase);
                satisfied.insert(phase);
            }
            levels.push(level);
        }

        Ok(levels)
    }

    /// Returns the execution plan as a formatted string for debugging.
    ///
    /// # Errors
    ///
    /// Returns `GraphError` if the graph cannot be ordered.
    pub fn dump_execution_plan(&self) -> Result<String> {
        let mut result = String::new();

        for (index, level) in self.topological_levels()?.iter().enumerate() {
            let _ = writeln!(result, "Level {index}: [");
            for loader in level {
                let phase = loader.phase();
                let mut deps: Vec<String> = self
                    .dependencies
                    .get(&phase)
                    .map(|d| d.iter().map(|p| format!("{p:?}")).collect())
                    .unwrap_or_default();
                deps.sort();
                let deps = if deps.is_empty() {
                    "None".to_string()
                } else {
                    deps.join(", ")
                };

                let _ = writeln!(result, "  {phase:?} (depends on: {deps})");
            }
            let _ = writeln!(result, "]");
        }

        Ok(result)
    }
}
