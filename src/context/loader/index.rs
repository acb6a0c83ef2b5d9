//! Definition index to member context lookups.
use std::sync::Arc;

use crate::{
    context::{
        loader::{set_once, ContextLoader, LoadPhase},
        ApplicationContext,
    },
    Result,
};

/// Indexes every member context by its definition row, so that rows handed out by the
/// metadata can be mapped back to the graph.
pub(crate) struct DefinitionIndexLoader;

/// Place `(row, value)` pairs into a table of `len` rows
fn index_rows<T: Clone>(
    len: usize,
    rows: impl Iterator<Item = (usize, T)>,
    what: &str,
) -> Result<Vec<Option<T>>> {
    let mut table = vec![None; len];
    for (row, value) in rows {
        let slot = table
            .get_mut(row)
            .ok_or_else(|| malformed_error!("{} row {} exceeds the table ({} rows)", what, row, len))?;
        if slot.replace(value).is_some() {
            return Err(malformed_error!("{} row {} is claimed by two types", what, row));
        }
    }
    Ok(table)
}

impl ContextLoader for DefinitionIndexLoader {
    #[tracing::instrument(level = "debug", skip_all)]
    fn load(&self, app: &Arc<ApplicationContext>) -> Result<()> {
        let metadata = app.metadata();
        let types = app.all_types();

        let methods = index_rows(
            metadata.methods.len(),
            types.iter().flat_map(|ty| ty.methods()).filter_map(|method| {
                method.definition_index().map(|index| (index, method.clone()))
            }),
            "Method",
        )?;
        let fields = index_rows(
            metadata.fields.len(),
            types
                .iter()
                .flat_map(|ty| ty.fields())
                .map(|field| (field.definition_index(), field.clone())),
            "Field",
        )?;
        let properties = index_rows(
            metadata.properties.len(),
            types
                .iter()
                .flat_map(|ty| ty.properties())
                .map(|property| (property.definition_index(), property.clone())),
            "Property",
        )?;
        let events = index_rows(
            metadata.events.len(),
            types
                .iter()
                .flat_map(|ty| ty.events())
                .map(|event| (event.definition_index(), event.clone())),
            "Event",
        )?;

        tracing::debug!(
            methods = methods.iter().flatten().count(),
            fields = fields.iter().flatten().count(),
            properties = properties.iter().flatten().count(),
            events = events.iter().flatten().count(),
            "indexed member definitions"
        );

        set_once(&app.methods, methods, "method index")?;
        set_once(&app.fields, fields, "field index")?;
        set_once(&app.properties, properties, "property index")?;
        set_once(&app.events, events, "event index")
    }

    fn phase(&self) -> LoadPhase {
        LoadPhase::DefinitionIndex
    }

    fn dependencies(&self) -> &'static [LoadPhase] {
        &[
            LoadPhase::Methods,
            LoadPhase::Fields,
            LoadPhase::Properties,
            LoadPhase::Events,
        ]
    }
}
