//! The mapping definition: every persisted mapping, the active mapping
//! being edited, and the lookup table catalog

use crate::lookup_table::LookupTable;
use crate::mapping::Mapping;
use fieldmapper_document::{DocumentId, FieldKey};
use std::collections::HashMap;
use tracing::debug;

/// Lookup tables keyed both by name and by (source class, target class)
#[derive(Debug, Default)]
pub struct LookupTableCatalog {
    tables_by_name: HashMap<String, LookupTable>,
    names_by_source_target: HashMap<String, String>,
    next_table: u32,
}

impl LookupTableCatalog {
    pub fn add(&mut self, table: LookupTable) {
        if let Some(key) = table.source_target_key() {
            self.names_by_source_target.insert(key, table.name.clone());
        }
        self.tables_by_name.insert(table.name.clone(), table);
    }

    pub fn by_name(&self, name: &str) -> Option<&LookupTable> {
        self.tables_by_name.get(name)
    }

    pub fn by_name_mut(&mut self, name: &str) -> Option<&mut LookupTable> {
        self.tables_by_name.get_mut(name)
    }

    pub fn by_source_target(&self, source: &str, target: &str) -> Option<&LookupTable> {
        let key = format!("{}:{}", source, target);
        self.names_by_source_target
            .get(&key)
            .and_then(|name| self.tables_by_name.get(name))
    }

    /// Existing table for the class combination, or a freshly named one
    pub fn get_or_create(&mut self, source: &str, target: &str) -> String {
        if let Some(table) = self.by_source_target(source, target) {
            return table.name.clone();
        }
        self.next_table += 1;
        let name = format!("table.{}", self.next_table);
        debug!(table = %name, source, target, "Creating lookup table");
        let mut table = LookupTable::new(name.clone());
        table.source_identifier = Some(source.to_string());
        table.target_identifier = Some(target.to_string());
        self.add(table);
        name
    }

    /// Re-register a table under its source/target key after its
    /// identifiers were backfilled
    pub fn reindex(&mut self, name: &str) {
        if let Some(key) = self.tables_by_name.get(name).and_then(|t| t.source_target_key()) {
            self.names_by_source_target.insert(key, name.to_string());
        }
    }

    /// Tables in name order
    pub fn tables(&self) -> Vec<&LookupTable> {
        let mut tables: Vec<&LookupTable> = self.tables_by_name.values().collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        tables
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables().iter().map(|t| t.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables_by_name.is_empty()
    }
}

/// The whole mapping graph for one session.
///
/// The active mapping is owned separately from the persisted list;
/// saving clones it back into the list, replacing any previous copy
/// with the same id.
#[derive(Debug, Default)]
pub struct MappingDefinition {
    pub name: String,
    pub mappings: Vec<Mapping>,
    pub active_mapping: Option<Mapping>,
    pub tables: LookupTableCatalog,
    next_mapping: u32,
}

impl MappingDefinition {
    pub fn new() -> Self {
        Self {
            name: "UI.mappings".to_string(),
            ..Self::default()
        }
    }

    pub fn allocate_mapping_id(&mut self) -> String {
        self.next_mapping += 1;
        format!("mapping.{}", self.next_mapping)
    }

    /// Persisted mappings plus the active one, active last. The saved
    /// copy of the active mapping, if any, appears in both positions.
    pub fn all_mappings(&self) -> impl Iterator<Item = &Mapping> {
        self.mappings.iter().chain(self.active_mapping.iter())
    }

    pub fn all_mappings_mut(&mut self) -> impl Iterator<Item = &mut Mapping> {
        self.mappings.iter_mut().chain(self.active_mapping.iter_mut())
    }

    pub fn mapping_by_id(&self, id: &str) -> Option<&Mapping> {
        self.mappings.iter().find(|m| m.id == id)
    }

    /// Ids of persisted mappings that reference the field on the given side
    pub fn find_mappings_for_field(
        &self,
        doc: &DocumentId,
        field: FieldKey,
        is_source: bool,
    ) -> Vec<String> {
        self.mappings
            .iter()
            .filter(|mapping| mapping.is_field_mapped(doc, field, is_source))
            .map(|mapping| mapping.id.clone())
            .collect()
    }

    /// Remove a persisted mapping by id; true if one was removed
    pub fn remove_mapping(&mut self, id: &str) -> bool {
        let before = self.mappings.len();
        self.mappings.retain(|mapping| mapping.id != id);
        self.mappings.len() != before
    }

    pub fn first_mapping_for_table(&self, table_name: &str) -> Option<&Mapping> {
        self.all_mappings()
            .find(|mapping| mapping.references_lookup_table(table_name))
    }
}
