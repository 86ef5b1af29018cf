//! Keeps the mapping graph consistent with the loaded documents:
//! resolves deferred field references, prunes stale mappings after a
//! document reload, and backfills lookup table identifiers.

use crate::definition::{LookupTableCatalog, MappingDefinition};
use crate::mapping::{FieldReference, MappedField, Mapping};
use fieldmapper_document::{DocumentId, DocumentSet, FieldKey, NONE_FIELD_PATH};
use std::collections::HashSet;
use tracing::{debug, info};

/// Promote unresolved paths to live field references. `[None]` paths
/// become the placeholder; paths no document can satisfy stay
/// unresolved for the staleness pass to judge.
pub fn resolve_field_references(def: &mut MappingDefinition, docs: &mut DocumentSet) {
    for mapping in def.all_mappings_mut() {
        for pair in &mut mapping.field_mappings {
            resolve_side(&mut pair.source_fields, docs, true);
            resolve_side(&mut pair.target_fields, docs, false);
        }
    }
}

fn resolve_side(fields: &mut [MappedField], docs: &mut DocumentSet, is_source: bool) {
    for mapped_field in fields {
        let path = match &mapped_field.reference {
            FieldReference::Unresolved(path) => path.clone(),
            _ => continue,
        };
        if path == NONE_FIELD_PATH {
            mapped_field.reference = FieldReference::Empty;
            continue;
        }
        for doc in docs.docs_mut(is_source).iter_mut() {
            match doc.get_field(&path) {
                Ok(Some(key)) => {
                    mapped_field.reference = FieldReference::Resolved {
                        doc: doc.id().clone(),
                        field: key,
                    };
                    break;
                }
                Ok(None) => {}
                Err(err) => {
                    debug!(path = %path, error = %err, "Couldn't resolve mapped field");
                }
            }
        }
    }
}

/// Drop every persisted mapping referencing a field path no loaded
/// document provides. `[None]` placeholders never count against a
/// mapping.
pub fn remove_stale_mappings(def: &mut MappingDefinition, docs: &DocumentSet) {
    let source_paths: HashSet<&str> = docs
        .docs(true)
        .iter()
        .flat_map(|doc| doc.field_paths().iter().map(String::as_str))
        .collect();
    let target_paths: HashSet<&str> = docs
        .docs(false)
        .iter()
        .flat_map(|doc| doc.field_paths().iter().map(String::as_str))
        .collect();

    let before = def.mappings.len();
    def.mappings.retain(|mapping| {
        let stale = side_is_stale(mapping, true, &source_paths, docs)
            || side_is_stale(mapping, false, &target_paths, docs);
        if stale {
            info!(mapping = %mapping.id, "Removing stale mapping");
        }
        !stale
    });
    debug!(
        removed = before - def.mappings.len(),
        remaining = def.mappings.len(),
        "Finished removing stale mappings"
    );
}

fn side_is_stale(
    mapping: &Mapping,
    is_source: bool,
    paths: &HashSet<&str>,
    docs: &DocumentSet,
) -> bool {
    for pair in &mapping.field_mappings {
        for mapped_field in pair.mapped_fields(is_source) {
            match &mapped_field.reference {
                FieldReference::Empty => {}
                FieldReference::Unresolved(path) => {
                    if !paths.contains(path.as_str()) {
                        return true;
                    }
                }
                // a reloaded document invalidates keys minted by its
                // previous revision; such references are stale too
                FieldReference::Resolved { doc, field } => {
                    match docs.document(doc).and_then(|doc| doc.try_field(*field)) {
                        Some(live) => {
                            if !paths.contains(live.path.as_str()) {
                                return true;
                            }
                        }
                        None => return true,
                    }
                }
            }
        }
    }
    false
}

/// Backfill source/target identifiers of tables that arrived from a
/// mapping file without them, using the class names of the first
/// mapping that references each table. Then make sure every
/// enumeration pair has a table.
pub fn detect_table_identifiers(def: &mut MappingDefinition, docs: &DocumentSet) {
    let mut updates: Vec<(String, Option<String>, Option<String>)> = Vec::new();
    for name in def.tables.table_names() {
        let table = match def.tables.by_name(&name) {
            Some(table) => table,
            None => continue,
        };
        if table.source_identifier.is_some() && table.target_identifier.is_some() {
            continue;
        }
        let mapping = match def.first_mapping_for_table(&name) {
            Some(mapping) => mapping,
            None => continue,
        };
        let mut source = None;
        let mut target = None;
        for pair in &mapping.field_mappings {
            if pair.transition.lookup_table_name.as_deref() != Some(name.as_str()) {
                continue;
            }
            if source.is_none() {
                source = first_class_name(docs, &pair.resolved_fields(true));
            }
            if target.is_none() {
                target = first_class_name(docs, &pair.resolved_fields(false));
            }
        }
        updates.push((name, source, target));
    }

    for (name, source, target) in updates {
        let mut changed = false;
        if let Some(table) = def.tables.by_name_mut(&name) {
            if table.source_identifier.is_none() {
                if let Some(source) = source {
                    table.source_identifier = Some(source);
                    changed = true;
                }
            }
            if table.target_identifier.is_none() {
                if let Some(target) = target {
                    table.target_identifier = Some(target);
                    changed = true;
                }
            }
        }
        if changed {
            def.tables.reindex(&name);
            if let Some(table) = def.tables.by_name(&name) {
                info!(table = %table, "Detected lookup table identifiers");
            }
        }
    }

    initialize_lookup_tables(def, docs);
}

/// Run [`initialize_mapping_lookup_table`] over every mapping
pub fn initialize_lookup_tables(def: &mut MappingDefinition, docs: &DocumentSet) {
    for mapping in def.mappings.iter_mut() {
        initialize_mapping_lookup_table(mapping, &mut def.tables, docs);
    }
    if let Some(active) = def.active_mapping.as_mut() {
        initialize_mapping_lookup_table(active, &mut def.tables, docs);
    }
}

/// Give every table-less enumeration pair with exactly one resolved
/// field on each side a lookup table keyed by the two class names,
/// reusing an existing table for the same combination.
pub fn initialize_mapping_lookup_table(
    mapping: &mut Mapping,
    tables: &mut LookupTableCatalog,
    docs: &DocumentSet,
) {
    let mapping_id = mapping.id.clone();
    for pair in &mut mapping.field_mappings {
        if !pair.transition.is_enumeration_mode() || pair.transition.lookup_table_name.is_some() {
            continue;
        }
        let sources = pair.resolved_fields(true);
        let targets = pair.resolved_fields(false);
        if sources.len() != 1 || targets.len() != 1 {
            continue;
        }
        let source_class = first_class_name(docs, &sources);
        let target_class = first_class_name(docs, &targets);
        if let (Some(source), Some(target)) = (source_class, target_class) {
            let name = tables.get_or_create(&source, &target);
            debug!(mapping = %mapping_id, table = %name, "Initialized lookup table for mapping");
            pair.transition.lookup_table_name = Some(name);
        }
    }
}

fn first_class_name(docs: &DocumentSet, fields: &[(DocumentId, FieldKey)]) -> Option<String> {
    let (doc_id, key) = fields.first()?;
    docs.document(doc_id)
        .map(|doc| doc.field(*key).class_name.clone())
}
