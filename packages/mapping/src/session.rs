//! # Mapping Session
//!
//! The single entry point for interactive edits to the mapping graph.
//! Every mutation funnels through the session so the documents' derived
//! state is refreshed exactly once per change.

use crate::definition::MappingDefinition;
use crate::document_state::refresh_documents;
use crate::error::{MappingError, MappingResult};
use crate::mapping::{FieldMappingPair, FieldReference, Mapping};
use crate::reconcile::initialize_mapping_lookup_table;
use crate::transition::TransitionMode;
use fieldmapper_document::{DocumentId, DocumentSet, FieldKey};
use tracing::{debug, info, warn};

/// What a field click resolved to
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOutcome {
    /// Non-terminal field: its subtree was expanded or collapsed
    Expanded,
    /// Field is not eligible under the current constraints
    Rejected { reason: String },
    /// Several existing mappings reference the field; the caller must
    /// pick one and call [`MappingSession::select_mapping`]
    SelectionRequired { mapping_ids: Vec<String> },
    /// Field was recorded in the active mapping
    Selected,
}

/// Owns the mapping definition and drives all interactive edits
#[derive(Debug, Default)]
pub struct MappingSession {
    pub mappings: MappingDefinition,
}

impl MappingSession {
    pub fn new() -> Self {
        Self {
            mappings: MappingDefinition::new(),
        }
    }

    pub fn active_mapping(&self) -> Option<&Mapping> {
        self.mappings.active_mapping.as_ref()
    }

    pub fn active_mapping_mut(&mut self) -> Option<&mut Mapping> {
        self.mappings.active_mapping.as_mut()
    }

    /// Handle a click on a document field.
    ///
    /// Non-terminal fields toggle expansion. Terminal fields join the
    /// active mapping with replace semantics: a source click replaces
    /// the current pair's source list, a target click replaces the last
    /// target slot. Without an active mapping the field's existing
    /// mappings decide: none creates a fresh mapping, one becomes
    /// active, several require the caller to choose.
    pub fn field_selected(
        &mut self,
        docs: &mut DocumentSet,
        doc_id: &DocumentId,
        key: FieldKey,
    ) -> MappingResult<SelectionOutcome> {
        let (is_source, enumeration) = {
            let doc = docs
                .document_mut(doc_id)
                .ok_or_else(|| MappingError::UnknownDocument(doc_id.clone()))?;
            let is_source = doc.is_source;

            if !doc.field(key).is_terminal() {
                if let Err(err) = doc.populate_children(key) {
                    warn!(error = %err, "Failed to expand field");
                }
                let field = doc.field_mut(key);
                field.collapsed = !field.collapsed;
                return Ok(SelectionOutcome::Expanded);
            }

            let field = doc.field(key);
            if !field.available_for_selection {
                let reason = format!(
                    "This field cannot be selected, {}: {}",
                    field
                        .selection_exclusion_reason
                        .as_deref()
                        .unwrap_or("unavailable"),
                    field.display_name
                );
                warn!("{}", reason);
                return Ok(SelectionOutcome::Rejected { reason });
            }
            (is_source, field.enumeration)
        };

        if self.mappings.active_mapping.is_none() {
            let matches = self.mappings.find_mappings_for_field(doc_id, key, is_source);
            if matches.len() > 1 {
                debug!(
                    count = matches.len(),
                    "Found existing mappings for selected field, selection required"
                );
                return Ok(SelectionOutcome::SelectionRequired {
                    mapping_ids: matches,
                });
            }
            if let Some(id) = matches.first() {
                debug!(mapping = %id, "Found existing mapping for selected field");
                let id = id.clone();
                self.select_mapping(docs, &id)?;
                return Ok(SelectionOutcome::Selected);
            }
            self.add_new_mapping(docs, doc_id, key, is_source, enumeration)?;
            return Ok(SelectionOutcome::Selected);
        }

        let active = self
            .mappings
            .active_mapping
            .as_mut()
            .ok_or(MappingError::NoActiveMapping)?;
        let pair = active.current_pair_mut();
        if is_source {
            // only one source per pair outside collection mode
            pair.source_fields.clear();
        } else if !pair.target_fields.is_empty() {
            pair.target_fields.pop();
        }
        pair.add_field(
            FieldReference::Resolved {
                doc: doc_id.clone(),
                field: key,
            },
            is_source,
        );

        self.select_active(docs);
        Ok(SelectionOutcome::Selected)
    }

    /// Create a fresh active mapping seeded with one field. Enumeration
    /// fields start the pair in `ENUM` mode.
    pub fn add_new_mapping(
        &mut self,
        docs: &mut DocumentSet,
        doc_id: &DocumentId,
        key: FieldKey,
        is_source: bool,
        enumeration: bool,
    ) -> MappingResult<()> {
        debug!("Creating new mapping");
        self.deselect_mapping(docs);
        let id = self.mappings.allocate_mapping_id();
        let mut mapping = Mapping::new(id);
        let pair = &mut mapping.field_mappings[0];
        pair.mapped_fields_mut(is_source)[0] = crate::mapping::MappedField::resolved(
            doc_id.clone(),
            key,
        );
        if enumeration {
            pair.transition.mode = TransitionMode::Enum;
        }
        self.mappings.active_mapping = Some(mapping);
        self.select_active(docs);
        Ok(())
    }

    /// Make a persisted mapping the active one
    pub fn select_mapping(&mut self, docs: &mut DocumentSet, id: &str) -> MappingResult<()> {
        let index = self
            .mappings
            .mappings
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| MappingError::UnknownMapping(id.to_string()))?;
        debug!(mapping = %id, "Selecting active mapping");
        let mapping = self.mappings.mappings.remove(index);
        self.mappings.active_mapping = Some(mapping);
        self.select_active(docs);
        Ok(())
    }

    /// Drop the active mapping and clear all selection highlights
    pub fn deselect_mapping(&mut self, docs: &mut DocumentSet) {
        if self.mappings.active_mapping.is_some() {
            debug!("Deselecting active mapping");
        }
        self.mappings.active_mapping = None;
        for doc in docs.all_docs_mut() {
            doc.clear_selected_fields();
        }
        refresh_documents(&self.mappings, docs);
    }

    /// Persist the active mapping: its previous saved copy is replaced,
    /// and the mapping is kept only if some pair has a real field on
    /// both sides.
    pub fn save_current_mapping(&mut self) {
        let active = match &self.mappings.active_mapping {
            Some(active) => active,
            None => return,
        };
        let complete = active.is_complete();
        let id = active.id.clone();
        let was_saved = self.mappings.remove_mapping(&id);
        if complete {
            debug!(mapping = %id, "Saving current mapping");
            let copy = self
                .mappings
                .active_mapping
                .as_ref()
                .cloned()
                .unwrap_or_else(|| Mapping::new(id));
            self.mappings.mappings.push(copy);
        } else if was_saved {
            debug!(mapping = %id, "Removing incomplete mapping");
        }
    }

    /// Remove a mapping everywhere; deselects it if it was active
    pub fn remove_mapping(&mut self, docs: &mut DocumentSet, id: &str) {
        info!(mapping = %id, "Removing mapping");
        self.mappings.remove_mapping(id);
        if self
            .mappings
            .active_mapping
            .as_ref()
            .map(|m| m.id == id)
            .unwrap_or(false)
        {
            self.deselect_mapping(docs);
        } else {
            refresh_documents(&self.mappings, docs);
        }
    }

    /// Append an empty pair to the active mapping; returns its index
    pub fn add_mapped_pair(&mut self, docs: &mut DocumentSet) -> MappingResult<usize> {
        let active = self
            .mappings
            .active_mapping
            .as_mut()
            .ok_or(MappingError::NoActiveMapping)?;
        active.field_mappings.push(FieldMappingPair::default());
        let index = active.field_mappings.len() - 1;
        self.save_current_mapping();
        refresh_documents(&self.mappings, docs);
        Ok(index)
    }

    pub fn remove_mapped_pair(
        &mut self,
        docs: &mut DocumentSet,
        index: usize,
    ) -> MappingResult<()> {
        let active = self
            .mappings
            .active_mapping
            .as_mut()
            .ok_or(MappingError::NoActiveMapping)?;
        if index < active.field_mappings.len() {
            active.field_mappings.remove(index);
        }
        let empty = active.field_mappings.is_empty();
        self.save_current_mapping();
        if empty {
            self.deselect_mapping(docs);
        } else {
            refresh_documents(&self.mappings, docs);
        }
        Ok(())
    }

    /// Re-derive per-field separation actions after a pair's transition
    /// changed, then persist and refresh
    pub fn update_mapped_field(
        &mut self,
        docs: &mut DocumentSet,
        pair_index: usize,
    ) -> MappingResult<()> {
        let active = self
            .mappings
            .active_mapping
            .as_mut()
            .ok_or(MappingError::NoActiveMapping)?;
        if let Some(pair) = active.field_mappings.get_mut(pair_index) {
            pair.update_separator_indexes();
        }
        self.save_current_mapping();
        refresh_documents(&self.mappings, docs);
        Ok(())
    }

    /// Post-change bookkeeping shared by every selection path: select
    /// the mapping's fields, make sure enumeration pairs have a lookup
    /// table, persist, refresh.
    fn select_active(&mut self, docs: &mut DocumentSet) {
        if let Some(active) = &self.mappings.active_mapping {
            for (doc_id, key) in active
                .resolved_fields(true)
                .into_iter()
                .chain(active.resolved_fields(false))
            {
                if let Some(doc) = docs.document_mut(&doc_id) {
                    doc.select_field(key);
                }
            }
        }
        let def = &mut self.mappings;
        if let Some(active) = def.active_mapping.as_mut() {
            initialize_mapping_lookup_table(active, &mut def.tables, docs);
        }
        self.save_current_mapping();
        refresh_documents(&self.mappings, docs);
    }
}
