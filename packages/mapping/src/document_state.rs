//! Pushes mapping-graph state back onto document fields: selection
//! highlights, part-of-mapping markers and collection-mode eligibility.

use crate::definition::MappingDefinition;
use crate::mapping::FieldReference;
use fieldmapper_document::{DocumentDefinition, DocumentId, DocumentSet, FieldKey};
use tracing::debug;

/// Collection-mode constraints for one side, precomputed from the
/// active mapping's first field on that side
struct CollectionContext {
    /// First field is outside any collection: only non-collection
    /// terminals may join the mapping
    primitive_mode: bool,
    /// In collection mode proper, only direct children of this parent
    /// may join
    parent_path: Option<String>,
    parent_display_name: Option<String>,
}

/// A field referenced by some mapping, with the flags it contributes
struct FieldMark {
    doc: DocumentId,
    field: FieldKey,
    mapping_is_active: bool,
    part_of_transformation: bool,
}

/// Recompute the derived per-field state of every loaded document from
/// the mapping graph. Always a full reset-and-reapply; never additive.
pub fn refresh_documents(def: &MappingDefinition, docs: &mut DocumentSet) {
    let source_context = collection_context(def, docs, true);
    let target_context = collection_context(def, docs, false);
    let marks = collect_marks(def);

    for doc in docs.all_docs_mut() {
        if !doc.initialized {
            continue;
        }
        let context = if doc.is_source {
            &source_context
        } else {
            &target_context
        };
        apply_to_document(doc, context.as_ref(), &marks);
    }
}

/// Constraints apply only when the active mapping is collection mode
/// AND already references a field on this side; a side with nothing
/// selected yet stays fully selectable.
fn collection_context(
    def: &MappingDefinition,
    docs: &DocumentSet,
    is_source: bool,
) -> Option<CollectionContext> {
    let active = def.active_mapping.as_ref()?;
    if !active.is_collection_mode(docs) {
        return None;
    }
    let (doc_id, field) = active.resolved_fields(is_source).into_iter().next()?;
    let doc = docs.document(&doc_id)?;
    if !doc.is_in_collection(field) {
        return Some(CollectionContext {
            primitive_mode: true,
            parent_path: None,
            parent_display_name: None,
        });
    }
    let parent = doc.field(field).parent?;
    Some(CollectionContext {
        primitive_mode: false,
        parent_path: Some(doc.field(parent).path.clone()),
        parent_display_name: Some(doc.field(parent).display_name.clone()),
    })
}

fn collect_marks(def: &MappingDefinition) -> Vec<FieldMark> {
    let active_id = def.active_mapping.as_ref().map(|m| m.id.clone());
    let mut marks = Vec::new();
    for mapping in def.all_mappings() {
        let mapping_is_active = active_id.as_deref() == Some(&mapping.id);
        let part_of_transformation = mapping
            .field_mappings
            .iter()
            .any(|pair| pair.transition.has_transition());
        for pair in &mapping.field_mappings {
            for mapped_field in pair.source_fields.iter().chain(pair.target_fields.iter()) {
                if let FieldReference::Resolved { doc, field } = &mapped_field.reference {
                    marks.push(FieldMark {
                        doc: doc.clone(),
                        field: *field,
                        mapping_is_active,
                        part_of_transformation,
                    });
                }
            }
        }
    }
    marks
}

fn apply_to_document(
    doc: &mut DocumentDefinition,
    context: Option<&CollectionContext>,
    marks: &[FieldMark],
) {
    let collection_mode = context.is_some();
    for key in doc.all_fields().to_vec() {
        let field = doc.field_mut(key);
        field.part_of_mapping = false;
        field.part_of_transformation = false;
        field.selected = false;
        field.has_unmapped_children = false;
        field.available_for_selection = !collection_mode;
        field.selection_exclusion_reason = None;
    }

    if let Some(context) = context {
        apply_collection_constraints(doc, context);
    }

    for mark in marks {
        if &mark.doc != doc.id() {
            continue;
        }
        let selected = mark.mapping_is_active && doc.field(mark.field).is_terminal();
        if selected {
            debug!(path = %doc.field(mark.field).path, "Field selected");
        }
        doc.field_mut(mark.field).selected = selected;
        let mut current = Some(mark.field);
        while let Some(key) = current {
            let field = doc.field_mut(key);
            if selected && key != mark.field {
                field.collapsed = false;
            }
            field.part_of_mapping = true;
            field.part_of_transformation =
                field.part_of_transformation || mark.part_of_transformation;
            current = field.parent;
        }
    }

    for key in doc.all_fields().to_vec() {
        let unmapped = has_unmapped_terminal_descendant(doc, key);
        doc.field_mut(key).has_unmapped_children = unmapped;
    }
}

/// Walk terminal fields, re-enabling the eligible ones and their
/// ancestor chains; everything else keeps an exclusion reason.
fn apply_collection_constraints(doc: &mut DocumentDefinition, context: &CollectionContext) {
    let parent_display = context.parent_display_name.as_deref().unwrap_or("");
    for key in doc.terminal_fields().to_vec() {
        if context.primitive_mode {
            if doc.is_in_collection(key) {
                doc.field_mut(key).selection_exclusion_reason = Some(
                    "primitive collection mode (cannot select fields within collection)"
                        .to_string(),
                );
                continue;
            }
        } else {
            let parent_matches = doc
                .field(key)
                .parent
                .map(|parent| Some(doc.field(parent).path.as_str()) == context.parent_path.as_deref())
                .unwrap_or(false);
            if !doc.is_in_collection(key) || !parent_matches {
                doc.field_mut(key).selection_exclusion_reason = Some(format!(
                    "collection mode (only children of {} may be selected)",
                    parent_display
                ));
                continue;
            }
        }
        let mut current = Some(key);
        while let Some(k) = current {
            let field = doc.field_mut(k);
            field.available_for_selection = true;
            field.selection_exclusion_reason = None;
            current = field.parent;
        }
    }
}

/// True for non-terminal fields with at least one terminal descendant
/// not yet part of any mapping
fn has_unmapped_terminal_descendant(doc: &DocumentDefinition, key: FieldKey) -> bool {
    let field = doc.field(key);
    if field.is_terminal() {
        return false;
    }
    for child in &field.children {
        let child_field = doc.field(*child);
        if child_field.is_terminal() {
            if !child_field.part_of_mapping {
                return true;
            }
        } else if has_unmapped_terminal_descendant(doc, *child) {
            return true;
        }
    }
    false
}
