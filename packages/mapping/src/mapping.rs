//! Mapping graph nodes: mapped field references, field pairs, mappings

use crate::transition::{FieldAction, Transition};
use fieldmapper_document::{DocumentId, DocumentSet, FieldKey, NONE_FIELD_PATH};

/// What a [`MappedField`] points at.
///
/// References resolve lazily: paths parsed from a mapping file stay
/// `Unresolved` until the owning document has loaded, then the
/// reconcile pass promotes them to `Resolved` or the mapping is pruned
/// as stale.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldReference {
    /// The `[None]` placeholder keeping a pair slot non-empty
    Empty,
    /// A path parsed from a mapping file, not yet matched to a document
    Unresolved(String),
    /// A live field of a loaded document
    Resolved { doc: DocumentId, field: FieldKey },
}

impl FieldReference {
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldReference::Empty)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, FieldReference::Resolved { .. })
    }

    /// The dotted path this reference currently stands for
    pub fn display_path(&self, docs: &DocumentSet) -> String {
        match self {
            FieldReference::Empty => NONE_FIELD_PATH.to_string(),
            FieldReference::Unresolved(path) => path.clone(),
            FieldReference::Resolved { doc, field } => docs
                .document(doc)
                .and_then(|doc| doc.try_field(*field))
                .map(|field| field.path.clone())
                .unwrap_or_default(),
        }
    }
}

/// One slot of a field pair: a field reference plus its actions
#[derive(Debug, Clone, PartialEq)]
pub struct MappedField {
    pub reference: FieldReference,
    pub field_actions: Vec<FieldAction>,
}

impl MappedField {
    pub fn none() -> Self {
        Self {
            reference: FieldReference::Empty,
            field_actions: Vec::new(),
        }
    }

    pub fn unresolved(path: &str) -> Self {
        Self {
            reference: FieldReference::Unresolved(path.to_string()),
            field_actions: Vec::new(),
        }
    }

    pub fn resolved(doc: DocumentId, field: FieldKey) -> Self {
        Self {
            reference: FieldReference::Resolved { doc, field },
            field_actions: Vec::new(),
        }
    }

    /// Add or remove the separation action to match the pair's mode
    pub fn update_separator_index(&mut self, separate_mode: bool) {
        let has_action = matches!(
            self.field_actions.first(),
            Some(FieldAction::Separate { .. })
        );
        if separate_mode && !has_action {
            self.field_actions.insert(0, FieldAction::Separate { index: 1 });
        } else if !separate_mode && has_action {
            self.field_actions.remove(0);
        }
    }

    /// 1-based separation index, if the field carries one
    pub fn separator_index(&self) -> Option<u32> {
        match self.field_actions.first() {
            Some(FieldAction::Separate { index }) => Some(*index),
            None => None,
        }
    }

    pub fn set_separator_index(&mut self, index: u32) {
        self.update_separator_index(true);
        if let Some(FieldAction::Separate { index: current }) = self.field_actions.first_mut() {
            *current = index;
        }
    }
}

/// One source-fields/target-fields pairing under a single transition
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMappingPair {
    pub source_fields: Vec<MappedField>,
    pub target_fields: Vec<MappedField>,
    pub transition: Transition,
}

impl Default for FieldMappingPair {
    fn default() -> Self {
        Self {
            source_fields: vec![MappedField::none()],
            target_fields: vec![MappedField::none()],
            transition: Transition::default(),
        }
    }
}

impl FieldMappingPair {
    pub fn mapped_fields(&self, is_source: bool) -> &Vec<MappedField> {
        if is_source {
            &self.source_fields
        } else {
            &self.target_fields
        }
    }

    pub fn mapped_fields_mut(&mut self, is_source: bool) -> &mut Vec<MappedField> {
        if is_source {
            &mut self.source_fields
        } else {
            &mut self.target_fields
        }
    }

    pub fn add_field(&mut self, reference: FieldReference, is_source: bool) {
        self.mapped_fields_mut(is_source).push(MappedField {
            reference,
            field_actions: Vec::new(),
        });
    }

    /// True if some slot on the given side points at a real field
    pub fn has_genuine_field(&self, is_source: bool) -> bool {
        self.mapped_fields(is_source)
            .iter()
            .any(|mf| !mf.reference.is_empty())
    }

    pub fn is_field_mapped(&self, doc: &DocumentId, field: FieldKey, is_source: bool) -> bool {
        self.mapped_fields(is_source).iter().any(|mf| {
            matches!(&mf.reference,
                FieldReference::Resolved { doc: d, field: f } if d == doc && *f == field)
        })
    }

    /// Reconcile every target field's separation action with the
    /// current transition mode
    pub fn update_separator_indexes(&mut self) {
        let separate = self.transition.is_separate_mode();
        for field in &mut self.target_fields {
            field.update_separator_index(separate);
        }
    }

    /// Resolved fields of one side, in slot order
    pub fn resolved_fields(&self, is_source: bool) -> Vec<(DocumentId, FieldKey)> {
        self.mapped_fields(is_source)
            .iter()
            .filter_map(|mf| match &mf.reference {
                FieldReference::Resolved { doc, field } => Some((doc.clone(), *field)),
                _ => None,
            })
            .collect()
    }
}

/// One mapping: an ordered list of field pairs plus the pair currently
/// being edited
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    pub id: String,
    pub field_mappings: Vec<FieldMappingPair>,
    /// Index of the pair field selection edits; falls back to the last pair
    pub current_pair: Option<usize>,
}

impl Mapping {
    pub fn new(id: String) -> Self {
        Self {
            id,
            field_mappings: vec![FieldMappingPair::default()],
            current_pair: None,
        }
    }

    pub fn current_pair_index(&self) -> usize {
        match self.current_pair {
            Some(index) if index < self.field_mappings.len() => index,
            _ => self.field_mappings.len().saturating_sub(1),
        }
    }

    pub fn current_pair_mut(&mut self) -> &mut FieldMappingPair {
        // the pair list is kept non-empty; repair it if a caller
        // emptied `field_mappings` directly
        if self.field_mappings.is_empty() {
            self.field_mappings.push(FieldMappingPair::default());
        }
        let index = self.current_pair_index();
        &mut self.field_mappings[index]
    }

    /// True if any referenced field sits inside a collection. Collection
    /// mappings restrict which further fields may be selected and are
    /// not persisted.
    pub fn is_collection_mode(&self, docs: &DocumentSet) -> bool {
        self.resolved_fields(true)
            .into_iter()
            .chain(self.resolved_fields(false))
            .any(|(doc_id, field)| {
                docs.document(&doc_id)
                    .map(|doc| doc.is_in_collection(field))
                    .unwrap_or(false)
            })
    }

    /// Resolved fields of one side across every pair
    pub fn resolved_fields(&self, is_source: bool) -> Vec<(DocumentId, FieldKey)> {
        self.field_mappings
            .iter()
            .flat_map(|pair| pair.resolved_fields(is_source))
            .collect()
    }

    pub fn is_field_mapped(&self, doc: &DocumentId, field: FieldKey, is_source: bool) -> bool {
        self.field_mappings
            .iter()
            .any(|pair| pair.is_field_mapped(doc, field, is_source))
    }

    pub fn has_genuine_field(&self, is_source: bool) -> bool {
        self.field_mappings
            .iter()
            .any(|pair| pair.has_genuine_field(is_source))
    }

    /// Complete mappings have a real field on both sides
    pub fn is_complete(&self) -> bool {
        self.has_genuine_field(true) && self.has_genuine_field(false)
    }

    pub fn references_lookup_table(&self, table_name: &str) -> bool {
        self.field_mappings
            .iter()
            .any(|pair| pair.transition.lookup_table_name.as_deref() == Some(table_name))
    }
}
