use crate::document::DocumentDefinition;
use crate::id_generator::DocumentId;
use serde::{Deserialize, Serialize};

/// Flat name/value field carried in the mapping file's `properties` block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyField {
    pub name: String,
    pub value: String,
}

/// All documents of one mapping session: source docs, target docs and
/// the property fields
#[derive(Debug, Default)]
pub struct DocumentSet {
    pub sources: Vec<DocumentDefinition>,
    pub targets: Vec<DocumentDefinition>,
    pub property_fields: Vec<PropertyField>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn docs(&self, is_source: bool) -> &[DocumentDefinition] {
        if is_source {
            &self.sources
        } else {
            &self.targets
        }
    }

    pub fn docs_mut(&mut self, is_source: bool) -> &mut Vec<DocumentDefinition> {
        if is_source {
            &mut self.sources
        } else {
            &mut self.targets
        }
    }

    pub fn all_docs(&self) -> impl Iterator<Item = &DocumentDefinition> {
        self.sources.iter().chain(self.targets.iter())
    }

    pub fn all_docs_mut(&mut self) -> impl Iterator<Item = &mut DocumentDefinition> {
        self.sources.iter_mut().chain(self.targets.iter_mut())
    }

    pub fn document(&self, id: &DocumentId) -> Option<&DocumentDefinition> {
        self.all_docs().find(|doc| doc.id() == id)
    }

    pub fn document_mut(&mut self, id: &DocumentId) -> Option<&mut DocumentDefinition> {
        self.all_docs_mut().find(|doc| doc.id() == id)
    }

    /// True once every document has either loaded or errored
    pub fn documents_are_loaded(&self) -> bool {
        self.all_docs()
            .all(|doc| doc.initialized || doc.error_occurred)
    }

    pub fn add_property_field(&mut self, field: PropertyField) {
        self.property_fields.push(field);
        self.property_fields.sort_by(|a, b| a.name.cmp(&b.name));
    }
}
