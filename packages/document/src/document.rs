//! # Document Definition
//!
//! Owns the field forest for one source or target document. Fields live
//! in an arena keyed by [`FieldKey`]; the document also maintains a
//! flattened field list, a terminal-field list, a path index, and two
//! class-name-keyed caches: complex-type templates (used to stamp out
//! children when a field of that type is first expanded) and
//! enumeration fields.

use crate::error::{DocumentError, DocumentResult};
use crate::field::{Field, FieldKey, FieldStatus};
use crate::id_generator::{DocumentId, IdGenerator};
use crate::inspection::{parse_inspection, FieldRecord};
use fieldmapper_common::util::remove_item;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, error, info};

pub(crate) const PATH_SEPARATOR: char = '.';

/// The field forest for one source or target document
#[derive(Debug, Clone)]
pub struct DocumentDefinition {
    pub name: String,
    pub fully_qualified_name: String,
    pub uri: Option<String>,
    pub is_source: bool,
    pub initialized: bool,
    pub error_occurred: bool,

    id: DocumentId,
    ids: IdGenerator,
    arena: Vec<Field>,
    roots: Vec<FieldKey>,
    all_fields: Vec<FieldKey>,
    terminal_fields: Vec<FieldKey>,
    fields_by_path: HashMap<String, FieldKey>,
    field_paths: Vec<String>,
    complex_templates: HashMap<String, FieldRecord>,
    enum_fields_by_class: HashMap<String, FieldKey>,
}

impl DocumentDefinition {
    pub fn new(identifier: &str, is_source: bool) -> Self {
        Self {
            name: identifier.to_string(),
            fully_qualified_name: identifier.to_string(),
            uri: None,
            is_source,
            initialized: false,
            error_occurred: false,
            id: DocumentId::from_identifier(identifier),
            ids: IdGenerator::new(identifier),
            arena: Vec::new(),
            roots: Vec::new(),
            all_fields: Vec::new(),
            terminal_fields: Vec::new(),
            fields_by_path: HashMap::new(),
            field_paths: Vec::new(),
            complex_templates: HashMap::new(),
            enum_fields_by_class: HashMap::new(),
        }
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn field(&self, key: FieldKey) -> &Field {
        &self.arena[key.0]
    }

    pub fn field_mut(&mut self, key: FieldKey) -> &mut Field {
        &mut self.arena[key.0]
    }

    /// Checked arena access. `None` for keys minted by an earlier
    /// revision of this document, after a reload shrank the arena.
    pub fn try_field(&self, key: FieldKey) -> Option<&Field> {
        self.arena.get(key.0)
    }

    /// Top-level fields
    pub fn fields(&self) -> &[FieldKey] {
        &self.roots
    }

    /// Every indexed field, depth-first
    pub fn all_fields(&self) -> &[FieldKey] {
        &self.all_fields
    }

    pub fn terminal_fields(&self) -> &[FieldKey] {
        &self.terminal_fields
    }

    /// Sorted list of every indexed path
    pub fn field_paths(&self) -> &[String] {
        &self.field_paths
    }

    /// Path lookup without lazy expansion
    pub fn lookup(&self, path: &str) -> Option<FieldKey> {
        self.fields_by_path.get(path).copied()
    }

    pub fn get_enum_field(&self, class_name: &str) -> Option<FieldKey> {
        self.enum_fields_by_class.get(class_name).copied()
    }

    /// True if the field or any of its ancestors is collection-typed
    pub fn is_in_collection(&self, key: FieldKey) -> bool {
        let mut current = Some(key);
        while let Some(k) = current {
            let field = self.field(k);
            if field.collection {
                return true;
            }
            current = field.parent;
        }
        false
    }

    /// One-time initial build from a class inspection response.
    ///
    /// Discovers complex-type templates, alphabetizes siblings
    /// (duplicate display names are dropped, first wins), truncates
    /// children below one level (collections exempt), assigns paths
    /// depth-first and populates the flattened indexes.
    pub fn populate_from_inspection(&mut self, json: &Value) -> DocumentResult<()> {
        let inspection = parse_inspection(json)?;

        self.fully_qualified_name = inspection.class_name.clone();
        self.name = inspection
            .class_name
            .rsplit(PATH_SEPARATOR)
            .next()
            .unwrap_or(&inspection.class_name)
            .to_string();
        self.uri = inspection.uri.clone();

        let mut records = inspection.fields;
        self.discover_complex_templates(&records);
        alphabetize_records(&mut records);

        for record in &records {
            let root = self.create_node(record, None);
            self.roots.push(root);
            for child in &record.children {
                // collections keep their full subtree; everything else is
                // truncated below one level and lazily expanded later
                if record.collection || child.collection {
                    self.materialize_subtree(child, Some(root));
                } else {
                    self.create_node(child, Some(root));
                }
            }
        }

        self.rebuild_indexes();
        self.initialized = true;

        info!(
            document = %self.name,
            fields = self.all_fields.len(),
            terminal = self.terminal_fields.len(),
            "Finished populating fields"
        );
        Ok(())
    }

    /// Lazily expand a complex field from its cached class template.
    ///
    /// No-op if the field is terminal or already has children. Expanding
    /// twice produces the same children as expanding once.
    pub fn populate_children(&mut self, key: FieldKey) -> DocumentResult<()> {
        let (is_terminal, has_children, class_name, path, depth) = {
            let field = self.field(key);
            (
                field.is_terminal(),
                !field.children.is_empty(),
                field.class_name.clone(),
                field.path.clone(),
                field.depth,
            )
        };
        if is_terminal || has_children {
            return Ok(());
        }

        debug!(path = %path, class = %class_name, "Populating complex field's children");
        let template = match self.complex_templates.get(&class_name) {
            Some(template) => template.clone(),
            None => {
                error!(class = %class_name, "Couldn't find cached complex type template");
                return Err(DocumentError::MissingComplexTypeTemplate(class_name));
            }
        };

        let prefix = format!("{}{}", path, PATH_SEPARATOR);
        for child in &template.children {
            let child_key = self.create_node(child, Some(key));
            self.populate_paths(child_key, &prefix, depth + 1);
            self.index_subtree(child_key);
        }
        self.field_paths.sort();
        Ok(())
    }

    /// Resolve a path to a field, lazily expanding ancestors as needed.
    ///
    /// If an ancestor segment has no indexed field the lookup fails
    /// permanently with [`DocumentError::UnresolvableParent`], signaling
    /// a structural mismatch between the requested path and the tree.
    pub fn get_field(&mut self, path: &str) -> DocumentResult<Option<FieldKey>> {
        if let Some(key) = self.fields_by_path.get(path) {
            return Ok(Some(*key));
        }
        if !path.contains(PATH_SEPARATOR) {
            return Ok(None);
        }

        let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
        let mut parent_path = String::new();
        for segment in &segments[..segments.len() - 1] {
            if !parent_path.is_empty() {
                parent_path.push(PATH_SEPARATOR);
            }
            parent_path.push_str(segment);
            debug!(parent = %parent_path, requested = %path, "Populating children for lookup");
            let parent = self.fields_by_path.get(&parent_path).copied().ok_or_else(|| {
                DocumentError::UnresolvableParent {
                    parent: parent_path.clone(),
                    requested: path.to_string(),
                }
            })?;
            self.populate_children(parent)?;
        }
        Ok(self.fields_by_path.get(path).copied())
    }

    /// Add a top-level field after the initial build
    pub fn add_field(&mut self, record: FieldRecord) {
        if record.ty.is_complex() && record.status == FieldStatus::Supported {
            self.complex_templates
                .entry(record.class_name.clone())
                .or_insert_with(|| truncate_template(&record));
        }
        let root = self.materialize_subtree(&record, None);
        self.roots.push(root);
        let mut roots = std::mem::take(&mut self.roots);
        roots.sort_by(|a, b| {
            self.field(*a)
                .display_name
                .cmp(&self.field(*b).display_name)
        });
        self.roots = roots;
        self.rebuild_indexes();
    }

    /// Remove a field (and its subtree) from the document
    pub fn remove_field(&mut self, key: FieldKey) {
        if let Some(parent) = self.field(key).parent {
            remove_item(&mut self.field_mut(parent).children, &key);
        } else {
            remove_item(&mut self.roots, &key);
        }
        self.rebuild_indexes();
    }

    pub fn clear_selected_fields(&mut self) {
        for field in &mut self.arena {
            field.selected = false;
        }
    }

    pub fn selected_fields(&self) -> Vec<FieldKey> {
        self.all_fields
            .iter()
            .copied()
            .filter(|key| self.field(*key).selected)
            .collect()
    }

    /// Mark a field selected and uncollapse every ancestor so it is visible
    pub fn select_field(&mut self, key: FieldKey) {
        self.field_mut(key).selected = true;
        let mut current = self.field(key).parent;
        while let Some(k) = current {
            self.field_mut(k).collapsed = false;
            current = self.field(k).parent;
        }
    }

    // --- internal tree plumbing ---

    fn discover_complex_templates(&mut self, records: &[FieldRecord]) {
        for record in records {
            if record.ty.is_complex() && record.status == FieldStatus::Supported {
                // first supported occurrence wins
                self.complex_templates
                    .entry(record.class_name.clone())
                    .or_insert_with(|| truncate_template(record));
            }
            self.discover_complex_templates(&record.children);
        }
    }

    /// Allocate one arena node for a record, attached to `parent`
    fn create_node(&mut self, record: &FieldRecord, parent: Option<FieldKey>) -> FieldKey {
        let key = FieldKey(self.arena.len());
        let field = Field {
            key,
            uuid: self.ids.next_id(),
            name: record.name.clone(),
            class_name: record.class_name.clone(),
            display_name: display_name_of(&record.name),
            path: String::new(),
            ty: record.ty,
            status: record.status,
            enumeration: record.enumeration,
            enum_values: record.enum_values.clone(),
            collection: record.collection,
            depth: 0,
            parent,
            children: Vec::new(),
            service_object: record.raw.clone(),
            collapsed: true,
            selected: false,
            part_of_mapping: false,
            part_of_transformation: false,
            has_unmapped_children: false,
            available_for_selection: true,
            selection_exclusion_reason: None,
        };
        self.arena.push(field);
        if let Some(parent) = parent {
            self.field_mut(parent).children.push(key);
        }
        key
    }

    fn materialize_subtree(&mut self, record: &FieldRecord, parent: Option<FieldKey>) -> FieldKey {
        let key = self.create_node(record, parent);
        for child in &record.children {
            self.materialize_subtree(child, Some(key));
        }
        key
    }

    /// Recompute `path`, `depth` and the pass-through payload's path for
    /// a subtree. Paths are parent-prefixed display names.
    fn populate_paths(&mut self, key: FieldKey, parent_path: &str, depth: usize) {
        let path = format!("{}{}", parent_path, self.field(key).display_name);
        {
            let field = self.field_mut(key);
            field.path = path.clone();
            field.depth = depth;
            if let Some(object) = field.service_object.as_object_mut() {
                object.insert("path".to_string(), Value::String(path.clone()));
            }
        }
        let prefix = format!("{}{}", path, PATH_SEPARATOR);
        for child in self.field(key).children.clone() {
            self.populate_paths(child, &prefix, depth + 1);
        }
    }

    /// Register a subtree in the flattened indexes
    fn index_subtree(&mut self, key: FieldKey) {
        let (path, enumeration, class_name, terminal) = {
            let field = self.field(key);
            (
                field.path.clone(),
                field.enumeration,
                field.class_name.clone(),
                field.is_terminal(),
            )
        };
        self.all_fields.push(key);
        self.field_paths.push(path.clone());
        self.fields_by_path.insert(path, key);
        if enumeration {
            self.enum_fields_by_class.entry(class_name).or_insert(key);
        }
        if terminal {
            self.terminal_fields.push(key);
        } else {
            for child in self.field(key).children.clone() {
                self.index_subtree(child);
            }
        }
    }

    fn rebuild_indexes(&mut self) {
        self.all_fields.clear();
        self.terminal_fields.clear();
        self.fields_by_path.clear();
        self.field_paths.clear();
        self.enum_fields_by_class.clear();
        for root in self.roots.clone() {
            self.populate_paths(root, "", 0);
            self.index_subtree(root);
        }
        self.field_paths.sort();
    }
}

fn display_name_of(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Canonical one-level-deep template copy for a complex class
fn truncate_template(record: &FieldRecord) -> FieldRecord {
    let mut template = record.clone();
    for child in &mut template.children {
        child.children.clear();
    }
    alphabetize_records(&mut template.children);
    template
}

/// Sort siblings by display name, dropping duplicate names (first wins)
fn alphabetize_records(records: &mut Vec<FieldRecord>) {
    let mut seen = std::collections::HashSet::new();
    records.retain(|record| {
        let name = display_name_of(&record.name);
        if !seen.insert(name.clone()) {
            debug!(name = %name, "Dropping duplicate sibling field");
            return false;
        }
        true
    });
    records.sort_by_key(|record| display_name_of(&record.name));
    for record in records {
        alphabetize_records(&mut record.children);
    }
}
