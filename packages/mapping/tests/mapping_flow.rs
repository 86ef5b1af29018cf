//! Interactive mapping session tests: selection flows, collection-mode
//! eligibility, lookup table bootstrapping and stale mapping pruning

use fieldmapper_document::{DocumentDefinition, DocumentId, DocumentSet, FieldKey};
use fieldmapper_mapping::{
    remove_stale_mappings, resolve_field_references, MappedField, Mapping, MappingSession,
    SelectionOutcome, TransitionMode,
};
use serde_json::{json, Value};

fn user_inspection() -> Value {
    json!({
        "javaClass": {
            "className": "com.example.User",
            "uri": "atlas:java?className=com.example.User",
            "javaFields": { "javaField": [
                { "name": "name", "type": "STRING", "className": "java.lang.String", "status": "SUPPORTED" },
                { "name": "age", "type": "INTEGER", "className": "int", "status": "SUPPORTED" },
                {
                    "name": "status", "type": "COMPLEX",
                    "className": "com.example.Status", "status": "SUPPORTED",
                    "enumeration": true,
                    "javaEnumFields": { "javaEnumField": [
                        { "name": "ACTIVE", "ordinal": 0 },
                        { "name": "LOCKED", "ordinal": 1 }
                    ]}
                },
                {
                    "name": "phones", "type": "COMPLEX",
                    "className": "com.example.Phone", "status": "SUPPORTED",
                    "collectionType": "LIST",
                    "javaFields": { "javaField": [
                        { "name": "number", "type": "STRING", "className": "java.lang.String", "status": "SUPPORTED" },
                        { "name": "kind", "type": "STRING", "className": "java.lang.String", "status": "SUPPORTED" }
                    ]}
                }
            ]}
        }
    })
}

fn contact_inspection() -> Value {
    json!({
        "javaClass": {
            "className": "com.example.Contact",
            "uri": "atlas:java?className=com.example.Contact",
            "javaFields": { "javaField": [
                { "name": "fullName", "type": "STRING", "className": "java.lang.String", "status": "SUPPORTED" },
                { "name": "firstName", "type": "STRING", "className": "java.lang.String", "status": "SUPPORTED" },
                { "name": "lastName", "type": "STRING", "className": "java.lang.String", "status": "SUPPORTED" },
                {
                    "name": "priority", "type": "COMPLEX",
                    "className": "com.example.Priority", "status": "SUPPORTED",
                    "enumeration": true,
                    "javaEnumFields": { "javaEnumField": [
                        { "name": "LOW", "ordinal": 0 },
                        { "name": "HIGH", "ordinal": 1 }
                    ]}
                },
                {
                    "name": "addresses", "type": "COMPLEX",
                    "className": "com.example.Addr", "status": "SUPPORTED",
                    "collectionType": "LIST",
                    "javaFields": { "javaField": [
                        { "name": "line1", "type": "STRING", "className": "java.lang.String", "status": "SUPPORTED" }
                    ]}
                }
            ]}
        }
    })
}

fn loaded_docs() -> DocumentSet {
    let mut docs = DocumentSet::new();
    let mut user = DocumentDefinition::new("com.example.User", true);
    user.populate_from_inspection(&user_inspection()).unwrap();
    docs.sources.push(user);
    let mut contact = DocumentDefinition::new("com.example.Contact", false);
    contact
        .populate_from_inspection(&contact_inspection())
        .unwrap();
    docs.targets.push(contact);
    docs
}

fn field_at(docs: &mut DocumentSet, is_source: bool, path: &str) -> (DocumentId, FieldKey) {
    let doc = &mut docs.docs_mut(is_source)[0];
    let key = doc.get_field(path).unwrap().unwrap();
    (doc.id().clone(), key)
}

#[test]
fn test_source_then_target_builds_a_complete_mapping() {
    let mut docs = loaded_docs();
    let mut session = MappingSession::new();

    let (user, name) = field_at(&mut docs, true, "Name");
    let outcome = session.field_selected(&mut docs, &user, name).unwrap();
    assert_eq!(outcome, SelectionOutcome::Selected);
    // incomplete: active only, nothing persisted yet
    assert!(session.active_mapping().is_some());
    assert!(session.mappings.mappings.is_empty());

    let (contact, full_name) = field_at(&mut docs, false, "FullName");
    let outcome = session.field_selected(&mut docs, &contact, full_name).unwrap();
    assert_eq!(outcome, SelectionOutcome::Selected);
    assert_eq!(session.mappings.mappings.len(), 1);
    assert!(session.mappings.mappings[0].is_complete());

    // derived document state followed the edit
    let user_doc = &docs.docs(true)[0];
    assert!(user_doc.field(name).selected);
    assert!(user_doc.field(name).part_of_mapping);
    let contact_doc = &docs.docs(false)[0];
    assert!(contact_doc.field(full_name).part_of_mapping);
}

#[test]
fn test_source_click_replaces_previous_source() {
    let mut docs = loaded_docs();
    let mut session = MappingSession::new();

    let (user, name) = field_at(&mut docs, true, "Name");
    session.field_selected(&mut docs, &user, name).unwrap();
    let (user, age) = field_at(&mut docs, true, "Age");
    session.field_selected(&mut docs, &user, age).unwrap();

    let active = session.active_mapping().unwrap();
    let sources = active.field_mappings[0].resolved_fields(true);
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].1, age);
    // old source no longer marked
    assert!(!docs.docs(true)[0].field(name).part_of_mapping);
}

#[test]
fn test_nonterminal_click_toggles_expansion() {
    let mut docs = loaded_docs();
    let mut session = MappingSession::new();

    let (user, phones) = field_at(&mut docs, true, "Phones");
    assert!(docs.docs(true)[0].field(phones).collapsed);
    let outcome = session.field_selected(&mut docs, &user, phones).unwrap();
    assert_eq!(outcome, SelectionOutcome::Expanded);
    assert!(!docs.docs(true)[0].field(phones).collapsed);
    assert!(session.active_mapping().is_none());
}

#[test]
fn test_deselect_clears_selection_but_keeps_mapping() {
    let mut docs = loaded_docs();
    let mut session = MappingSession::new();

    let (user, name) = field_at(&mut docs, true, "Name");
    session.field_selected(&mut docs, &user, name).unwrap();
    let (contact, full_name) = field_at(&mut docs, false, "FullName");
    session.field_selected(&mut docs, &contact, full_name).unwrap();

    session.deselect_mapping(&mut docs);
    assert!(session.active_mapping().is_none());
    assert_eq!(session.mappings.mappings.len(), 1);
    assert!(!docs.docs(true)[0].field(name).selected);
    // still part of a (now inactive) mapping
    assert!(docs.docs(true)[0].field(name).part_of_mapping);
}

#[test]
fn test_reselecting_a_mapped_field_activates_its_mapping() {
    let mut docs = loaded_docs();
    let mut session = MappingSession::new();

    let (user, name) = field_at(&mut docs, true, "Name");
    session.field_selected(&mut docs, &user, name).unwrap();
    let (contact, full_name) = field_at(&mut docs, false, "FullName");
    session.field_selected(&mut docs, &contact, full_name).unwrap();
    let id = session.active_mapping().unwrap().id.clone();
    session.deselect_mapping(&mut docs);

    let outcome = session.field_selected(&mut docs, &user, name).unwrap();
    assert_eq!(outcome, SelectionOutcome::Selected);
    assert_eq!(session.active_mapping().unwrap().id, id);
}

#[test]
fn test_multiple_existing_mappings_require_a_choice() {
    let mut docs = loaded_docs();
    let mut session = MappingSession::new();
    let (user, name) = field_at(&mut docs, true, "Name");

    for target_path in ["FullName", "FirstName"] {
        let (contact, target) = field_at(&mut docs, false, target_path);
        let id = session.mappings.allocate_mapping_id();
        let mut mapping = Mapping::new(id);
        mapping.field_mappings[0].source_fields =
            vec![MappedField::resolved(user.clone(), name)];
        mapping.field_mappings[0].target_fields =
            vec![MappedField::resolved(contact, target)];
        session.mappings.mappings.push(mapping);
    }

    match session.field_selected(&mut docs, &user, name).unwrap() {
        SelectionOutcome::SelectionRequired { mapping_ids } => {
            assert_eq!(mapping_ids.len(), 2);
        }
        other => panic!("expected selection required, got {:?}", other),
    }
    assert!(session.active_mapping().is_none());
}

#[test]
fn test_enumeration_selection_creates_a_lookup_table() {
    let mut docs = loaded_docs();
    let mut session = MappingSession::new();

    let (user, status) = field_at(&mut docs, true, "Status");
    session.field_selected(&mut docs, &user, status).unwrap();
    let active = session.active_mapping().unwrap();
    assert_eq!(
        active.field_mappings[0].transition.mode,
        TransitionMode::Enum
    );
    // no target yet: no table
    assert!(active.field_mappings[0].transition.lookup_table_name.is_none());

    let (contact, priority) = field_at(&mut docs, false, "Priority");
    session.field_selected(&mut docs, &contact, priority).unwrap();
    let active = session.active_mapping().unwrap();
    let table_name = active.field_mappings[0]
        .transition
        .lookup_table_name
        .clone()
        .expect("table assigned");

    let table = session.mappings.tables.by_name(&table_name).unwrap();
    assert_eq!(table.source_identifier.as_deref(), Some("com.example.Status"));
    assert_eq!(
        table.target_identifier.as_deref(),
        Some("com.example.Priority")
    );
    // same class combination reuses the table
    assert_eq!(
        session
            .mappings
            .tables
            .get_or_create("com.example.Status", "com.example.Priority"),
        table_name
    );
}

#[test]
fn test_collection_selection_restricts_to_sibling_fields() {
    let mut docs = loaded_docs();
    let mut session = MappingSession::new();

    let (user, number) = field_at(&mut docs, true, "Phones.Number");
    session.field_selected(&mut docs, &user, number).unwrap();

    let user_doc = &docs.docs(true)[0];
    let name = user_doc.lookup("Name").unwrap();
    assert!(!user_doc.field(name).available_for_selection);
    let reason = user_doc.field(name).selection_exclusion_reason.clone().unwrap();
    assert!(reason.contains("only children of Phones"));
    let kind = user_doc.lookup("Phones.Kind").unwrap();
    assert!(user_doc.field(kind).available_for_selection);

    // clicking the excluded field is rejected
    match session.field_selected(&mut docs, &user, name).unwrap() {
        SelectionOutcome::Rejected { reason } => {
            assert!(reason.contains("cannot be selected"));
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[test]
fn test_primitive_collection_mode_excludes_collection_fields() {
    let mut docs = loaded_docs();
    let mut session = MappingSession::new();

    let (user, name) = field_at(&mut docs, true, "Name");
    session.field_selected(&mut docs, &user, name).unwrap();
    let (contact, line1) = field_at(&mut docs, false, "Addresses.Line1");
    session.field_selected(&mut docs, &contact, line1).unwrap();

    // source side: first selected field is outside any collection, so
    // collection-held source fields are off limits
    let user_doc = &docs.docs(true)[0];
    let number = user_doc.lookup("Phones.Number").unwrap();
    assert!(!user_doc.field(number).available_for_selection);
    assert!(user_doc
        .field(number)
        .selection_exclusion_reason
        .as_deref()
        .unwrap()
        .contains("primitive collection mode"));
    assert!(user_doc.field(user_doc.lookup("Age").unwrap()).available_for_selection);

    // target side is in collection mode proper
    let contact_doc = &docs.docs(false)[0];
    let full_name = contact_doc.lookup("FullName").unwrap();
    assert!(!contact_doc.field(full_name).available_for_selection);
}

#[test]
fn test_unmapped_children_flag_tracks_mappings() {
    let mut docs = loaded_docs();
    let mut session = MappingSession::new();

    let (user, number) = field_at(&mut docs, true, "Phones.Number");
    session.field_selected(&mut docs, &user, number).unwrap();

    let user_doc = &docs.docs(true)[0];
    let phones = user_doc.lookup("Phones").unwrap();
    // Kind is still unmapped under Phones
    assert!(user_doc.field(phones).has_unmapped_children);
    assert!(user_doc.field(phones).part_of_mapping);
}

#[test]
fn test_stale_mappings_are_pruned_after_reload() {
    let mut docs = loaded_docs();
    let mut def = fieldmapper_mapping::MappingDefinition::new();

    let id = def.allocate_mapping_id();
    let mut live = Mapping::new(id);
    live.field_mappings[0].source_fields = vec![MappedField::unresolved("Name")];
    live.field_mappings[0].target_fields = vec![MappedField::unresolved("FullName")];
    def.mappings.push(live);

    let id = def.allocate_mapping_id();
    let mut stale = Mapping::new(id);
    stale.field_mappings[0].source_fields = vec![MappedField::unresolved("Vanished")];
    stale.field_mappings[0].target_fields = vec![MappedField::unresolved("FullName")];
    def.mappings.push(stale);

    // a placeholder source never counts against a mapping
    let id = def.allocate_mapping_id();
    let mut placeholder = Mapping::new(id);
    placeholder.field_mappings[0].target_fields = vec![MappedField::unresolved("FirstName")];
    def.mappings.push(placeholder);

    resolve_field_references(&mut def, &mut docs);
    remove_stale_mappings(&mut def, &docs);

    let ids: Vec<&str> = def.mappings.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["mapping.1", "mapping.3"]);
}

#[test]
fn test_reload_with_fewer_fields_prunes_resolved_mappings() {
    let mut docs = loaded_docs();
    let mut def = fieldmapper_mapping::MappingDefinition::new();

    let (user, name) = field_at(&mut docs, true, "Name");
    let (contact, full_name) = field_at(&mut docs, false, "FullName");
    let id = def.allocate_mapping_id();
    let mut mapping = Mapping::new(id);
    mapping.field_mappings[0].source_fields = vec![MappedField::resolved(user, name)];
    mapping.field_mappings[0].target_fields = vec![MappedField::resolved(contact, full_name)];
    def.mappings.push(mapping);

    // reload the source document with a single field; the mapping's
    // arena key now points past the end of the new, smaller arena
    let mut reloaded = DocumentDefinition::new("com.example.User", true);
    reloaded
        .populate_from_inspection(&json!({
            "javaClass": {
                "className": "com.example.User",
                "javaFields": { "javaField": [
                    { "name": "age", "type": "INTEGER", "className": "int", "status": "SUPPORTED" }
                ]}
            }
        }))
        .unwrap();
    docs.sources[0] = reloaded;

    remove_stale_mappings(&mut def, &docs);
    assert!(def.mappings.is_empty());
}

#[test]
fn test_removing_the_active_mapping_deselects_it() {
    let mut docs = loaded_docs();
    let mut session = MappingSession::new();

    let (user, name) = field_at(&mut docs, true, "Name");
    session.field_selected(&mut docs, &user, name).unwrap();
    let (contact, full_name) = field_at(&mut docs, false, "FullName");
    session.field_selected(&mut docs, &contact, full_name).unwrap();
    let id = session.active_mapping().unwrap().id.clone();

    session.remove_mapping(&mut docs, &id);
    assert!(session.active_mapping().is_none());
    assert!(session.mappings.mappings.is_empty());
    assert!(!docs.docs(true)[0].field(name).part_of_mapping);
}

#[test]
fn test_removing_last_pair_discards_the_mapping() {
    let mut docs = loaded_docs();
    let mut session = MappingSession::new();

    let (user, name) = field_at(&mut docs, true, "Name");
    session.field_selected(&mut docs, &user, name).unwrap();
    let (contact, full_name) = field_at(&mut docs, false, "FullName");
    session.field_selected(&mut docs, &contact, full_name).unwrap();
    assert_eq!(session.mappings.mappings.len(), 1);

    session.remove_mapped_pair(&mut docs, 0).unwrap();
    assert!(session.active_mapping().is_none());
    assert!(session.mappings.mappings.is_empty());
}
