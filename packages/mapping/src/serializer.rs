//! # AtlasMapping Wire Serializer
//!
//! Converts the mapping graph to and from the AtlasMapping JSON
//! envelope. Each field pair serializes to its own wire mapping, tagged
//! by `jsonType`; mapped fields carry the verbatim inspection payload
//! with the recomputed path. Serialization is best-effort: a mapping
//! that cannot serialize is logged and skipped, never the whole file.

use crate::definition::MappingDefinition;
use crate::lookup_table::{LookupTable, LookupTableEntry};
use crate::mapping::{FieldMappingPair, FieldReference, MappedField, Mapping};
use crate::transition::{TransitionDelimiter, TransitionMode};
use fieldmapper_document::{DocumentSet, PropertyField};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub const ATLAS_MAPPING_JSON_TYPE: &str = "com.mediadriver.atlas.v2.AtlasMapping";
pub const MAPPED_FIELD_JSON_TYPE: &str = "com.mediadriver.atlas.v2.MappedField";
pub const MAP_ACTION_JSON_TYPE: &str = "com.mediadriver.atlas.v2.MapAction";

#[derive(Error, Debug)]
pub enum SerializeError {
    #[error("Malformed mapping file: {0}")]
    MalformedMappingFile(String),

    #[error("Mapped field is not resolved: {0}")]
    UnresolvedField(String),

    #[error("Mapped field references an unknown document: {0}")]
    UnknownDocument(String),

    #[error("Enumeration pair has no lookup table")]
    MissingLookupTableName,

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

// --- wire shapes ---

#[derive(Debug, Serialize, Deserialize)]
pub struct AtlasMappingEnvelope {
    #[serde(rename = "AtlasMapping")]
    pub atlas_mapping: WireAtlasMapping,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireAtlasMapping {
    #[serde(rename = "jsonType")]
    pub json_type: String,
    #[serde(rename = "fieldMappings")]
    pub field_mappings: WireFieldMappings,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "sourceUri", default, skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
    #[serde(rename = "targetUri", default, skip_serializing_if = "Option::is_none")]
    pub target_uri: Option<String>,
    #[serde(rename = "lookupTables", default)]
    pub lookup_tables: Option<WireLookupTables>,
    #[serde(default)]
    pub properties: Option<WireProperties>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WireFieldMappings {
    #[serde(rename = "fieldMapping", default)]
    pub field_mapping: Vec<WireFieldMapping>,
}

/// One persisted field pair, discriminated by `jsonType`
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "jsonType")]
pub enum WireFieldMapping {
    #[serde(rename = "com.mediadriver.atlas.v2.MapFieldMapping")]
    Map {
        #[serde(rename = "inputField")]
        input_field: WireMappedField,
        #[serde(rename = "outputField")]
        output_field: WireMappedField,
    },
    #[serde(rename = "com.mediadriver.atlas.v2.SeparateFieldMapping")]
    Separate {
        #[serde(rename = "inputField")]
        input_field: WireMappedField,
        #[serde(rename = "outputFields")]
        output_fields: WireMappedFields,
        strategy: TransitionDelimiter,
    },
    #[serde(rename = "com.mediadriver.atlas.v2.LookupFieldMapping")]
    Lookup {
        #[serde(rename = "inputField")]
        input_field: WireMappedField,
        #[serde(rename = "outputField")]
        output_field: WireMappedField,
        #[serde(rename = "lookupTableName")]
        lookup_table_name: String,
    },
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WireMappedFields {
    #[serde(rename = "mappedField", default)]
    pub mapped_field: Vec<WireMappedField>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireMappedField {
    #[serde(rename = "jsonType", default)]
    pub json_type: String,
    /// Verbatim inspection payload with the recomputed `path`
    pub field: Value,
    #[serde(rename = "fieldActions", default, skip_serializing_if = "Option::is_none")]
    pub field_actions: Option<WireFieldActions>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WireFieldActions {
    #[serde(rename = "fieldAction", default)]
    pub field_action: Vec<WireFieldAction>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireFieldAction {
    #[serde(rename = "jsonType", default)]
    pub json_type: String,
    /// Zero-based on the wire; the model's separation index is 1-based
    #[serde(default)]
    pub index: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WireLookupTables {
    #[serde(rename = "lookupTable", default)]
    pub lookup_table: Vec<WireLookupTable>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireLookupTable {
    pub name: String,
    #[serde(rename = "lookupEntryList", default)]
    pub lookup_entry_list: WireLookupEntryList,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WireLookupEntryList {
    #[serde(rename = "lookupEntry", default)]
    pub lookup_entry: Vec<LookupTableEntry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WireProperties {
    #[serde(rename = "property", default)]
    pub property: Vec<PropertyField>,
}

// --- serialization ---

/// Serialize the persisted mappings, lookup tables and property fields.
///
/// Collection-mode mappings are not yet representable on the wire and
/// are skipped. A mapping whose fields cannot serialize is logged and
/// skipped.
pub fn serialize_mappings(def: &MappingDefinition, docs: &DocumentSet) -> AtlasMappingEnvelope {
    let mut wire_mappings = Vec::new();
    for mapping in &def.mappings {
        if mapping.is_collection_mode(docs) {
            debug!(mapping = %mapping.id, "Skipping collection-mode mapping");
            continue;
        }
        match serialize_mapping(mapping, docs) {
            Ok(serialized) => wire_mappings.extend(serialized),
            Err(err) => {
                warn!(mapping = %mapping.id, error = %err, "Couldn't serialize mapping, skipping");
            }
        }
    }

    AtlasMappingEnvelope {
        atlas_mapping: WireAtlasMapping {
            json_type: ATLAS_MAPPING_JSON_TYPE.to_string(),
            field_mappings: WireFieldMappings {
                field_mapping: wire_mappings,
            },
            name: def.name.clone(),
            source_uri: docs.docs(true).first().and_then(|doc| doc.uri.clone()),
            target_uri: docs.docs(false).first().and_then(|doc| doc.uri.clone()),
            lookup_tables: Some(serialize_lookup_tables(def)),
            properties: Some(WireProperties {
                property: docs.property_fields.clone(),
            }),
        },
    }
}

fn serialize_mapping(
    mapping: &Mapping,
    docs: &DocumentSet,
) -> Result<Vec<WireFieldMapping>, SerializeError> {
    let mut serialized = Vec::new();
    for pair in &mapping.field_mappings {
        let mut inputs = serialize_fields(pair, true, docs)?;
        let mut outputs = serialize_fields(pair, false, docs)?;
        // pairs missing a side are not persisted
        if inputs.is_empty() || outputs.is_empty() {
            continue;
        }
        let wire = match pair.transition.mode {
            TransitionMode::Separate => WireFieldMapping::Separate {
                input_field: inputs.swap_remove(0),
                output_fields: WireMappedFields {
                    mapped_field: outputs,
                },
                strategy: pair.transition.delimiter,
            },
            TransitionMode::Enum => WireFieldMapping::Lookup {
                input_field: inputs.swap_remove(0),
                output_field: outputs.swap_remove(0),
                lookup_table_name: pair
                    .transition
                    .lookup_table_name
                    .clone()
                    .ok_or(SerializeError::MissingLookupTableName)?,
            },
            TransitionMode::Map => WireFieldMapping::Map {
                input_field: inputs.swap_remove(0),
                output_field: outputs.swap_remove(0),
            },
        };
        serialized.push(wire);
    }
    Ok(serialized)
}

fn serialize_fields(
    pair: &FieldMappingPair,
    is_source: bool,
    docs: &DocumentSet,
) -> Result<Vec<WireMappedField>, SerializeError> {
    let include_indexes = pair.transition.is_separate_mode() && !is_source;
    let mut fields = Vec::new();
    for mapped_field in pair.mapped_fields(is_source) {
        let (doc_id, key) = match &mapped_field.reference {
            // the none placeholder is never persisted
            FieldReference::Empty => continue,
            FieldReference::Unresolved(path) => {
                return Err(SerializeError::UnresolvedField(path.clone()));
            }
            FieldReference::Resolved { doc, field } => (doc, *field),
        };
        let doc = docs
            .document(doc_id)
            .ok_or_else(|| SerializeError::UnknownDocument(doc_id.to_string()))?;

        let field_actions = if include_indexes {
            let index = mapped_field.separator_index().unwrap_or(1);
            Some(WireFieldActions {
                field_action: vec![WireFieldAction {
                    json_type: MAP_ACTION_JSON_TYPE.to_string(),
                    index: index.saturating_sub(1),
                }],
            })
        } else {
            None
        };

        fields.push(WireMappedField {
            json_type: MAPPED_FIELD_JSON_TYPE.to_string(),
            field: doc.field(key).service_object.clone(),
            field_actions,
        });
    }
    Ok(fields)
}

fn serialize_lookup_tables(def: &MappingDefinition) -> WireLookupTables {
    WireLookupTables {
        lookup_table: def
            .tables
            .tables()
            .into_iter()
            .map(|table| WireLookupTable {
                name: table.name.clone(),
                lookup_entry_list: WireLookupEntryList {
                    lookup_entry: table.entries.clone(),
                },
            })
            .collect(),
    }
}

// --- deserialization ---

/// Merge one mapping file into the definition and document set.
///
/// Field references come out unresolved; run the reconcile pass once
/// the documents have loaded. Tables arrive without identifiers.
/// A non-empty file name replaces the definition's.
pub fn deserialize_into(
    json: &Value,
    def: &mut MappingDefinition,
    docs: &mut DocumentSet,
) -> Result<(), SerializeError> {
    let envelope: AtlasMappingEnvelope = serde_json::from_value(json.clone())?;
    let wire = envelope.atlas_mapping;

    if !wire.name.is_empty() {
        def.name = wire.name;
    }

    for wire_mapping in wire.field_mappings.field_mapping {
        let id = def.allocate_mapping_id();
        def.mappings.push(deserialize_mapping(wire_mapping, id)?);
    }

    for wire_table in wire.lookup_tables.unwrap_or_default().lookup_table {
        let mut table = LookupTable::new(wire_table.name);
        table.entries = wire_table.lookup_entry_list.lookup_entry;
        debug!(table = %table, "Parsed lookup table");
        def.tables.add(table);
    }

    for property in wire.properties.unwrap_or_default().property {
        docs.add_property_field(property);
    }
    Ok(())
}

fn deserialize_mapping(wire: WireFieldMapping, id: String) -> Result<Mapping, SerializeError> {
    let mut mapping = Mapping::new(id);
    let pair = &mut mapping.field_mappings[0];
    match wire {
        WireFieldMapping::Map {
            input_field,
            output_field,
        } => {
            pair.transition.mode = TransitionMode::Map;
            pair.source_fields = vec![MappedField::unresolved(&wire_field_path(&input_field)?)];
            pair.target_fields = vec![MappedField::unresolved(&wire_field_path(&output_field)?)];
        }
        WireFieldMapping::Separate {
            input_field,
            output_fields,
            strategy,
        } => {
            pair.transition.mode = TransitionMode::Separate;
            pair.transition.delimiter = strategy;
            pair.source_fields = vec![MappedField::unresolved(&wire_field_path(&input_field)?)];
            pair.target_fields = Vec::new();
            for output in output_fields.mapped_field {
                let mut target = MappedField::unresolved(&wire_field_path(&output)?);
                let index = output
                    .field_actions
                    .as_ref()
                    .and_then(|actions| actions.field_action.first())
                    .map(|action| action.index + 1)
                    .unwrap_or(1);
                target.set_separator_index(index);
                pair.target_fields.push(target);
            }
        }
        WireFieldMapping::Lookup {
            input_field,
            output_field,
            lookup_table_name,
        } => {
            pair.transition.mode = TransitionMode::Enum;
            pair.transition.lookup_table_name = Some(lookup_table_name);
            pair.source_fields = vec![MappedField::unresolved(&wire_field_path(&input_field)?)];
            pair.target_fields = vec![MappedField::unresolved(&wire_field_path(&output_field)?)];
        }
    }
    Ok(mapping)
}

fn wire_field_path(field: &WireMappedField) -> Result<String, SerializeError> {
    field
        .field
        .get("path")
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| {
            SerializeError::MalformedMappingFile("mapped field has no 'path'".to_string())
        })
}
