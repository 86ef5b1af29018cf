//! Parsing of the inbound class inspection contract.
//!
//! The inspection service reports one recursive record per field. Fields
//! with `NOT_FOUND` or `BLACK_LIST` status are dropped here; everything
//! else keeps its raw JSON record attached so the serializer can emit it
//! verbatim later.

use crate::error::{DocumentError, DocumentResult};
use crate::field::{EnumValue, FieldStatus, FieldType};
use serde_json::Value;
use tracing::{debug, error};

/// Parsed inspection result for one document
#[derive(Debug, Clone)]
pub struct InspectionResult {
    pub class_name: String,
    pub uri: Option<String>,
    pub status: FieldStatus,
    pub fields: Vec<FieldRecord>,
}

/// One parsed field record plus its verbatim source JSON
#[derive(Debug, Clone)]
pub struct FieldRecord {
    pub name: String,
    pub class_name: String,
    pub ty: FieldType,
    pub status: FieldStatus,
    pub enumeration: bool,
    pub enum_values: Vec<EnumValue>,
    pub collection: bool,
    pub children: Vec<FieldRecord>,
    pub raw: Value,
}

/// Parse a class inspection response into field records.
///
/// Accepts either the full `ClassInspectionResponse` envelope or the
/// inner `javaClass` object directly.
pub fn parse_inspection(value: &Value) -> DocumentResult<InspectionResult> {
    let class = value
        .get("ClassInspectionResponse")
        .unwrap_or(value)
        .get("javaClass")
        .ok_or_else(|| {
            DocumentError::MalformedInspection("missing 'javaClass' object".to_string())
        })?;

    let class_name = class
        .get("className")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            DocumentError::MalformedInspection("class record has no 'className'".to_string())
        })?
        .to_string();

    let status = class
        .get("status")
        .and_then(Value::as_str)
        .map(FieldStatus::parse)
        .unwrap_or(FieldStatus::Supported);

    if status == FieldStatus::NotFound {
        return Err(DocumentError::DocumentNotFound(class_name));
    }

    let uri = class
        .get("uri")
        .and_then(Value::as_str)
        .map(ToString::to_string);

    let mut fields = Vec::new();
    for record in field_list(class) {
        if let Some(parsed) = parse_field(record, &class_name) {
            fields.push(parsed);
        }
    }

    Ok(InspectionResult {
        class_name,
        uri,
        status,
        fields,
    })
}

/// Child field records of a class or field record (`javaFields.javaField`)
fn field_list(value: &Value) -> impl Iterator<Item = &Value> {
    value
        .get("javaFields")
        .and_then(|f| f.get("javaField"))
        .and_then(Value::as_array)
        .map(|list| list.iter())
        .into_iter()
        .flatten()
}

/// Parse one field record, dropping `NOT_FOUND` and `BLACK_LIST` entries.
fn parse_field(value: &Value, document_name: &str) -> Option<FieldRecord> {
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let class_name = value
        .get("className")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let status = value
        .get("status")
        .and_then(Value::as_str)
        .map(FieldStatus::parse)
        .unwrap_or(FieldStatus::Supported);
    match status {
        FieldStatus::NotFound => {
            error!(
                field = %name,
                class = %class_name,
                document = %document_name,
                "Filtering missing field"
            );
            return None;
        }
        FieldStatus::BlackList => {
            debug!(
                field = %name,
                class = %class_name,
                document = %document_name,
                "Filtering black listed field"
            );
            return None;
        }
        _ => {}
    }

    let ty = value
        .get("type")
        .and_then(Value::as_str)
        .map(FieldType::parse)
        .unwrap_or(FieldType::Unsupported);

    let enumeration = value
        .get("enumeration")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let mut enum_values = Vec::new();
    if enumeration {
        let entries = value
            .get("javaEnumFields")
            .and_then(|f| f.get("javaEnumField"))
            .and_then(Value::as_array);
        for entry in entries.into_iter().flatten() {
            enum_values.push(EnumValue {
                name: entry
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                ordinal: entry.get("ordinal").and_then(Value::as_i64).unwrap_or(0),
            });
        }
    }

    let collection = value
        .get("collectionType")
        .and_then(Value::as_str)
        .map(|t| t != "NONE")
        .unwrap_or(false);

    let mut children = Vec::new();
    for child in field_list(value) {
        if let Some(parsed) = parse_field(child, document_name) {
            children.push(parsed);
        }
    }

    Some(FieldRecord {
        name,
        class_name,
        ty,
        status,
        enumeration,
        enum_values,
        collection,
        children,
        raw: value.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_drops_not_found_and_black_list() {
        let doc = json!({
            "ClassInspectionResponse": {
                "javaClass": {
                    "className": "com.example.Contact",
                    "uri": "atlas:java?className=com.example.Contact",
                    "javaFields": { "javaField": [
                        { "name": "firstName", "type": "STRING", "className": "java.lang.String", "status": "SUPPORTED" },
                        { "name": "ghost", "type": "STRING", "className": "java.lang.String", "status": "NOT_FOUND" },
                        { "name": "secret", "type": "STRING", "className": "java.lang.String", "status": "BLACK_LIST" }
                    ]}
                }
            }
        });

        let result = parse_inspection(&doc).unwrap();
        assert_eq!(result.class_name, "com.example.Contact");
        assert_eq!(result.fields.len(), 1);
        assert_eq!(result.fields[0].name, "firstName");
        assert_eq!(result.fields[0].ty, FieldType::String);
    }

    #[test]
    fn test_parse_enum_values_and_collection_marker() {
        let doc = json!({
            "javaClass": {
                "className": "com.example.Order",
                "javaFields": { "javaField": [
                    {
                        "name": "status", "type": "COMPLEX",
                        "className": "com.example.Status",
                        "status": "SUPPORTED", "enumeration": true,
                        "javaEnumFields": { "javaEnumField": [
                            { "name": "OPEN", "ordinal": 0 },
                            { "name": "CLOSED", "ordinal": 1 }
                        ]}
                    },
                    {
                        "name": "lines", "type": "COMPLEX",
                        "className": "com.example.Line",
                        "status": "SUPPORTED", "collectionType": "LIST"
                    }
                ]}
            }
        });

        let result = parse_inspection(&doc).unwrap();
        assert_eq!(result.fields[0].enum_values.len(), 2);
        assert_eq!(result.fields[0].enum_values[1].name, "CLOSED");
        assert!(result.fields[1].collection);
    }

    #[test]
    fn test_parse_not_found_document_is_an_error() {
        let doc = json!({
            "javaClass": { "className": "com.example.Missing", "status": "NOT_FOUND" }
        });
        assert!(matches!(
            parse_inspection(&doc),
            Err(DocumentError::DocumentNotFound(_))
        ));
    }
}
