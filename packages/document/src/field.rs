use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Path of the placeholder field used to keep pair slots non-empty
pub const NONE_FIELD_PATH: &str = "[None]";

/// Type category reported by the inspection service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    String,
    Char,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    Boolean,
    Date,
    Complex,
    #[serde(other)]
    Unsupported,
}

impl FieldType {
    pub fn parse(raw: &str) -> FieldType {
        match raw {
            "STRING" => FieldType::String,
            "CHAR" => FieldType::Char,
            "BYTE" => FieldType::Byte,
            "SHORT" => FieldType::Short,
            "INTEGER" => FieldType::Integer,
            "LONG" => FieldType::Long,
            "FLOAT" => FieldType::Float,
            "DOUBLE" => FieldType::Double,
            "BOOLEAN" => FieldType::Boolean,
            "DATE" => FieldType::Date,
            "COMPLEX" => FieldType::Complex,
            _ => FieldType::Unsupported,
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, FieldType::Complex)
    }
}

/// Inspection status of a field or class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldStatus {
    Supported,
    NotFound,
    BlackList,
    #[serde(other)]
    Unsupported,
}

impl FieldStatus {
    pub fn parse(raw: &str) -> FieldStatus {
        match raw {
            "SUPPORTED" => FieldStatus::Supported,
            "NOT_FOUND" => FieldStatus::NotFound,
            "BLACK_LIST" => FieldStatus::BlackList,
            _ => FieldStatus::Unsupported,
        }
    }
}

/// One value of an enumeration-typed field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub ordinal: i64,
}

/// Arena index of a field within its [`DocumentDefinition`]
///
/// [`DocumentDefinition`]: crate::DocumentDefinition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldKey(pub(crate) usize);

impl FieldKey {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One node of a document's field tree
#[derive(Debug, Clone)]
pub struct Field {
    pub key: FieldKey,
    /// Session-unique id: document seed + sequential counter
    pub uuid: String,
    pub name: String,
    pub class_name: String,
    /// Name with the first letter upper-cased, used for paths and display
    pub display_name: String,
    /// Dotted path, unique within the document, parent-prefixed
    pub path: String,
    pub ty: FieldType,
    pub status: FieldStatus,
    pub enumeration: bool,
    pub enum_values: Vec<EnumValue>,
    pub collection: bool,
    pub depth: usize,
    pub parent: Option<FieldKey>,
    /// Ordered children; empty for complex fields until lazily populated
    pub children: Vec<FieldKey>,
    /// Original inspection record, passed through verbatim on serialization
    pub service_object: Value,

    // selection / mapping state
    pub collapsed: bool,
    pub selected: bool,
    pub part_of_mapping: bool,
    pub part_of_transformation: bool,
    pub has_unmapped_children: bool,
    pub available_for_selection: bool,
    pub selection_exclusion_reason: Option<String>,
}

impl Field {
    /// Terminal fields have no further expandable structure: primitives
    /// and enumerations.
    pub fn is_terminal(&self) -> bool {
        if self.enumeration {
            return true;
        }
        !self.ty.is_complex()
    }
}
