//! Enumeration lookup tables: value-to-value translation for `ENUM` pairs

use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of a lookup table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupTableEntry {
    #[serde(rename = "sourceValue")]
    pub source_value: String,
    #[serde(rename = "sourceType", skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(rename = "targetValue")]
    pub target_value: String,
    #[serde(rename = "targetType", skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
}

/// Value translation table shared by every `ENUM` pair that maps the
/// same (source class, target class) combination.
///
/// Identifiers are the enumeration class names. Tables deserialized
/// from a mapping file arrive without identifiers; the reconcile pass
/// backfills them from the mappings that reference the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupTable {
    pub name: String,
    pub entries: Vec<LookupTableEntry>,
    pub source_identifier: Option<String>,
    pub target_identifier: Option<String>,
}

impl LookupTable {
    pub fn new(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    /// Identity key, present once both identifiers are known
    pub fn source_target_key(&self) -> Option<String> {
        match (&self.source_identifier, &self.target_identifier) {
            (Some(source), Some(target)) => Some(format!("{}:{}", source, target)),
            _ => None,
        }
    }
}

impl fmt::Display for LookupTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} => {}], {} entries",
            self.name,
            self.source_identifier.as_deref().unwrap_or("?"),
            self.target_identifier.as_deref().unwrap_or("?"),
            self.entries.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_needs_both_identifiers() {
        let mut table = LookupTable::new("table.1".to_string());
        assert_eq!(table.source_target_key(), None);
        table.source_identifier = Some("com.example.Status".to_string());
        assert_eq!(table.source_target_key(), None);
        table.target_identifier = Some("com.example.Priority".to_string());
        assert_eq!(
            table.source_target_key().as_deref(),
            Some("com.example.Status:com.example.Priority")
        );
    }
}
