use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier for one document slot within a session.
///
/// Derived from the document's class identifier, so reloading the same
/// class yields the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn from_identifier(identifier: &str) -> Self {
        let mut hasher = Hasher::new();
        if !identifier.starts_with("doc://") {
            hasher.update(b"doc://");
        }
        hasher.update(identifier.as_bytes());
        DocumentId(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hands out session-unique field uuids: the owning document's id as a
/// seed plus a sequential counter
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: DocumentId,
    counter: u32,
}

impl IdGenerator {
    pub fn new(identifier: &str) -> Self {
        Self {
            seed: DocumentId::from_identifier(identifier),
            counter: 0,
        }
    }

    pub fn next_id(&mut self) -> String {
        self.counter += 1;
        format!("{}-{}", self.seed, self.counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_identifier_yields_same_document_id() {
        assert_eq!(
            DocumentId::from_identifier("com.example.Contact"),
            DocumentId::from_identifier("com.example.Contact")
        );
        assert_ne!(
            DocumentId::from_identifier("com.example.Contact"),
            DocumentId::from_identifier("com.example.Order")
        );
    }

    #[test]
    fn test_uuids_carry_the_document_seed_and_a_counter() {
        let mut ids = IdGenerator::new("com.example.Contact");
        let doc_id = DocumentId::from_identifier("com.example.Contact");
        assert_eq!(ids.next_id(), format!("{}-1", doc_id));
        assert_eq!(ids.next_id(), format!("{}-2", doc_id));
    }
}
