use fieldmapper_document::DocumentId;
use thiserror::Error;

pub type MappingResult<T> = Result<T, MappingError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    #[error("Unknown document: {0}")]
    UnknownDocument(DocumentId),

    #[error("Unknown mapping: {0}")]
    UnknownMapping(String),

    #[error("No active mapping")]
    NoActiveMapping,
}
