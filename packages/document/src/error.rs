use thiserror::Error;

pub type DocumentResult<T> = Result<T, DocumentError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    #[error("Malformed inspection document: {0}")]
    MalformedInspection(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Could not resolve parent field '{parent}' while resolving '{requested}'")]
    UnresolvableParent { parent: String, requested: String },

    #[error("No cached template for complex type '{0}'")]
    MissingComplexTypeTemplate(String),
}
