//! Fetcher traits decoupling startup from any concrete transport

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Service request failed: {0}")]
    Service(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

/// Fetches class inspections (and the class path they may need)
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Resolve the runtime class path from a project build descriptor
    async fn fetch_class_path(&self, pom_payload: &str) -> Result<String, FetchError>;

    /// Fetch the class inspection JSON for one document identifier
    async fn fetch_document(
        &self,
        identifier: &str,
        class_path: Option<&str>,
    ) -> Result<Value, FetchError>;
}

/// Fetches stored mapping files
#[async_trait]
pub trait MappingFetcher: Send + Sync {
    /// Names of stored mapping files matching the filter prefix
    async fn find_mapping_files(&self, filter: &str) -> Result<Vec<String>, FetchError>;

    /// Fetch one mapping file as its AtlasMapping JSON envelope
    async fn fetch_mapping(&self, name: &str) -> Result<Value, FetchError>;
}
