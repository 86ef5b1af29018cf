//! Startup sequence: class path, inspections, mapping files, reconcile

use crate::fetch::{DocumentFetcher, FetchError, MappingFetcher};
use fieldmapper_document::{DocumentDefinition, DocumentSet};
use fieldmapper_mapping::{
    deserialize_into, detect_table_identifiers, refresh_documents, remove_stale_mappings,
    resolve_field_references, serialize_mappings, MappingSession, SerializeError,
};
use futures::future::join_all;
use std::time::Duration;
use tracing::{error, info, warn};

const DEFAULT_CLASS_PATH_BUDGET: Duration = Duration::from_secs(30);
const DEFAULT_MAPPING_FILTER: &str = "UI";

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// What to load at startup
#[derive(Debug, Clone)]
pub struct InitConfig {
    pub source_identifiers: Vec<String>,
    pub target_identifiers: Vec<String>,
    /// Project build descriptor; used to resolve the class path when
    /// one isn't given directly
    pub pom_payload: Option<String>,
    pub class_path: Option<String>,
    /// Explicit mapping files to load; empty means discover by filter
    pub mapping_files: Vec<String>,
    /// Prefix of stored mapping files to discover
    pub mapping_filter: String,
    /// Hard budget for class path resolution
    pub class_path_budget: Duration,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            source_identifiers: Vec::new(),
            target_identifiers: Vec::new(),
            pom_payload: None,
            class_path: None,
            mapping_files: Vec::new(),
            mapping_filter: DEFAULT_MAPPING_FILTER.to_string(),
            class_path_budget: DEFAULT_CLASS_PATH_BUDGET,
        }
    }
}

/// A fully initialized session: loaded documents plus the mapping
/// session driving them
#[derive(Debug)]
pub struct Workspace {
    pub docs: DocumentSet,
    pub session: MappingSession,
}

impl Workspace {
    /// Current persisted mappings as the AtlasMapping JSON envelope
    pub fn export_mappings(&self) -> Result<serde_json::Value, WorkspaceError> {
        Ok(serde_json::to_value(serialize_mappings(
            &self.session.mappings,
            &self.docs,
        ))?)
    }
}

/// Drives startup against a pair of fetchers
pub struct Initializer<D, M> {
    documents: D,
    mappings: M,
}

impl<D: DocumentFetcher, M: MappingFetcher> Initializer<D, M> {
    pub fn new(documents: D, mappings: M) -> Self {
        Self { documents, mappings }
    }

    /// Load everything the config names and reconcile the result.
    ///
    /// Document fetch or parse failures mark the document errored and
    /// never block the rest of the session: an errored document counts
    /// as settled. Mapping files that fail to fetch or parse are
    /// skipped with a warning, and a failed discovery yields an empty
    /// mapping graph.
    pub async fn initialize(&self, config: &InitConfig) -> Result<Workspace, WorkspaceError> {
        let class_path = match (&config.class_path, &config.pom_payload) {
            (Some(class_path), _) => Some(class_path.clone()),
            (None, Some(pom)) => Some(
                self.resolve_class_path(pom, config.class_path_budget)
                    .await?,
            ),
            (None, None) => None,
        };

        let mut docs = DocumentSet::new();
        for identifier in &config.source_identifiers {
            docs.sources.push(DocumentDefinition::new(identifier, true));
        }
        for identifier in &config.target_identifiers {
            docs.targets.push(DocumentDefinition::new(identifier, false));
        }

        let fetches = docs.all_docs().map(|doc| {
            let identifier = doc.fully_qualified_name.clone();
            let class_path = class_path.as_deref();
            async move {
                self.documents
                    .fetch_document(&identifier, class_path)
                    .await
            }
        });
        let results = join_all(fetches).await;

        for (doc, result) in docs.all_docs_mut().zip(results) {
            match result {
                Ok(inspection) => {
                    if let Err(err) = doc.populate_from_inspection(&inspection) {
                        error!(document = %doc.name, error = %err, "Couldn't parse inspection");
                        doc.error_occurred = true;
                    }
                }
                Err(err) => {
                    error!(document = %doc.name, error = %err, "Couldn't fetch inspection");
                    doc.error_occurred = true;
                }
            }
        }

        let mut session = MappingSession::new();
        let names = if config.mapping_files.is_empty() {
            match self
                .mappings
                .find_mapping_files(&config.mapping_filter)
                .await
            {
                Ok(names) => names,
                Err(err) => {
                    // start with an empty graph rather than block the
                    // documents that did load
                    warn!(error = %err, "Couldn't discover stored mapping files");
                    Vec::new()
                }
            }
        } else {
            config.mapping_files.clone()
        };
        let fetched = join_all(
            names
                .iter()
                .map(|name| self.mappings.fetch_mapping(name)),
        )
        .await;
        for (name, result) in names.iter().zip(fetched) {
            match result {
                Ok(json) => {
                    if let Err(err) = deserialize_into(&json, &mut session.mappings, &mut docs) {
                        warn!(file = %name, error = %err, "Skipping malformed mapping file");
                    }
                }
                Err(err) => {
                    warn!(file = %name, error = %err, "Skipping unfetchable mapping file");
                }
            }
        }

        resolve_field_references(&mut session.mappings, &mut docs);
        detect_table_identifiers(&mut session.mappings, &docs);
        remove_stale_mappings(&mut session.mappings, &docs);
        refresh_documents(&session.mappings, &mut docs);

        info!(
            sources = docs.sources.len(),
            targets = docs.targets.len(),
            mappings = session.mappings.mappings.len(),
            loaded = docs.documents_are_loaded(),
            "Initialization complete"
        );
        Ok(Workspace { docs, session })
    }

    async fn resolve_class_path(
        &self,
        pom_payload: &str,
        budget: Duration,
    ) -> Result<String, FetchError> {
        match tokio::time::timeout(budget, self.documents.fetch_class_path(pom_payload)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(budget)),
        }
    }
}
