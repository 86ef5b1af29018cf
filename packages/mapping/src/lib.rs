//! # Mapping Graph
//!
//! Records which source fields feed which target fields, and how.
//!
//! ## Architecture
//!
//! ```text
//! MappingSession ─ owns ─> MappingDefinition ─ owns ─> Mapping*
//!      │                        │                         │
//!      │                        └─> LookupTableCatalog    └─> FieldMappingPair*
//!      │                                                        ├─ source MappedField*
//!      └─ field_selected / save / select / deselect             ├─ target MappedField*
//!         (mutates documents only through their entry points)   └─ Transition
//! ```
//!
//! A [`MappedField`] holds a [`FieldReference`]: either the `[None]`
//! placeholder, a deferred path parsed from a mapping file, or a live
//! field of a loaded document. The serializer converts the whole graph
//! to/from the AtlasMapping wire JSON; the reconcile module resolves
//! deferred references and prunes mappings gone stale after reloads.

pub mod definition;
pub mod document_state;
pub mod error;
pub mod lookup_table;
pub mod mapping;
pub mod reconcile;
pub mod serializer;
pub mod session;
pub mod transition;

pub use definition::{LookupTableCatalog, MappingDefinition};
pub use document_state::refresh_documents;
pub use error::{MappingError, MappingResult};
pub use lookup_table::{LookupTable, LookupTableEntry};
pub use mapping::{FieldMappingPair, FieldReference, MappedField, Mapping};
pub use reconcile::{
    detect_table_identifiers, initialize_lookup_tables, remove_stale_mappings,
    resolve_field_references,
};
pub use serializer::{deserialize_into, serialize_mappings, SerializeError};
pub use session::{MappingSession, SelectionOutcome};
pub use transition::{FieldAction, Transition, TransitionDelimiter, TransitionMode};
