//! # Document Field Model
//!
//! Turns a flat, recursively-described type inspection result into a
//! navigable, lazily-expanded field tree with stable path identifiers.
//!
//! ## Architecture
//!
//! ```text
//! inspection JSON ──> FieldRecord tree ──> DocumentDefinition (arena)
//!                        │                      │
//!                        └── template cache ────┘ (lazy expansion)
//! ```
//!
//! A [`DocumentDefinition`] owns every [`Field`] of one source or target
//! document by value in an arena; parent links are [`FieldKey`] indices,
//! never a second ownership edge. Complex-typed fields start with empty
//! children and are stamped out on demand from a per-class template
//! cached during the initial build.

pub mod document;
pub mod document_set;
pub mod error;
pub mod field;
pub mod id_generator;
pub mod inspection;

pub use document::DocumentDefinition;
pub use document_set::{DocumentSet, PropertyField};
pub use error::{DocumentError, DocumentResult};
pub use field::{EnumValue, Field, FieldKey, FieldStatus, FieldType, NONE_FIELD_PATH};
pub use id_generator::{DocumentId, IdGenerator};
pub use inspection::{parse_inspection, FieldRecord, InspectionResult};
