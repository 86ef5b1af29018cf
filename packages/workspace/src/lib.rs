//! # Workspace
//!
//! Session startup orchestration: fetches class inspections and stored
//! mapping files through pluggable fetchers, builds the document set
//! and mapping session, and reconciles them into a ready workspace.
//!
//! ```text
//! InitConfig ──> Initializer ──┬─ class path (budgeted)
//!                              ├─ inspections (concurrent, errors settle)
//!                              ├─ mapping files ("UI" prefix)
//!                              └─ reconcile ──> Workspace { docs, session }
//! ```
//!
//! Everything runs on the caller's task; concurrency is fan-out over
//! I/O, never shared mutable state.

pub mod fetch;
pub mod init;

pub use fetch::{DocumentFetcher, FetchError, MappingFetcher};
pub use init::{InitConfig, Initializer, Workspace, WorkspaceError};
