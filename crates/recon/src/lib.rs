//! `contact-migrate-recon`: contact reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded records and a directory adapter,
//! returns classified results. No CLI or file IO dependencies.

pub mod compare;
pub mod directory;
pub mod engine;
pub mod error;
pub mod export;
pub mod memory;
pub mod model;
pub mod payload;
pub mod summary;

pub use compare::{compare, FieldDiff};
pub use directory::{DestinationDirectory, DirectoryError, SourceDirectory};
pub use engine::{run, Reconciler};
pub use error::ReconError;
pub use export::{export_contacts, ExportResult, ExportSummary};
pub use memory::MemoryDirectory;
pub use model::{ImportReport, ImportSummary, Outcome, ReconcileOptions, RecordReport};
pub use payload::AttributePayload;
