//! `contact-migrate-core`: the contact record model shared by the export
//! and import pipelines.

pub mod attribute;
pub mod error;
pub mod record;

pub use attribute::{normalize, Attribute, AttributeGroup, ContactAttributes};
pub use error::RecordError;
pub use record::{ContactRecord, Identity, Provenance};
