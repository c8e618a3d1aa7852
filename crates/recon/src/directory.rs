//! Directory adapter seams.
//!
//! The engine and exporter only see these traits. Authentication, paging,
//! transport and timeouts belong to the implementations.

use contact_migrate_core::{ContactAttributes, ContactRecord, Identity};
use thiserror::Error;

use crate::payload::AttributePayload;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// No object matched. Lookups treat this as "no match", not a failure.
    #[error("not found")]
    NotFound,

    /// The directory rejected the request (bad value, duplicate, ...).
    #[error("rejected by directory: {0}")]
    Validation(String),

    /// Transport or upstream failure for this one request.
    #[error("connection error: {0}")]
    Connection(String),

    /// The session is gone (expired, revoked, logged out).
    #[error("session lost: {0}")]
    SessionLost(String),
}

impl DirectoryError {
    pub fn is_session_lost(&self) -> bool {
        matches!(self, Self::SessionLost(_))
    }
}

/// Lazily produced contact handles. Finite, not restartable mid-stream.
pub type ContactHandles<'a, H> = Box<dyn Iterator<Item = Result<H, DirectoryError>> + 'a>;

/// Where contacts are exported from.
pub trait SourceDirectory {
    type Handle: std::fmt::Debug;

    fn list_all_contacts(&self) -> Result<ContactHandles<'_, Self::Handle>, DirectoryError>;

    /// Full attribute set for one handle. Provenance is left unset.
    fn contact_details(&self, handle: &Self::Handle) -> Result<ContactRecord, DirectoryError>;
}

/// Where contacts are reconciled into. Keyed by external address.
pub trait DestinationDirectory {
    type Handle: std::fmt::Debug;

    fn find_by_external_address(
        &mut self,
        address: &str,
    ) -> Result<Option<Self::Handle>, DirectoryError>;

    fn mutable_attributes(
        &mut self,
        handle: &Self::Handle,
    ) -> Result<ContactAttributes, DirectoryError>;

    fn create(
        &mut self,
        identity: &Identity,
        attributes: &AttributePayload,
    ) -> Result<Self::Handle, DirectoryError>;

    fn update(
        &mut self,
        handle: &Self::Handle,
        changes: &AttributePayload,
    ) -> Result<(), DirectoryError>;
}
