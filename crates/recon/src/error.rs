use thiserror::Error;

use crate::directory::DirectoryError;

/// Failures that abort a whole run. Per-record failures never surface here;
/// they are classified as `Outcome::Failed` and the run continues.
#[derive(Debug, Error)]
pub enum ReconError {
    /// The directory session was severed; nothing after this can succeed.
    #[error("session lost while processing '{contact}': {message}")]
    SessionLost { contact: String, message: String },

    /// The source could not list its contacts.
    #[error("cannot enumerate source contacts: {0}")]
    Enumeration(#[source] DirectoryError),
}
