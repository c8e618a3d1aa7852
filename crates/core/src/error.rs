use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    /// The record has no usable join key and cannot be migrated.
    #[error("record '{label}' has no external address")]
    MissingExternalAddress { label: String },
}
