// File I/O operations

pub mod error;
pub mod record_set;
pub mod snapshot;

pub use error::IoError;
pub use record_set::{read_record_set, write_record_set, LoadedRecordSet, RecordSet, UnknownField};

/// Record set format version.
/// Increment when the schema changes in a way that old readers can't handle.
pub const RECORD_SET_SCHEMA_VERSION: u32 = 1;
