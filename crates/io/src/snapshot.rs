// Directory snapshot files
//
// A snapshot is a JSON array of contacts standing in for a live directory:
// offline dry runs, fixtures, and migrations into a file-backed target.

use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;

use contact_migrate_core::ContactRecord;

use crate::error::IoError;

/// Load a snapshot. A missing file is an empty directory.
pub fn read_snapshot(path: &Path) -> Result<Vec<ContactRecord>, IoError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "snapshot not found; starting empty");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(IoError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(text.trim_start_matches('\u{feff}')).map_err(|source| IoError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_snapshot(path: &Path, contacts: &[ContactRecord]) -> Result<(), IoError> {
    let write_err = |source| IoError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, contacts)?;
    writer.write_all(b"\n").map_err(write_err)?;
    writer.flush().map_err(write_err)
}
