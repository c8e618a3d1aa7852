//! Snapshot-backed directory: a JSON array of contacts loaded into memory
//! and written back after a non-dry run.

use std::path::{Path, PathBuf};

use contact_migrate_io::snapshot::{read_snapshot, write_snapshot};
use contact_migrate_io::IoError;
use contact_migrate_recon::MemoryDirectory;

pub struct SnapshotDirectory {
    path: PathBuf,
    directory: MemoryDirectory,
}

impl SnapshotDirectory {
    /// A missing file is an empty directory.
    pub fn load(path: &Path) -> Result<Self, IoError> {
        let contacts = read_snapshot(path)?;
        tracing::debug!(path = %path.display(), contacts = contacts.len(), "snapshot loaded");
        Ok(Self {
            path: path.to_path_buf(),
            directory: MemoryDirectory::from_records(contacts),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn directory(&self) -> &MemoryDirectory {
        &self.directory
    }

    pub fn directory_mut(&mut self) -> &mut MemoryDirectory {
        &mut self.directory
    }

    /// Write every contact back to the snapshot file.
    pub fn save(self) -> Result<usize, IoError> {
        let contacts = self.directory.into_records();
        write_snapshot(&self.path, &contacts)?;
        tracing::debug!(path = %self.path.display(), contacts = contacts.len(), "snapshot saved");
        Ok(contacts.len())
    }
}
