//! Export pipeline: source directory -> record mapper -> record list.

use contact_migrate_core::{ContactRecord, Provenance};
use serde::Serialize;

use crate::directory::{DirectoryError, SourceDirectory};
use crate::error::ReconError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// Handles enumerated from the source.
    pub total: usize,
    pub exported: usize,
    /// Contacts without an external address. Not written.
    pub rejected: usize,
    /// Handles whose details could not be read.
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct ExportResult {
    pub records: Vec<ContactRecord>,
    pub summary: ExportSummary,
}

/// Enumerate every source contact and map it to a `ContactRecord` stamped
/// with `provenance`, in source order.
///
/// Failing to enumerate is critical. A failed detail read only loses that
/// one contact, unless the session is gone.
pub fn export_contacts<S: SourceDirectory>(
    source: &S,
    provenance: &Provenance,
) -> Result<ExportResult, ReconError> {
    let handles = source
        .list_all_contacts()
        .map_err(ReconError::Enumeration)?;

    let mut records = Vec::new();
    let mut summary = ExportSummary::default();

    for handle in handles {
        let handle = handle.map_err(ReconError::Enumeration)?;
        summary.total += 1;

        let mut record = match source.contact_details(&handle) {
            Ok(record) => record,
            Err(DirectoryError::SessionLost(message)) => {
                return Err(ReconError::SessionLost {
                    contact: format!("{handle:?}"),
                    message,
                });
            }
            Err(e) => {
                tracing::warn!(handle = ?handle, "cannot read contact details: {e}");
                summary.failed += 1;
                continue;
            }
        };

        if let Err(e) = record.validate() {
            tracing::warn!(handle = ?handle, "not exported: {e}");
            summary.rejected += 1;
            continue;
        }

        record.provenance = Some(provenance.clone());
        tracing::debug!(
            external_address = record.external_address().unwrap_or_default(),
            contact = record.label(),
            "exported"
        );
        records.push(record);
        summary.exported += 1;
    }

    tracing::info!(
        total = summary.total,
        exported = summary.exported,
        rejected = summary.rejected,
        failed = summary.failed,
        source_system = provenance.source_system.as_str(),
        "export finished"
    );

    Ok(ExportResult { records, summary })
}
