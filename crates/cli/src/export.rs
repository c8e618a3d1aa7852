//! `cmig export`: enumerate the source directory into a record set file.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use contact_migrate_config::{ConfigError, EndpointConfig, EndpointKind, MigrateConfig};
use contact_migrate_core::Provenance;
use contact_migrate_io::record_set::{to_writer, write_record_set, RecordSet};
use contact_migrate_recon::{export_contacts, ExportResult};

use crate::directory::{self, HttpSource, SnapshotDirectory};
use crate::exit_codes;
use crate::CliError;

pub fn cmd_export(
    config_path: PathBuf,
    out: PathBuf,
    token: Option<String>,
) -> Result<(), CliError> {
    let config = MigrateConfig::load(&config_path).map_err(exit_codes::config_error)?;
    let endpoint = config.source().map_err(exit_codes::config_error)?;

    let provenance = Provenance {
        exported_at: Utc::now(),
        exported_by: current_user(),
        source_system: endpoint.system_label(),
    };

    tracing::info!(
        config = config.name.as_str(),
        source = provenance.source_system.as_str(),
        kind = %endpoint.kind,
        "export started"
    );

    let result = export_from(endpoint, &provenance, token.as_deref())?;
    let summary = result.summary.clone();
    let set = RecordSet::new(result.records, Some(&provenance));

    write_output(&out, &set)?;

    eprintln!(
        "export: {} contacts: {} exported, {} rejected (no external address), {} failed",
        summary.total, summary.exported, summary.rejected, summary.failed,
    );
    if out.as_os_str() != "-" {
        eprintln!("wrote {}", out.display());
    }
    Ok(())
}

fn export_from(
    endpoint: &EndpointConfig,
    provenance: &Provenance,
    token: Option<&str>,
) -> Result<ExportResult, CliError> {
    match endpoint.kind {
        EndpointKind::Snapshot => {
            let path = snapshot_path(endpoint, "source")?;
            let snapshot = SnapshotDirectory::load(path).map_err(exit_codes::read_error)?;
            export_contacts(snapshot.directory(), provenance).map_err(exit_codes::recon_error)
        }
        EndpointKind::Http => {
            let session = directory::open_session("source", endpoint, token)?;
            let source = HttpSource::new(&session, endpoint.page_size);
            export_contacts(&source, provenance).map_err(exit_codes::recon_error)
        }
    }
}

/// `-` writes to stdout.
fn write_output(out: &Path, set: &RecordSet) -> Result<(), CliError> {
    if out.as_os_str() == "-" {
        let stdout = io::stdout();
        return to_writer(stdout.lock(), set).map_err(exit_codes::write_error);
    }
    write_record_set(out, set).map_err(exit_codes::write_error)
}

pub(crate) fn snapshot_path<'a>(
    endpoint: &'a EndpointConfig,
    role: &str,
) -> Result<&'a Path, CliError> {
    endpoint.path.as_deref().ok_or_else(|| {
        exit_codes::config_error(ConfigError::Invalid(format!(
            "[{role}] kind = \"snapshot\" requires path"
        )))
    })
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
