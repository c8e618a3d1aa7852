//! `cmig import`: reconcile a record set into the destination directory.

use std::path::PathBuf;

use contact_migrate_config::{EndpointKind, MigrateConfig};
use contact_migrate_io::read_record_set;
use contact_migrate_recon::model::{Outcome, ReconcileOptions};
use contact_migrate_recon::{run, ImportReport};

use crate::directory::{self, HttpDestination, SnapshotDirectory};
use crate::exit_codes::{self, EXIT_ERROR, EXIT_IMPORT_RECORD_FAILURES};
use crate::export::snapshot_path;
use crate::CliError;

pub struct ImportArgs {
    pub file: PathBuf,
    pub config: PathBuf,
    pub dry_run: bool,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub fail_on_errors: bool,
    pub token: Option<String>,
}

pub fn cmd_import(args: ImportArgs) -> Result<(), CliError> {
    let loaded = read_record_set(&args.file).map_err(exit_codes::read_error)?;
    if !loaded.flagged.is_empty() {
        tracing::warn!(
            records = loaded.flagged.len(),
            "records without an external address will be reported as failed"
        );
    }
    if !loaded.unknown_fields.is_empty() {
        tracing::warn!(
            fields = loaded.unknown_fields.len(),
            "unknown contact fields will not be imported; run `cmig validate` to list them"
        );
    }

    let config = MigrateConfig::load(&args.config).map_err(exit_codes::config_error)?;
    let endpoint = config.destination().map_err(exit_codes::config_error)?;
    let options = ReconcileOptions {
        dry_run: args.dry_run || config.import.dry_run,
    };
    let fail_on_errors = args.fail_on_errors || config.import.fail_on_errors;
    let contacts = &loaded.set.contacts;

    tracing::info!(
        config = config.name.as_str(),
        destination = endpoint.system_label().as_str(),
        kind = %endpoint.kind,
        records = contacts.len(),
        dry_run = options.dry_run,
        "import started"
    );

    let report = match endpoint.kind {
        EndpointKind::Snapshot => {
            let path = snapshot_path(endpoint, "destination")?;
            let mut snapshot = SnapshotDirectory::load(path).map_err(exit_codes::read_error)?;
            let report = run(snapshot.directory_mut(), contacts, options)
                .map_err(exit_codes::recon_error)?;
            if !options.dry_run {
                let path = snapshot.path().to_path_buf();
                let saved = snapshot.save().map_err(exit_codes::write_error)?;
                tracing::info!(path = %path.display(), contacts = saved, "destination snapshot saved");
            }
            report
        }
        EndpointKind::Http => {
            let session = directory::open_session("destination", endpoint, args.token.as_deref())?;
            let mut destination = HttpDestination::new(&session);
            run(&mut destination, contacts, options).map_err(exit_codes::recon_error)?
        }
    };

    emit_report(&report, args.json, args.output.as_ref())?;
    print_summary(&report);

    if fail_on_errors && report.summary.has_failures() {
        return Err(CliError::new(
            EXIT_IMPORT_RECORD_FAILURES,
            format!("{} record(s) failed", report.summary.failed),
        )
        .with_hint("rerun with --json or --output for per-record errors"));
    }
    Ok(())
}

fn emit_report(
    report: &ImportReport,
    json_output: bool,
    output_file: Option<&PathBuf>,
) -> Result<(), CliError> {
    if !json_output && output_file.is_none() {
        return Ok(());
    }

    let json_str = serde_json::to_string_pretty(report)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    if let Some(path) = output_file {
        std::fs::write(path, &json_str).map_err(|e| {
            CliError::new(
                exit_codes::EXIT_FILE_WRITE,
                format!("cannot write {}: {e}", path.display()),
            )
        })?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }
    Ok(())
}

/// Human summary to stderr
fn print_summary(report: &ImportReport) {
    let s = &report.summary;
    if s.dry_run {
        eprintln!(
            "import (dry run): {} records: would create {}, would update {}, {} skipped, {} failed",
            s.total,
            s.would_create,
            s.would_update,
            s.skipped - s.would_create - s.would_update,
            s.failed,
        );
    } else {
        eprintln!(
            "import: {} records: {} created, {} updated, {} skipped, {} failed",
            s.total, s.created, s.updated, s.skipped, s.failed,
        );
    }

    for entry in &report.records {
        if let Outcome::Failed { stage, error } = &entry.outcome {
            eprintln!("  failed #{} {} ({stage}): {error}", entry.index, entry.contact);
        }
    }
    if s.partial_writes > 0 {
        eprintln!(
            "warning: {} contact(s) were created but not fully populated",
            s.partial_writes
        );
    }
}
