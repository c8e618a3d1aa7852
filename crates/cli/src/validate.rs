//! `cmig validate`: check a record set without touching any directory.

use std::path::PathBuf;

use contact_migrate_io::{read_record_set, UnknownField};
use serde::Serialize;

use crate::exit_codes;
use crate::CliError;

#[derive(Debug, Serialize)]
struct ValidateOutput {
    file: String,
    schema_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_system: Option<String>,
    contacts: usize,
    /// Indexes of records that have no external address.
    missing_external_address: Vec<usize>,
    /// Keys that were ignored because they match no contact field.
    unknown_fields: Vec<UnknownField>,
}

pub fn cmd_validate(file: PathBuf, json: bool) -> Result<(), CliError> {
    let loaded = read_record_set(&file).map_err(exit_codes::read_error)?;
    let set = &loaded.set;

    let output = ValidateOutput {
        file: file.display().to_string(),
        schema_version: set.schema_version,
        source_system: set.source_system.clone(),
        contacts: set.contacts.len(),
        missing_external_address: loaded.flagged.clone(),
        unknown_fields: loaded.unknown_fields.clone(),
    };

    if json {
        let json_str = serde_json::to_string_pretty(&output).map_err(|e| {
            CliError::new(exit_codes::EXIT_ERROR, format!("JSON serialization error: {e}"))
        })?;
        println!("{json_str}");
        return Ok(());
    }

    eprintln!(
        "{}: schema v{}, {} contacts, {} without external address, {} unknown fields",
        output.file,
        output.schema_version,
        output.contacts,
        output.missing_external_address.len(),
        output.unknown_fields.len(),
    );
    for &index in &loaded.flagged {
        if let Some(record) = set.contacts.get(index) {
            eprintln!("  #{index} {} has no external address", record.label());
        }
    }
    for field in &output.unknown_fields {
        eprintln!("  #{} unknown field '{}' ignored", field.index, field.key);
    }
    Ok(())
}
