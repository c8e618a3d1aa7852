// Intermediate record set file
//
// Written once by the exporter, read once by the importer.
//
// {
//   "schema_version": 1,
//   "exported_at": "2026-01-15T10:00:00Z",
//   "exported_by": "admin@example.com",
//   "source_system": "onprem-exchange",
//   "contacts": [ { "ExternalAddress": "...", "Title": "...", ... } ]
// }
//
// Files written before the version field existed are a bare JSON array of
// contacts; they load as schema version 0.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use contact_migrate_core::{ContactRecord, Provenance};
use serde::{Deserialize, Serialize};

use crate::error::IoError;
use crate::RECORD_SET_SCHEMA_VERSION;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_system: Option<String>,
    pub contacts: Vec<ContactRecord>,
}

impl RecordSet {
    /// A current-version set stamped with the export's provenance.
    pub fn new(contacts: Vec<ContactRecord>, provenance: Option<&Provenance>) -> Self {
        Self {
            schema_version: RECORD_SET_SCHEMA_VERSION,
            exported_at: provenance.map(|p| p.exported_at),
            exported_by: provenance.map(|p| p.exported_by.clone()),
            source_system: provenance.map(|p| p.source_system.clone()),
            contacts,
        }
    }
}

/// A parsed record set plus the positions of records that cannot be
/// migrated. Flagged records stay in `set.contacts` so the importer
/// accounts for every input record.
#[derive(Debug, Clone)]
pub struct LoadedRecordSet {
    pub set: RecordSet,
    pub flagged: Vec<usize>,
    /// Keys that match no record field and were dropped, e.g. a misspelled
    /// attribute name.
    pub unknown_fields: Vec<UnknownField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnknownField {
    pub index: usize,
    pub key: String,
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

pub fn read_record_set(path: &Path) -> Result<LoadedRecordSet, IoError> {
    let text = std::fs::read_to_string(path).map_err(|source| IoError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_record_set(path, &text)
}

/// Parse record set text. `path` is only used in error messages.
pub fn parse_record_set(path: &Path, text: &str) -> Result<LoadedRecordSet, IoError> {
    let parse_err = |source| IoError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let value: serde_json::Value =
        serde_json::from_str(text.trim_start_matches('\u{feff}')).map_err(parse_err)?;

    let unknown_fields = unknown_fields(&value);

    let set = if value.is_array() {
        let contacts: Vec<ContactRecord> = serde_json::from_value(value).map_err(parse_err)?;
        tracing::warn!(
            path = %path.display(),
            "record set has no schema_version; reading as legacy format"
        );
        RecordSet {
            schema_version: 0,
            exported_at: None,
            exported_by: None,
            source_system: None,
            contacts,
        }
    } else {
        // A missing version is left to the typed parse below.
        if let Some(v) = value.get("schema_version") {
            let supported = v
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .is_some_and(|n| n <= RECORD_SET_SCHEMA_VERSION);
            if !supported {
                return Err(IoError::UnsupportedSchema {
                    path: path.to_path_buf(),
                    found: v.to_string(),
                    supported: RECORD_SET_SCHEMA_VERSION,
                });
            }
        }
        serde_json::from_value(value).map_err(parse_err)?
    };

    let flagged: Vec<usize> = set
        .contacts
        .iter()
        .enumerate()
        .filter(|(_, record)| record.validate().is_err())
        .map(|(idx, _)| idx)
        .collect();

    for &idx in &flagged {
        tracing::warn!(
            index = idx,
            contact = set.contacts[idx].label(),
            "record has no external address and cannot be migrated"
        );
    }

    for field in &unknown_fields {
        tracing::warn!(
            index = field.index,
            key = field.key.as_str(),
            "unknown contact field ignored"
        );
    }

    tracing::debug!(
        path = %path.display(),
        schema_version = set.schema_version,
        contacts = set.contacts.len(),
        flagged = flagged.len(),
        unknown_fields = unknown_fields.len(),
        "loaded record set"
    );

    Ok(LoadedRecordSet {
        set,
        flagged,
        unknown_fields,
    })
}

/// Contact keys the typed parse would silently drop.
fn unknown_fields(value: &serde_json::Value) -> Vec<UnknownField> {
    let contacts = match value {
        serde_json::Value::Array(items) => items,
        other => match other["contacts"].as_array() {
            Some(items) => items,
            None => return Vec::new(),
        },
    };
    contacts
        .iter()
        .enumerate()
        .filter_map(|(index, contact)| contact.as_object().map(|obj| (index, obj)))
        .flat_map(|(index, obj)| {
            obj.keys()
                .filter(|key| !ContactRecord::is_known_field(key))
                .map(move |key| UnknownField {
                    index,
                    key: key.clone(),
                })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Write
// ---------------------------------------------------------------------------

pub fn write_record_set(path: &Path, set: &RecordSet) -> Result<(), IoError> {
    let file = File::create(path).map_err(|source| IoError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    to_writer(&mut writer, set)?;
    writer.flush().map_err(|source| IoError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Pretty JSON with a trailing newline.
pub fn to_writer<W: Write>(mut writer: W, set: &RecordSet) -> Result<(), IoError> {
    serde_json::to_writer_pretty(&mut writer, set)?;
    writer.write_all(b"\n").map_err(serde_json::Error::io)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use contact_migrate_core::Attribute;
    use tempfile::tempdir;

    fn provenance() -> Provenance {
        Provenance {
            exported_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
            exported_by: "admin@example.com".into(),
            source_system: "onprem".into(),
        }
    }

    #[test]
    fn write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("contacts.json");

        let mut ada = ContactRecord::new("ada@example.com");
        ada.display_name = Some("Ada Lovelace".into());
        ada.attributes.title = Some("Analyst".into());
        ada.provenance = Some(provenance());
        let set = RecordSet::new(vec![ada.clone()], Some(&provenance()));

        write_record_set(&path, &set).unwrap();
        let loaded = read_record_set(&path).unwrap();

        assert_eq!(loaded.set.schema_version, RECORD_SET_SCHEMA_VERSION);
        assert_eq!(loaded.set.source_system.as_deref(), Some("onprem"));
        assert_eq!(loaded.set.contacts, vec![ada]);
        assert!(loaded.flagged.is_empty());

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"ExternalAddress\": \"ada@example.com\""));
        assert!(!text.contains("\"Notes\""), "absent attributes are omitted");
    }

    #[test]
    fn flags_records_without_external_address() {
        let text = r#"{
            "schema_version": 1,
            "contacts": [
                { "ExternalAddress": "a@x.com" },
                { "DisplayName": "No Address" },
                { "ExternalAddress": "  ", "Title": "CEO" }
            ]
        }"#;
        let loaded = parse_record_set(Path::new("t.json"), text).unwrap();
        assert_eq!(loaded.set.contacts.len(), 3);
        assert_eq!(loaded.flagged, vec![1, 2]);
        assert_eq!(
            loaded.set.contacts[2].attributes.get(Attribute::Title),
            Some("CEO")
        );
    }

    #[test]
    fn legacy_array_loads_as_version_zero() {
        let text = r#"[{ "ExternalAddress": "a@x.com", "City": "Oslo" }]"#;
        let loaded = parse_record_set(Path::new("old.json"), text).unwrap();
        assert_eq!(loaded.set.schema_version, 0);
        assert_eq!(loaded.set.contacts.len(), 1);
    }

    #[test]
    fn rejects_newer_schema() {
        let text = r#"{ "schema_version": 9, "contacts": [] }"#;
        let err = parse_record_set(Path::new("new.json"), text).unwrap_err();
        assert!(matches!(err, IoError::UnsupportedSchema { ref found, .. } if found == "9"));
        assert!(err.to_string().contains("unsupported schema version 9"));
    }

    #[test]
    fn rejects_version_that_overflows_u32() {
        let text = r#"{ "schema_version": 4294967297, "contacts": [] }"#;
        let err = parse_record_set(Path::new("huge.json"), text).unwrap_err();
        assert!(matches!(err, IoError::UnsupportedSchema { ref found, .. } if found == "4294967297"));
    }

    #[test]
    fn rejects_non_integer_version() {
        for version in [r#""1""#, "1.5", "-1", "null"] {
            let text = format!(r#"{{ "schema_version": {version}, "contacts": [] }}"#);
            let err = parse_record_set(Path::new("odd.json"), &text).unwrap_err();
            assert!(matches!(err, IoError::UnsupportedSchema { .. }), "{version}: {err}");
        }
    }

    #[test]
    fn missing_version_is_a_parse_error() {
        let err = parse_record_set(Path::new("t.json"), r#"{ "contacts": [] }"#).unwrap_err();
        assert!(matches!(err, IoError::Parse { .. }));
    }

    #[test]
    fn reports_unknown_contact_fields() {
        let text = r#"{
            "schema_version": 1,
            "contacts": [
                { "ExternalAddress": "a@x.com", "Titel": "CEO", "Title": "CTO" },
                { "ExternalAddress": "b@x.com" }
            ]
        }"#;
        let loaded = parse_record_set(Path::new("t.json"), text).unwrap();
        assert_eq!(
            loaded.unknown_fields,
            vec![UnknownField {
                index: 0,
                key: "Titel".into()
            }]
        );
        assert_eq!(loaded.set.contacts[0].attributes.get(Attribute::Title), Some("CTO"));
        assert!(loaded.flagged.is_empty());

        let legacy = parse_record_set(Path::new("old.json"), r#"[{ "ExternalAddress": "a@x.com", "Cty": "Oslo" }]"#)
            .unwrap();
        assert_eq!(legacy.unknown_fields[0].key, "Cty");
    }

    #[test]
    fn rejects_non_string_attribute() {
        let text = r#"{ "schema_version": 1, "contacts": [{ "ExternalAddress": "a@x.com", "Title": 42 }] }"#;
        let err = parse_record_set(Path::new("bad.json"), text).unwrap_err();
        assert!(matches!(err, IoError::Parse { .. }));
    }

    #[test]
    fn bom_prefixed_file() {
        let text = "\u{feff}{ \"schema_version\": 1, \"contacts\": [] }";
        let loaded = parse_record_set(Path::new("bom.json"), text).unwrap();
        assert!(loaded.set.contacts.is_empty());
    }

    #[test]
    fn missing_file() {
        let dir = tempdir().unwrap();
        let err = read_record_set(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, IoError::Read { .. }));
    }
}
