use std::path::PathBuf;

use contact_migrate_core::Attribute;
use contact_migrate_io::record_set::read_record_set;
use contact_migrate_io::snapshot::{read_snapshot, write_snapshot};
use contact_migrate_recon::memory::MemoryDirectory;
use contact_migrate_recon::model::{FailureStage, Outcome, ReconcileOptions, SkipReason};
use contact_migrate_recon::summary::compute_summary;
use contact_migrate_recon::{export_contacts, run, ImportReport};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn destination() -> MemoryDirectory {
    let contacts = read_snapshot(&fixtures_dir().join("destination.json")).unwrap();
    MemoryDirectory::from_records(contacts)
}

fn import(dest: &mut MemoryDirectory, dry_run: bool) -> ImportReport {
    let loaded = read_record_set(&fixtures_dir().join("contacts.json")).unwrap();
    run(dest, &loaded.set.contacts, ReconcileOptions { dry_run }).unwrap()
}

// -------------------------------------------------------------------------
// Import
// -------------------------------------------------------------------------

#[test]
fn fixture_import_classifies_every_record() {
    let loaded = read_record_set(&fixtures_dir().join("contacts.json")).unwrap();
    assert_eq!(loaded.set.contacts.len(), 5);
    assert_eq!(loaded.flagged, vec![3]);

    let mut dest = destination();
    let report = import(&mut dest, false);
    let outcomes: Vec<_> = report.records.iter().map(|r| r.outcome.clone()).collect();

    assert_eq!(outcomes[0], Outcome::Updated);
    assert_eq!(
        outcomes[1],
        Outcome::Skipped {
            reason: SkipReason::NoApplicableChanges
        }
    );
    assert_eq!(outcomes[2], Outcome::Created);
    assert!(matches!(
        outcomes[3],
        Outcome::Failed {
            stage: FailureStage::Validate,
            ..
        }
    ));
    assert_eq!(
        outcomes[4],
        Outcome::Skipped {
            reason: SkipReason::Unchanged
        }
    );

    let s = &report.summary;
    assert_eq!((s.total, s.created, s.updated, s.skipped, s.failed), (5, 1, 1, 2, 1));
    assert!(s.is_balanced());
    assert_eq!(compute_summary(&report.records, false), *s);

    // Effects
    let ada = dest.get("ada@partner.example").unwrap();
    assert_eq!(ada.attributes.get(Attribute::Title), Some("CEO"));
    let grace = dest.get("grace@partner.example").unwrap();
    assert_eq!(grace.attributes.get(Attribute::Notes), Some("Important"));
    let alan = dest.get("alan@partner.example").unwrap();
    assert_eq!(alan.attributes.get(Attribute::CustomAttribute1), Some("bletchley"));
    assert_eq!(alan.alias.as_deref(), Some("alan.turing"));
    assert_eq!(dest.len(), 4);
}

#[test]
fn second_run_is_idempotent() {
    let mut dest = destination();
    import(&mut dest, false);

    let before = dest.calls();
    let report = import(&mut dest, false);
    let after = dest.calls();

    assert_eq!(report.summary.created, 0);
    assert_eq!(report.summary.updated, 0);
    assert_eq!(after.mutations(), before.mutations());
    // Only the unmigratable record still fails
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.skipped, 4);
}

#[test]
fn dry_run_reports_without_writing() {
    let mut dest = destination();
    let report = import(&mut dest, true);

    assert_eq!(dest.calls().mutations(), 0);
    assert_eq!(report.summary.created + report.summary.updated, 0);
    assert_eq!(report.summary.would_create, 1);
    assert_eq!(report.summary.would_update, 1);
    assert_eq!(report.summary.failed, 1);
    assert!(report.summary.is_balanced());
    assert_eq!(
        dest.get("ada@partner.example")
            .unwrap()
            .attributes
            .get(Attribute::Title),
        Some("CTO")
    );
}

#[test]
fn report_serializes_to_json() {
    let mut dest = destination();
    let report = import(&mut dest, false);
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["summary"]["created"], 1);
    assert_eq!(json["records"][0]["outcome"]["status"], "updated");
    assert_eq!(json["records"][0]["changes"][0]["attribute"], "Title");
    assert_eq!(json["records"][0]["changes"][0]["group"], "personal");
    assert_eq!(json["records"][1]["outcome"]["reason"], "no_applicable_changes");
    assert_eq!(json["records"][1]["suppressed"][0]["attribute"], "Notes");
    assert_eq!(json["records"][3]["outcome"]["stage"], "validate");
}

// -------------------------------------------------------------------------
// Export -> file -> import
// -------------------------------------------------------------------------

#[test]
fn export_then_import_into_empty_destination() {
    use chrono::{TimeZone, Utc};
    use contact_migrate_core::Provenance;
    use contact_migrate_io::record_set::{write_record_set, RecordSet};

    let dir = tempfile::tempdir().unwrap();
    let source = destination();
    let provenance = Provenance {
        exported_at: Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
        exported_by: "svc-export".into(),
        source_system: "fixture".into(),
    };

    let exported = export_contacts(&source, &provenance).unwrap();
    assert_eq!(exported.summary.exported, 3);

    let path = dir.path().join("contacts.json");
    write_record_set(&path, &RecordSet::new(exported.records, Some(&provenance))).unwrap();
    let loaded = read_record_set(&path).unwrap();

    let mut target = MemoryDirectory::new();
    let report = run(&mut target, &loaded.set.contacts, ReconcileOptions::default()).unwrap();
    assert_eq!(report.summary.created, 3);
    assert_eq!(target.len(), 3);

    // Provenance is never written to the destination
    assert!(target.records().all(|r| r.provenance.is_none()));

    let snapshot = dir.path().join("target.json");
    write_snapshot(&snapshot, &target.into_records()).unwrap();
    assert_eq!(read_snapshot(&snapshot).unwrap().len(), 3);
}
