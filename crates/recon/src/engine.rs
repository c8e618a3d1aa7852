use contact_migrate_core::ContactRecord;

use crate::compare::compare;
use crate::directory::{DestinationDirectory, DirectoryError};
use crate::error::ReconError;
use crate::model::{
    FailureStage, ImportMeta, ImportReport, ImportSummary, Outcome, ReconcileOptions,
    RecordReport, SkipReason,
};
use crate::payload::{creation_payload, update_payload};

/// Reconcile `records` into `destination` in input order. Returns per-record
/// outcomes + summary, or a critical error if the session is lost.
pub fn run<D: DestinationDirectory>(
    destination: &mut D,
    records: &[ContactRecord],
    options: ReconcileOptions,
) -> Result<ImportReport, ReconError> {
    Reconciler::new(destination, options).run(records)
}

/// One import pass against a destination. Owns the run-scoped counters.
pub struct Reconciler<'d, D: DestinationDirectory> {
    destination: &'d mut D,
    options: ReconcileOptions,
    summary: ImportSummary,
}

impl<'d, D: DestinationDirectory> Reconciler<'d, D> {
    pub fn new(destination: &'d mut D, options: ReconcileOptions) -> Self {
        Self {
            destination,
            options,
            summary: ImportSummary::new(options.dry_run),
        }
    }

    pub fn summary(&self) -> &ImportSummary {
        &self.summary
    }

    pub fn run(mut self, records: &[ContactRecord]) -> Result<ImportReport, ReconError> {
        if self.options.dry_run {
            tracing::info!(records = records.len(), "dry run: no changes will be made");
        }

        let mut reports = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let report = self.reconcile(index, record)?;
            reports.push(report);
        }

        let s = &self.summary;
        tracing::info!(
            total = s.total,
            created = s.created,
            updated = s.updated,
            skipped = s.skipped,
            failed = s.failed,
            dry_run = s.dry_run,
            "import finished"
        );
        if s.dry_run {
            tracing::info!(
                would_create = s.would_create,
                would_update = s.would_update,
                "dry run: no changes were made"
            );
        }
        if s.partial_writes > 0 {
            tracing::warn!(
                partial_writes = s.partial_writes,
                "some contacts were created but not fully populated; inspect them manually"
            );
        }

        Ok(ImportReport {
            meta: ImportMeta {
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
                dry_run: self.options.dry_run,
            },
            summary: self.summary,
            records: reports,
        })
    }

    /// Classify and apply one record, counting its terminal state.
    pub fn reconcile(
        &mut self,
        index: usize,
        record: &ContactRecord,
    ) -> Result<RecordReport, ReconError> {
        let report = self.classify(index, record)?;
        self.summary.record(&report.outcome);
        Ok(report)
    }

    fn classify(
        &mut self,
        index: usize,
        record: &ContactRecord,
    ) -> Result<RecordReport, ReconError> {
        // 1. Validate
        if let Err(e) = record.validate() {
            return Ok(self.failed(index, record, FailureStage::Validate, e.to_string()));
        }
        let address = record.external_address().unwrap_or_default();

        // 2. Lookup
        let existing = match self.destination.find_by_external_address(address) {
            Ok(found) => found,
            Err(DirectoryError::NotFound) => None,
            Err(e) => return self.fail(index, record, FailureStage::Lookup, e),
        };

        match existing {
            Some(handle) => self.reconcile_existing(index, record, handle),
            None => self.create(index, record),
        }
    }

    // 3. Diff
    fn reconcile_existing(
        &mut self,
        index: usize,
        record: &ContactRecord,
        handle: D::Handle,
    ) -> Result<RecordReport, ReconError> {
        let address = record.external_address().unwrap_or_default();

        let current = match self.destination.mutable_attributes(&handle) {
            Ok(attrs) => attrs,
            Err(e) => return self.fail(index, record, FailureStage::Fetch, e),
        };

        let diffs = compare(&current, &record.attributes);
        if diffs.is_empty() {
            tracing::info!(external_address = address, contact = record.label(), "unchanged");
            return Ok(RecordReport::new(
                index,
                record,
                Outcome::Skipped {
                    reason: SkipReason::Unchanged,
                },
            ));
        }

        let plan = update_payload(&diffs);
        for diff in &plan.suppressed {
            tracing::debug!(
                external_address = address,
                attribute = %diff.attribute,
                group = %diff.attribute.group(),
                existing = diff.existing.as_deref().unwrap_or_default(),
                "not clearing populated field"
            );
        }

        if plan.payload.is_empty() {
            tracing::info!(
                external_address = address,
                contact = record.label(),
                suppressed = plan.suppressed.len(),
                "unchanged (only empty imported values differ)"
            );
            let mut report = RecordReport::new(
                index,
                record,
                Outcome::Skipped {
                    reason: SkipReason::NoApplicableChanges,
                },
            );
            report.suppressed = plan.suppressed;
            return Ok(report);
        }

        for change in &plan.changes {
            tracing::info!(
                external_address = address,
                attribute = %change.attribute,
                group = %change.attribute.group(),
                old = change.old.as_deref().unwrap_or_default(),
                new = change.new.as_str(),
                "field change"
            );
        }

        let outcome = if self.options.dry_run {
            tracing::info!(
                external_address = address,
                contact = record.label(),
                fields = plan.payload.len(),
                "dry run: would update"
            );
            Outcome::Skipped {
                reason: SkipReason::DryRunUpdate,
            }
        } else {
            match self.destination.update(&handle, &plan.payload) {
                Ok(()) => {
                    tracing::info!(
                        external_address = address,
                        contact = record.label(),
                        fields = plan.payload.len(),
                        "updated"
                    );
                    Outcome::Updated
                }
                Err(e) => return self.fail(index, record, FailureStage::Update, e),
            }
        };

        let mut report = RecordReport::new(index, record, outcome);
        report.changes = plan.changes;
        report.suppressed = plan.suppressed;
        Ok(report)
    }

    // 4. Create
    fn create(&mut self, index: usize, record: &ContactRecord) -> Result<RecordReport, ReconError> {
        let plan = match creation_payload(record) {
            Ok(plan) => plan,
            Err(e) => return Ok(self.failed(index, record, FailureStage::Validate, e.to_string())),
        };
        let address = plan.identity.external_address.as_str();
        let changes = plan.changes();

        if self.options.dry_run {
            tracing::info!(
                external_address = address,
                contact = record.label(),
                fields = changes.len(),
                "dry run: would create"
            );
            let mut report = RecordReport::new(
                index,
                record,
                Outcome::Skipped {
                    reason: SkipReason::DryRunCreate,
                },
            );
            report.changes = changes;
            return Ok(report);
        }

        let handle = match self.destination.create(&plan.identity, &plan.initial) {
            Ok(handle) => handle,
            Err(e) => return self.fail(index, record, FailureStage::Create, e),
        };
        tracing::debug!(external_address = address, handle = ?handle, "contact created");

        if !plan.follow_up.is_empty() {
            if let Err(e) = self.destination.update(&handle, &plan.follow_up) {
                tracing::warn!(
                    external_address = address,
                    handle = ?handle,
                    "created contact left partially populated"
                );
                return self.fail(index, record, FailureStage::FollowUpUpdate, e);
            }
        }

        tracing::info!(
            external_address = address,
            contact = record.label(),
            fields = changes.len(),
            "created"
        );
        let mut report = RecordReport::new(index, record, Outcome::Created);
        report.changes = changes;
        Ok(report)
    }

    /// Per-record failure, unless the session itself is gone.
    fn fail(
        &self,
        index: usize,
        record: &ContactRecord,
        stage: FailureStage,
        error: DirectoryError,
    ) -> Result<RecordReport, ReconError> {
        if let DirectoryError::SessionLost(message) = error {
            tracing::error!(contact = record.label(), %stage, "session lost: {message}");
            return Err(ReconError::SessionLost {
                contact: record.label().to_string(),
                message,
            });
        }

        Ok(self.failed(index, record, stage, error.to_string()))
    }

    /// Every Failed outcome is built (and logged) here.
    fn failed(
        &self,
        index: usize,
        record: &ContactRecord,
        stage: FailureStage,
        error: String,
    ) -> RecordReport {
        tracing::warn!(
            index,
            external_address = record.external_address().unwrap_or_default(),
            contact = record.label(),
            %stage,
            "failed: {error}"
        );
        RecordReport::new(index, record, Outcome::Failed { stage, error })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
