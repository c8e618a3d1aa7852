use contact_migrate_core::ContactRecord;
use serde::Serialize;

use crate::compare::FieldDiff;
use crate::payload::FieldChange;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    /// Compute and report every decision without mutating the destination.
    pub dry_run: bool,
}

// ---------------------------------------------------------------------------
// Per-record outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Created,
    Updated,
    Skipped { reason: SkipReason },
    Failed { stage: FailureStage, error: String },
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
            Self::Skipped { reason } => write!(f, "skipped ({reason})"),
            Self::Failed { stage, .. } => write!(f, "failed ({stage})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Destination already matches.
    Unchanged,
    /// Every difference would blank a populated field.
    NoApplicableChanges,
    /// Dry run: the record would have been created.
    DryRunCreate,
    /// Dry run: the record would have been updated.
    DryRunUpdate,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unchanged => write!(f, "unchanged"),
            Self::NoApplicableChanges => write!(f, "no_applicable_changes"),
            Self::DryRunCreate => write!(f, "dry_run_create"),
            Self::DryRunUpdate => write!(f, "dry_run_update"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Validate,
    Lookup,
    Fetch,
    Create,
    /// The contact was created but its remaining attributes were not
    /// written. The partial record is left in place.
    FollowUpUpdate,
    Update,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validate => write!(f, "validate"),
            Self::Lookup => write!(f, "lookup"),
            Self::Fetch => write!(f, "fetch"),
            Self::Create => write!(f, "create"),
            Self::FollowUpUpdate => write!(f, "follow_up_update"),
            Self::Update => write!(f, "update"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordReport {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_address: Option<String>,
    pub contact: String,
    pub outcome: Outcome,
    /// Applied changes, or would-be changes in a dry run.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<FieldChange>,
    /// Differences withheld because they would clear a populated field.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suppressed: Vec<FieldDiff>,
}

impl RecordReport {
    pub(crate) fn new(index: usize, record: &ContactRecord, outcome: Outcome) -> Self {
        Self {
            index,
            external_address: record.external_address().map(str::to_string),
            contact: record.label().to_string(),
            outcome,
            changes: Vec::new(),
            suppressed: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

/// Run-scoped counters. `created + updated + skipped + failed == total`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Dry-run records that would have been created (counted as skipped).
    pub would_create: usize,
    /// Dry-run records that would have been updated (counted as skipped).
    pub would_update: usize,
    /// Failed records that were created but not fully populated.
    pub partial_writes: usize,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub meta: ImportMeta,
    pub summary: ImportSummary,
    pub records: Vec<RecordReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportMeta {
    pub engine_version: String,
    pub run_at: String,
    pub dry_run: bool,
}
