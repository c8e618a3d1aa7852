use crate::model::{FailureStage, ImportSummary, Outcome, RecordReport, SkipReason};

impl ImportSummary {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// Count one terminal outcome. Exactly one of the four counters moves.
    pub fn record(&mut self, outcome: &Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Skipped { reason } => {
                self.skipped += 1;
                match reason {
                    SkipReason::DryRunCreate => self.would_create += 1,
                    SkipReason::DryRunUpdate => self.would_update += 1,
                    SkipReason::Unchanged | SkipReason::NoApplicableChanges => {}
                }
            }
            Outcome::Failed { stage, .. } => {
                self.failed += 1;
                if *stage == FailureStage::FollowUpUpdate {
                    self.partial_writes += 1;
                }
            }
        }
    }

    pub fn is_balanced(&self) -> bool {
        self.created + self.updated + self.skipped + self.failed == self.total
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Recompute counters from per-record reports.
pub fn compute_summary(records: &[RecordReport], dry_run: bool) -> ImportSummary {
    let mut summary = ImportSummary::new(dry_run);
    for r in records {
        summary.record(&r.outcome);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(stage: FailureStage) -> Outcome {
        Outcome::Failed {
            stage,
            error: "boom".into(),
        }
    }

    #[test]
    fn summary_counts() {
        let mut summary = ImportSummary::new(false);
        for outcome in [
            Outcome::Created,
            Outcome::Updated,
            Outcome::Updated,
            Outcome::Skipped {
                reason: SkipReason::Unchanged,
            },
            Outcome::Skipped {
                reason: SkipReason::NoApplicableChanges,
            },
            failed(FailureStage::Lookup),
            failed(FailureStage::FollowUpUpdate),
        ] {
            summary.record(&outcome);
        }
        assert_eq!(summary.total, 7);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.updated, 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.partial_writes, 1);
        assert!(summary.is_balanced());
        assert!(summary.has_failures());
    }

    #[test]
    fn dry_run_outcomes_are_skipped() {
        let mut summary = ImportSummary::new(true);
        summary.record(&Outcome::Skipped {
            reason: SkipReason::DryRunCreate,
        });
        summary.record(&Outcome::Skipped {
            reason: SkipReason::DryRunUpdate,
        });
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.would_create, 1);
        assert_eq!(summary.would_update, 1);
        assert_eq!(summary.created + summary.updated, 0);
        assert!(summary.dry_run);
    }
}
