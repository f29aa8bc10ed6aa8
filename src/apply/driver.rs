//! Execution driver
//!
//! Sends planned batches for one path to the [`AclSetter`]. A failed batch
//! is counted and logged; remaining batches and paths still run.

use crate::apply::setter::{AclSetter, ApplyRequest};
use crate::error::SetterError;
use crate::plan::EntryBatch;
use crate::report::RunMetrics;
use crate::rules::MaskMode;
use std::path::Path;
use tracing::{debug, warn};

/// Result of applying a set of batches to one path
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Batches that succeeded (or were recorded in dry-run)
    pub applied_count: usize,
    pub failed_count: usize,
    pub errors: Vec<SetterError>,
}

impl Outcome {
    /// All required operations succeeded
    pub fn is_success(&self) -> bool {
        self.failed_count == 0
    }
}

/// Drives batches through a setter
pub struct ExecutionDriver<'a> {
    setter: &'a dyn AclSetter,
    metrics: &'a RunMetrics,
    dry_run: bool,
}

impl<'a> ExecutionDriver<'a> {
    pub fn new(setter: &'a dyn AclSetter, metrics: &'a RunMetrics, dry_run: bool) -> Self {
        Self {
            setter,
            metrics,
            dry_run,
        }
    }

    /// Apply `batches` to `path`; `recursive` is only set for bulk plans
    pub fn apply(&self, path: &Path, batches: &[&EntryBatch], recursive: bool) -> Outcome {
        let mut outcome = Outcome::default();

        for batch in batches {
            let entries = batch.setter_entries();
            let count = batch.len() as u64;

            if self.dry_run {
                debug!(
                    path = %path.display(),
                    entries = %entries.join(","),
                    recursive,
                    default = batch.default,
                    "Dry run: would apply"
                );
                self.metrics.record_batch(count, true);
                outcome.applied_count += 1;
                continue;
            }

            let request = ApplyRequest {
                path,
                entries: &entries,
                recursive,
                default: batch.default,
                no_mask_recalc: batch.mask == MaskMode::Skip,
            };

            match self.setter.set_acl(&request) {
                Ok(()) => {
                    debug!(path = %path.display(), entries = count, recursive, "Applied batch");
                    self.metrics.record_batch(count, true);
                    outcome.applied_count += 1;
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err.message, "Batch failed");
                    self.metrics.record_batch(count, false);
                    outcome.failed_count += 1;
                    outcome.errors.push(err);
                }
            }
        }

        outcome
    }
}
