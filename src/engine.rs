//! Rule application engine
//!
//! Rules run one after another, in document order, because a later rule may
//! refine what an earlier one set. Each rule goes through
//!
//! ```text
//! Pending → Enumerating → BulkApply | PerPathApply → Aggregated
//! ```
//!
//! There is no retry state: a failed batch is reported, the engine moves on,
//! and the run's exit code reflects the failure at the end.

use crate::apply::{AclSetter, ExecutionDriver};
use crate::config::RunConfig;
use crate::error::{EXIT_APPLY_FAILED, EXIT_SUCCESS};
use crate::plan::{EntryBatch, ExecutionPlan, Planner, Strategy};
use crate::report::{
    EntrySpecs, ReportMetadata, RuleStatus, RuleSummary, RunMetrics, RunReport,
};
use crate::rules::{ApplyOrder, CachedRule, RuleCache};
use crate::walk::ScopeFilter;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::{Instant, SystemTime};
use tracing::{debug, info, trace, warn};

/// Lifecycle of one rule within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleState {
    Pending,
    Enumerating,
    BulkApply,
    PerPathApply,
    Aggregated,
}

impl fmt::Display for RuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RuleState::Pending => "pending",
            RuleState::Enumerating => "enumerating",
            RuleState::BulkApply => "bulk_apply",
            RuleState::PerPathApply => "per_path_apply",
            RuleState::Aggregated => "aggregated",
        };
        f.write_str(s)
    }
}

/// Per-path result within one rule; `true` while every operation succeeded
type PathResults = BTreeMap<PathBuf, bool>;

/// Applies the rules of a [`RuleCache`] through an [`AclSetter`]
pub struct Engine<'a> {
    cache: &'a RuleCache,
    run: &'a RunConfig,
    scope: &'a ScopeFilter,
    setter: &'a dyn AclSetter,
}

impl<'a> Engine<'a> {
    pub fn new(
        cache: &'a RuleCache,
        run: &'a RunConfig,
        scope: &'a ScopeFilter,
        setter: &'a dyn AclSetter,
    ) -> Self {
        Self {
            cache,
            run,
            scope,
            setter,
        }
    }

    /// Run every rule and return the report
    pub fn run(&self) -> RunReport {
        self.run_with(&mut |_| {})
    }

    /// Run every rule, calling `on_rule` as each one completes
    pub fn run_with(&self, on_rule: &mut dyn FnMut(&RuleSummary)) -> RunReport {
        let started = SystemTime::now();
        let clock = Instant::now();
        let hits_before = self.cache.hits();

        let metrics = RunMetrics::new();
        let planner = Planner::new(self.scope, self.run.batch_size, &self.run.mask_mode);
        let driver = ExecutionDriver::new(self.setter, &metrics, self.run.dry_run);

        info!(
            rules = self.cache.len(),
            dry_run = self.run.dry_run,
            scoped = self.scope.is_active(),
            "Applying rules"
        );

        let mut summaries = Vec::with_capacity(self.cache.len());
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        for index in 0..self.cache.len() {
            let Some(cached) = self.cache.get(index) else {
                continue;
            };
            let summary = self.run_rule(cached, &planner, &driver, &metrics, &mut warnings);
            errors.extend(
                summary
                    .errors
                    .iter()
                    .map(|e| format!("{}: {}", summary.label(), e)),
            );
            on_rule(&summary);
            summaries.push(summary);
        }

        metrics.set_cache_hits(self.cache.hits() - hits_before);
        let snapshot = metrics.snapshot();
        let exit_code = if metrics.has_failures() {
            EXIT_APPLY_FAILED
        } else {
            EXIT_SUCCESS
        };

        info!(
            applied = snapshot.paths_applied,
            failed = snapshot.paths_failed,
            skipped = snapshot.paths_skipped,
            success_rate = snapshot.success_rate,
            "Run complete"
        );

        RunReport {
            metadata: ReportMetadata::new(started, clock.elapsed(), exit_code, self.run.dry_run),
            config: serde_json::to_value(self.cache.document()).unwrap_or_default(),
            rules: summaries,
            metrics: snapshot,
            warnings,
            errors,
        }
    }

    /// Ordering for a rule: command line, then rule, then document
    fn order_for(&self, cached: &CachedRule) -> ApplyOrder {
        self.run
            .apply_order
            .or(cached.rule.apply_order)
            .unwrap_or_else(|| self.cache.apply_order())
    }

    fn run_rule(
        &self,
        cached: &CachedRule,
        planner: &Planner<'_>,
        driver: &ExecutionDriver<'_>,
        metrics: &RunMetrics,
        warnings: &mut Vec<String>,
    ) -> RuleSummary {
        let rule = &cached.rule;
        let label = rule.label();
        let before = metrics.snapshot();

        let mut state = RuleState::Pending;
        transition(rule.index, &mut state, RuleState::Enumerating);
        let plan = planner.plan(cached, self.order_for(cached));
        warnings.extend(plan.warnings.iter().map(|w| format!("{}: {}", label, w)));
        metrics.record_paths_skipped(plan.skipped);

        let (results, errors) = match plan.strategy {
            Strategy::Bulk => {
                transition(rule.index, &mut state, RuleState::BulkApply);
                metrics.record_bulk_rule();
                self.apply_bulk(&plan, driver, metrics)
            }
            Strategy::PerPath => {
                transition(rule.index, &mut state, RuleState::PerPathApply);
                self.apply_per_path(&plan, driver, metrics)
            }
        };

        for ok in results.values() {
            if *ok {
                metrics.record_path_applied();
            } else {
                metrics.record_path_failed();
            }
        }
        transition(rule.index, &mut state, RuleState::Aggregated);

        let delta = metrics.snapshot().since(&before);
        let status = RuleStatus::from_metrics(&delta, !results.is_empty());
        if status == RuleStatus::Failed {
            warn!(rule = rule.index, label = %label, failed = delta.paths_failed, "Rule finished with failures");
        } else {
            debug!(rule = rule.index, label = %label, status = status.as_str(), "Rule finished");
        }

        RuleSummary {
            index: rule.index,
            id: rule.id.clone(),
            status,
            strategy: plan.strategy,
            roots: rule
                .roots
                .iter()
                .map(|r| r.to_string_lossy().into_owned())
                .collect(),
            entry_specs: EntrySpecs {
                files: flatten(&plan.file_batches),
                directories: flatten(&plan.dir_batches),
                defaults: flatten(&plan.default_batches),
            },
            metrics: delta,
            errors,
        }
    }

    fn apply_bulk(
        &self,
        plan: &ExecutionPlan,
        driver: &ExecutionDriver<'_>,
        metrics: &RunMetrics,
    ) -> (PathResults, Vec<String>) {
        let mut results = PathResults::new();
        let mut errors = Vec::new();

        // file and directory batches are identical for bulk plans
        let batches: Vec<&EntryBatch> = plan.dir_batches.iter().collect();
        for root in &plan.bulk_roots {
            let outcome = driver.apply(root, &batches, true);
            errors.extend(outcome.errors.iter().map(|e| e.to_string()));
            results.insert(root.clone(), outcome.is_success());
        }

        let defaults: Vec<&EntryBatch> = plan.default_batches.iter().collect();
        for dir in &plan.default_targets {
            if fs::symlink_metadata(&dir.path).is_err() {
                trace!(path = %dir.path.display(), "Directory vanished before default pass");
                metrics.record_paths_skipped(1);
                continue;
            }
            let outcome = driver.apply(&dir.path, &defaults, false);
            errors.extend(outcome.errors.iter().map(|e| e.to_string()));
            let ok = results.entry(dir.path.clone()).or_insert(true);
            *ok &= outcome.is_success();
        }

        (results, errors)
    }

    fn apply_per_path(
        &self,
        plan: &ExecutionPlan,
        driver: &ExecutionDriver<'_>,
        metrics: &RunMetrics,
    ) -> (PathResults, Vec<String>) {
        let mut results = PathResults::new();
        let mut errors = Vec::new();

        for candidate in &plan.candidates {
            if fs::symlink_metadata(&candidate.path).is_err() {
                trace!(path = %candidate.path.display(), "Candidate vanished before apply");
                metrics.record_paths_skipped(1);
                continue;
            }

            let batches = plan.batches_for(candidate.kind);
            let outcome = driver.apply(&candidate.path, &batches, false);
            errors.extend(outcome.errors.iter().map(|e| e.to_string()));
            // overlapping roots can yield the same path twice
            let ok = results.entry(candidate.path.clone()).or_insert(true);
            *ok &= outcome.is_success();
        }

        (results, errors)
    }
}

fn transition(rule: usize, state: &mut RuleState, next: RuleState) {
    trace!(rule, from = %state, to = %next, "Rule state");
    *state = next;
}

fn flatten(batches: &[EntryBatch]) -> Vec<String> {
    batches.iter().flat_map(|b| b.entries.iter().cloned()).collect()
}
