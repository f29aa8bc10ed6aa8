//! Execution planning
//!
//! Builds an [`ExecutionPlan`] per rule: the strategy chosen by the
//! [`analyzer`], the ordered list of paths to touch and the entry batches
//! for each object type.
//!
//! ## Ordering
//!
//! Per-path candidates are sorted by depth, ties broken by path, so the
//! sequence is deterministic:
//!
//! - `shallow_to_deep`: ancestors before descendants (default)
//! - `deep_to_shallow`: descendants before ancestors
//!
//! Entries applied later to a path can refine what an earlier rule set on an
//! ancestor, which is why the order is part of the contract.

pub mod analyzer;
pub mod entries;

pub use analyzer::{BulkBlocker, Strategy, bulk_blocker, can_use_bulk, choose_strategy};
pub use entries::{EntryBatch, EntrySpecBuilder, canonical_entries};

use crate::matcher::MatchDecision;
use crate::rules::{ApplyOrder, CachedRule, MaskMode};
use crate::walk::{Candidate, CandidateKind, Enumeration, PathEnumerator, ScopeFilter};
use std::cmp::Reverse;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, trace};

/// Everything needed to apply one rule
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub rule_index: usize,
    pub strategy: Strategy,
    pub order: ApplyOrder,
    /// Filtered, ordered candidates (empty for bulk)
    pub candidates: Vec<Candidate>,
    /// Roots receiving a recursive call (bulk only)
    pub bulk_roots: Vec<PathBuf>,
    /// Directories receiving the default-entry pass (bulk only)
    pub default_targets: Vec<Candidate>,
    pub file_batches: Vec<EntryBatch>,
    pub dir_batches: Vec<EntryBatch>,
    pub default_batches: Vec<EntryBatch>,
    /// Objects left out by type, scope or pattern, plus missing roots
    pub skipped: u64,
    pub missing_roots: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

impl ExecutionPlan {
    /// Batches a per-path candidate of `kind` receives, defaults last
    pub fn batches_for(&self, kind: CandidateKind) -> Vec<&EntryBatch> {
        match kind {
            CandidateKind::File => self.file_batches.iter().collect(),
            CandidateKind::Directory => self
                .dir_batches
                .iter()
                .chain(self.default_batches.iter())
                .collect(),
            CandidateKind::Symlink | CandidateKind::Special => Vec::new(),
        }
    }
}

/// Sort candidates by depth for application
pub fn order_candidates(candidates: &mut [Candidate], order: ApplyOrder) {
    match order {
        ApplyOrder::ShallowToDeep => {
            candidates.sort_by(|a, b| (a.depth, &a.path).cmp(&(b.depth, &b.path)))
        }
        ApplyOrder::DeepToShallow => {
            candidates.sort_by(|a, b| (Reverse(a.depth), &a.path).cmp(&(Reverse(b.depth), &b.path)))
        }
    }
}

/// Builds execution plans for the rules of one run
#[derive(Debug)]
pub struct Planner<'a> {
    enumerator: PathEnumerator,
    scope: &'a ScopeFilter,
    batch_size: usize,
    mask: &'a MaskMode,
}

impl<'a> Planner<'a> {
    pub fn new(scope: &'a ScopeFilter, batch_size: usize, mask: &'a MaskMode) -> Self {
        Self {
            enumerator: PathEnumerator::new(),
            scope,
            batch_size,
            mask,
        }
    }

    pub fn plan(&self, cached: &CachedRule, order: ApplyOrder) -> ExecutionPlan {
        let rule = &cached.rule;
        let mask = rule.mask.clone().unwrap_or_else(|| self.mask.clone());
        let builder = EntrySpecBuilder::new(self.batch_size, mask);

        // A recursive setfacl call also reaches sockets, FIFOs and devices,
        // which per-path application skips, so bulk needs a tree without them.
        let mut walked = None;
        let blocker = bulk_blocker(rule, self.scope.is_active()).or_else(|| {
            let enumeration = self.enumerator.enumerate(rule);
            let special = enumeration
                .candidates
                .iter()
                .any(|c| c.kind == CandidateKind::Special);
            walked = Some(enumeration);
            special.then_some(BulkBlocker::SpecialFiles)
        });
        let strategy = match blocker {
            None => Strategy::Bulk,
            Some(blocker) => {
                debug!(rule = rule.index, reason = %blocker, "Bulk strategy not applicable");
                Strategy::PerPath
            }
        };

        let mut plan = ExecutionPlan {
            rule_index: rule.index,
            strategy,
            order,
            candidates: Vec::new(),
            bulk_roots: Vec::new(),
            default_targets: Vec::new(),
            file_batches: builder.build(&rule.file_entries, false),
            dir_batches: builder.build(&rule.dir_entries, false),
            default_batches: builder.build(&rule.default_entries, true),
            skipped: 0,
            missing_roots: Vec::new(),
            warnings: Vec::new(),
        };

        match strategy {
            Strategy::Bulk => self.plan_bulk(cached, &mut plan, walked),
            Strategy::PerPath => self.plan_per_path(cached, &mut plan, walked),
        }

        plan.skipped += plan.missing_roots.len() as u64;
        plan.warnings.extend(
            plan.missing_roots
                .iter()
                .map(|root| format!("root '{}' does not exist", root.display())),
        );

        debug!(
            rule = rule.index,
            strategy = %plan.strategy,
            candidates = plan.candidates.len(),
            skipped = plan.skipped,
            "Planned rule"
        );
        plan
    }

    fn plan_bulk(&self, cached: &CachedRule, plan: &mut ExecutionPlan, walked: Option<Enumeration>) {
        let rule = &cached.rule;

        for root in &rule.roots {
            match fs::canonicalize(root) {
                Ok(root) => plan.bulk_roots.push(root),
                Err(_) => plan.missing_roots.push(root.clone()),
            }
        }

        // Default entries only exist on directories, so they always get
        // their own per-directory pass.
        if !plan.default_batches.is_empty() {
            let enumeration = walked.unwrap_or_else(|| self.enumerator.enumerate(rule));
            plan.warnings.extend(enumeration.errors);
            let mut dirs: Vec<Candidate> = enumeration
                .candidates
                .into_iter()
                .filter(|c| c.kind == CandidateKind::Directory)
                .collect();
            order_candidates(&mut dirs, plan.order);
            plan.default_targets = dirs;
        }
    }

    fn plan_per_path(
        &self,
        cached: &CachedRule,
        plan: &mut ExecutionPlan,
        walked: Option<Enumeration>,
    ) {
        let rule = &cached.rule;
        let enumeration = walked.unwrap_or_else(|| self.enumerator.enumerate(rule));
        plan.missing_roots = enumeration.missing_roots;
        plan.warnings.extend(enumeration.errors);

        let mut selected = Vec::with_capacity(enumeration.candidates.len());
        for candidate in enumeration.candidates {
            let keep = match candidate.kind.target_type() {
                None => {
                    trace!(path = %candidate.path.display(), "Skipping object of unknown type");
                    false
                }
                Some(kind) if !rule.criteria.targets(kind) => false,
                Some(_) if !self.scope.contains(&candidate.path) => {
                    trace!(path = %candidate.path.display(), "Outside path scope");
                    false
                }
                Some(_) => match cached.matcher.check(&candidate.relative, &candidate.basename) {
                    MatchDecision::Included => !plan.batches_for(candidate.kind).is_empty(),
                    MatchDecision::NotIncluded => false,
                    MatchDecision::Excluded(pattern) => {
                        trace!(path = %candidate.path.display(), %pattern, "Excluded");
                        false
                    }
                },
            };

            if keep {
                selected.push(candidate);
            } else {
                plan.skipped += 1;
            }
        }

        order_candidates(&mut selected, plan.order);
        plan.candidates = selected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn candidate(path: &str, depth: usize) -> Candidate {
        Candidate {
            path: PathBuf::from(path),
            relative: path.trim_start_matches('/').to_string(),
            basename: path.rsplit('/').next().unwrap_or_default().to_string(),
            kind: CandidateKind::File,
            depth,
        }
    }

    #[test]
    fn test_shallow_to_deep() {
        let mut list = vec![
            candidate("/r/a/b", 2),
            candidate("/r", 0),
            candidate("/r/z", 1),
            candidate("/r/a", 1),
        ];
        order_candidates(&mut list, ApplyOrder::ShallowToDeep);
        let paths: Vec<_> = list.iter().map(|c| c.path.to_str().unwrap()).collect();
        assert_eq!(paths, vec!["/r", "/r/a", "/r/z", "/r/a/b"]);
    }

    #[test]
    fn test_deep_to_shallow() {
        let mut list = vec![
            candidate("/r", 0),
            candidate("/r/a", 1),
            candidate("/r/a/b", 2),
            candidate("/r/z", 1),
        ];
        order_candidates(&mut list, ApplyOrder::DeepToShallow);
        let paths: Vec<_> = list.iter().map(|c| c.path.to_str().unwrap()).collect();
        assert_eq!(paths, vec!["/r/a/b", "/r/a", "/r/z", "/r"]);
    }
}
