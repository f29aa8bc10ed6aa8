//! Optimization analyzer
//!
//! Decides whether a rule can be applied with one recursive setter call per
//! root instead of one call per object. A bulk call touches every object in
//! the subtree with the same entries, so it is only allowed when the per-path
//! run would have selected exactly that set with exactly those entries.
//! Anything that could narrow the set or split the entries forces per-path.

use crate::plan::entries::canonical_entries;
use crate::rules::Rule;
use serde::Serialize;
use std::fmt;

/// How a rule is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One recursive call per root
    Bulk,
    /// One call per matched object
    PerPath,
}

impl Strategy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Strategy::Bulk => "bulk",
            Strategy::PerPath => "per_path",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a rule cannot use the bulk strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkBlocker {
    ScopeFilter,
    RootExcluded,
    FiniteDepth,
    SingleTargetType,
    Patterns,
    EntriesDiffer,
    NoEntries,
    /// Found while walking, so only the planner reports it
    SpecialFiles,
}

impl BulkBlocker {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BulkBlocker::ScopeFilter => "path scope filter active",
            BulkBlocker::RootExcluded => "root not included",
            BulkBlocker::FiniteDepth => "depth is finite",
            BulkBlocker::SingleTargetType => "rule targets a single type",
            BulkBlocker::Patterns => "include/exclude patterns present",
            BulkBlocker::EntriesDiffer => "file and directory entries differ",
            BulkBlocker::NoEntries => "no file/directory entries",
            BulkBlocker::SpecialFiles => "tree contains sockets, FIFOs or devices",
        }
    }
}

impl fmt::Display for BulkBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First condition that rules out bulk application, if any
pub fn bulk_blocker(rule: &Rule, has_path_filters: bool) -> Option<BulkBlocker> {
    if has_path_filters {
        return Some(BulkBlocker::ScopeFilter);
    }
    if !rule.include_root {
        return Some(BulkBlocker::RootExcluded);
    }
    if !rule.depth.is_infinite() {
        return Some(BulkBlocker::FiniteDepth);
    }
    if !(rule.criteria.target_files && rule.criteria.target_dirs) {
        return Some(BulkBlocker::SingleTargetType);
    }
    if rule.criteria.has_patterns() {
        return Some(BulkBlocker::Patterns);
    }

    let files = canonical_entries(&rule.file_entries);
    let dirs = canonical_entries(&rule.dir_entries);
    if files != dirs {
        return Some(BulkBlocker::EntriesDiffer);
    }
    if files.is_empty() {
        return Some(BulkBlocker::NoEntries);
    }

    None
}

pub fn can_use_bulk(rule: &Rule, has_path_filters: bool) -> bool {
    bulk_blocker(rule, has_path_filters).is_none()
}

pub fn choose_strategy(rule: &Rule, has_path_filters: bool) -> Strategy {
    if can_use_bulk(rule, has_path_filters) {
        Strategy::Bulk
    } else {
        Strategy::PerPath
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Depth, MatchCriteria, PermissionEntry};
    use std::path::PathBuf;

    fn entry(s: &str) -> PermissionEntry {
        s.parse().unwrap()
    }

    fn bulk_rule() -> Rule {
        Rule {
            index: 0,
            id: None,
            roots: vec![PathBuf::from("/d")],
            include_root: true,
            depth: Depth::Infinite,
            criteria: MatchCriteria::default(),
            file_entries: vec![entry("g:team:rwx")],
            dir_entries: vec![entry("g:team:rwx")],
            default_entries: vec![],
            mask: None,
            apply_order: None,
        }
    }

    #[test]
    fn test_eligible_rule_is_bulk() {
        assert!(can_use_bulk(&bulk_rule(), false));
        assert_eq!(choose_strategy(&bulk_rule(), false), Strategy::Bulk);
    }

    #[test]
    fn test_each_condition_blocks_bulk() {
        assert_eq!(bulk_blocker(&bulk_rule(), true), Some(BulkBlocker::ScopeFilter));

        let mut rule = bulk_rule();
        rule.include_root = false;
        assert_eq!(bulk_blocker(&rule, false), Some(BulkBlocker::RootExcluded));

        let mut rule = bulk_rule();
        rule.depth = Depth::Limited(100);
        assert_eq!(bulk_blocker(&rule, false), Some(BulkBlocker::FiniteDepth));

        let mut rule = bulk_rule();
        rule.criteria.target_dirs = false;
        assert_eq!(bulk_blocker(&rule, false), Some(BulkBlocker::SingleTargetType));

        let mut rule = bulk_rule();
        rule.criteria.exclude = vec!["*.tmp".into()];
        assert_eq!(bulk_blocker(&rule, false), Some(BulkBlocker::Patterns));

        let mut rule = bulk_rule();
        rule.dir_entries = vec![entry("g:team:r-x")];
        assert_eq!(bulk_blocker(&rule, false), Some(BulkBlocker::EntriesDiffer));

        let mut rule = bulk_rule();
        rule.file_entries.clear();
        rule.dir_entries.clear();
        assert_eq!(bulk_blocker(&rule, false), Some(BulkBlocker::NoEntries));
    }

    #[test]
    fn test_empty_patterns_do_not_block() {
        let mut rule = bulk_rule();
        rule.criteria.include = vec!["".into()];
        assert!(can_use_bulk(&rule, false));
    }

    #[test]
    fn test_whitespace_pattern_blocks() {
        let mut rule = bulk_rule();
        rule.criteria.exclude = vec![" ".into()];
        assert_eq!(bulk_blocker(&rule, false), Some(BulkBlocker::Patterns));
    }

    #[test]
    fn test_duplicate_entries_compare_equal() {
        let mut rule = bulk_rule();
        rule.file_entries.push(entry("group:team:rwx"));
        assert!(can_use_bulk(&rule, false));
    }

    #[test]
    fn test_default_entries_do_not_affect_verdict() {
        let mut rule = bulk_rule();
        rule.default_entries = vec![entry("g:team:r-x")];
        assert!(can_use_bulk(&rule, false));
    }
}
