//! Candidate filtering
//!
//! A [`CriteriaMatcher`] combines the compiled include and exclude lists of a
//! rule. Evaluation order:
//!
//! - an empty include list passes every candidate, otherwise at least one
//!   include pattern must match
//! - any exclude match rejects the candidate, whatever the include result
//!
//! Each pattern is tested against the path relative to the rule root and,
//! when `match_basename` is set, also against the final path component.

pub mod patterns;

pub use patterns::PatternMatcher;

use crate::error::ConfigError;
use crate::rules::MatchCriteria;

/// Outcome of evaluating one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchDecision {
    Included,
    /// The include list is non-empty and nothing matched
    NotIncluded,
    /// Vetoed by the given exclude pattern
    Excluded(String),
}

impl MatchDecision {
    pub fn is_included(&self) -> bool {
        matches!(self, MatchDecision::Included)
    }
}

/// Compiled include/exclude filter for one rule
#[derive(Debug, Default)]
pub struct CriteriaMatcher {
    include: PatternMatcher,
    exclude: PatternMatcher,
    match_basename: bool,
}

impl CriteriaMatcher {
    pub fn new(criteria: &MatchCriteria) -> Result<Self, ConfigError> {
        Ok(Self {
            include: PatternMatcher::new(
                &criteria.include,
                criteria.syntax,
                criteria.case_sensitive,
            )?,
            exclude: PatternMatcher::new(
                &criteria.exclude,
                criteria.syntax,
                criteria.case_sensitive,
            )?,
            match_basename: criteria.match_basename,
        })
    }

    /// Whether the candidate passes the filter
    pub fn matches(&self, relative_path: &str, basename: &str) -> bool {
        self.check(relative_path, basename).is_included()
    }

    pub fn check(&self, relative_path: &str, basename: &str) -> MatchDecision {
        if let Some(pattern) = self.find(&self.exclude, relative_path, basename) {
            return MatchDecision::Excluded(pattern.to_string());
        }

        if self.include.is_empty() || self.find(&self.include, relative_path, basename).is_some()
        {
            MatchDecision::Included
        } else {
            MatchDecision::NotIncluded
        }
    }

    /// True when no pattern is configured at all
    pub fn is_pass_through(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    fn find<'a>(
        &self,
        list: &'a PatternMatcher,
        relative_path: &str,
        basename: &str,
    ) -> Option<&'a str> {
        list.find_match(relative_path).or_else(|| {
            if self.match_basename {
                list.find_match(basename)
            } else {
                None
            }
        })
    }
}
