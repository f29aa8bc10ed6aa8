//! Rule cache
//!
//! Parses the raw document once into typed [`Rule`]s with their compiled
//! matchers. Lookups never re-parse.

use crate::config::{RawDepth, RawEntry, RawRule, RulesDocument};
use crate::error::ConfigError;
use crate::matcher::CriteriaMatcher;
use crate::rules::types::{ApplyOrder, Depth, MatchCriteria, PermissionEntry, Rule, TargetType};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// A parsed rule together with its compiled include/exclude filter
#[derive(Debug)]
pub struct CachedRule {
    pub rule: Rule,
    pub matcher: CriteriaMatcher,
}

/// Read-only cache of parsed rules, keyed by rule index
#[derive(Debug)]
pub struct RuleCache {
    document: RulesDocument,
    rules: Vec<CachedRule>,
    hits: AtomicU64,
}

impl RuleCache {
    /// Parse every rule of the document
    ///
    /// Fails on the first invalid rule, so nothing is applied from a document
    /// that is only partially valid.
    pub fn new(document: &RulesDocument) -> Result<Self, ConfigError> {
        if document.rules.is_empty() {
            return Err(ConfigError::Missing {
                field: "rules (at least one rule is required)".to_string(),
            });
        }

        let rules = document
            .rules
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                let rule = parse_rule(index, raw)?;
                let matcher = CriteriaMatcher::new(&rule.criteria)?;
                debug!(
                    rule = index,
                    label = %rule.label(),
                    roots = rule.roots.len(),
                    depth = %rule.depth,
                    "Parsed rule"
                );
                Ok(CachedRule { rule, matcher })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            document: document.clone(),
            rules,
            hits: AtomicU64::new(0),
        })
    }

    /// Look up a parsed rule
    pub fn get(&self, index: usize) -> Option<&CachedRule> {
        let cached = self.rules.get(index)?;
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(cached)
    }

    /// Number of lookups served from the cache
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Document-level ordering directive
    pub fn apply_order(&self) -> ApplyOrder {
        self.document.apply_order
    }

    /// The document the cache was built from
    pub fn document(&self) -> &RulesDocument {
        &self.document
    }
}

fn parse_rule(index: usize, raw: &RawRule) -> Result<Rule, ConfigError> {
    if raw.roots.is_empty() {
        return Err(ConfigError::Missing {
            field: format!("rules[{}].roots", index),
        });
    }

    let roots = raw
        .roots
        .iter()
        .map(|r| PathBuf::from(shellexpand::tilde(r).as_ref()))
        .collect();

    let depth = match &raw.depth {
        Some(RawDepth::Levels(n)) => Depth::Limited(*n),
        Some(RawDepth::Keyword(word)) if word == "infinite" => Depth::Infinite,
        Some(RawDepth::Keyword(word)) => {
            return Err(ConfigError::invalid(format!(
                "rules[{}].depth must be a non-negative integer or \"infinite\", got \"{}\"",
                index, word
            )));
        }
        None if raw.recurse => Depth::Infinite,
        None => Depth::Limited(0),
    };

    let m = &raw.criteria;
    if m.types.is_empty() {
        return Err(ConfigError::invalid(format!(
            "rules[{}].match.types must not be empty",
            index
        )));
    }
    let criteria = MatchCriteria {
        target_files: m.types.contains(&TargetType::File),
        target_dirs: m.types.contains(&TargetType::Directory),
        syntax: m.pattern_syntax,
        case_sensitive: m.case_sensitive,
        match_basename: m.match_basename,
        include: m.include.clone(),
        exclude: m.exclude.clone(),
    };

    let shared = raw.acl.as_deref().unwrap_or_default();
    let file_entries = parse_entries(index, raw.acl_files.as_deref().unwrap_or(shared))?;
    let dir_entries = parse_entries(index, raw.acl_dirs.as_deref().unwrap_or(shared))?;
    let default_entries = parse_entries(index, &raw.default_acl)?;

    Ok(Rule {
        index,
        id: raw.id.clone(),
        roots,
        include_root: raw.include_root,
        depth,
        criteria,
        file_entries,
        dir_entries,
        default_entries,
        mask: raw.mask.clone(),
        apply_order: raw.apply_order,
    })
}

fn parse_entries(rule: usize, raw: &[RawEntry]) -> Result<Vec<PermissionEntry>, ConfigError> {
    raw.iter()
        .map(|entry| {
            let parsed = match entry {
                RawEntry::Spec(spec) => spec.parse::<PermissionEntry>(),
                RawEntry::Structured { kind, name, perms } => {
                    PermissionEntry::from_parts(kind, name.as_deref(), perms)
                }
            };
            parsed.map_err(|reason| ConfigError::InvalidEntry {
                rule,
                entry: entry.to_string(),
                reason,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawMatch;

    fn raw_rule(roots: &[&str]) -> RawRule {
        RawRule {
            roots: roots.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn document(rules: Vec<RawRule>) -> RulesDocument {
        RulesDocument {
            rules,
            ..Default::default()
        }
    }

    #[test]
    fn test_depth_resolution() {
        let mut rule = raw_rule(&["/d"]);
        assert_eq!(parse_rule(0, &rule).unwrap().depth, Depth::Limited(0));

        rule.recurse = true;
        assert_eq!(parse_rule(0, &rule).unwrap().depth, Depth::Infinite);

        rule.depth = Some(RawDepth::Levels(2));
        assert_eq!(parse_rule(0, &rule).unwrap().depth, Depth::Limited(2));

        rule.depth = Some(RawDepth::Keyword("infinite".into()));
        rule.recurse = false;
        assert_eq!(parse_rule(0, &rule).unwrap().depth, Depth::Infinite);
    }

    #[test]
    fn test_type_specific_entries_replace_shared() {
        let mut rule = raw_rule(&["/d"]);
        rule.acl = Some(vec![RawEntry::Spec("g:team:rwx".into())]);
        rule.acl_files = Some(vec![RawEntry::Spec("g:team:rw-".into())]);

        let parsed = parse_rule(0, &rule).unwrap();
        assert_eq!(parsed.file_entries.len(), 1);
        assert_eq!(parsed.file_entries[0].canonical(), "g:team:rw-");
        assert_eq!(parsed.dir_entries[0].canonical(), "g:team:rwx");
        assert!(parsed.default_entries.is_empty());
    }

    #[test]
    fn test_invalid_entry_names_rule() {
        let mut rule = raw_rule(&["/d"]);
        rule.acl = Some(vec![RawEntry::Structured {
            kind: "other".into(),
            name: Some("bob".into()),
            perms: "r".into(),
        }]);

        let err = RuleCache::new(&document(vec![raw_rule(&["/ok"]), rule])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEntry { rule: 1, .. }));
    }

    #[test]
    fn test_invalid_pattern_fails_cache() {
        let mut rule = raw_rule(&["/d"]);
        rule.criteria = RawMatch {
            pattern_syntax: crate::rules::PatternSyntax::Regex,
            include: vec!["(unclosed".into()],
            ..Default::default()
        };
        let err = RuleCache::new(&document(vec![rule])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_lookups_count_hits() {
        let cache = RuleCache::new(&document(vec![raw_rule(&["/a"]), raw_rule(&["/b"])])).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.hits(), 0);

        let first = cache.get(0).unwrap() as *const CachedRule;
        let again = cache.get(0).unwrap() as *const CachedRule;
        assert_eq!(first, again);
        assert_eq!(cache.hits(), 2);

        assert!(cache.get(7).is_none());
        assert_eq!(cache.hits(), 2);
    }

    #[test]
    fn test_empty_document_rejected() {
        assert!(RuleCache::new(&RulesDocument::default()).is_err());
    }
}
