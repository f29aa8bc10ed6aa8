//! Entry spec builder
//!
//! Turns typed entries into canonical strings, drops duplicates (first
//! occurrence wins) and splits the result into batches of at most
//! `batch_size` entries so a single setter invocation stays well below the
//! OS argument-length limit.

use crate::config::DEFAULT_BATCH_SIZE;
use crate::rules::{MaskMode, PermissionEntry};
use serde::Serialize;
use std::collections::HashSet;

/// One setter invocation's worth of entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryBatch {
    /// Canonical entries, at most `batch_size` of them
    pub entries: Vec<String>,
    /// Mask directive; an explicit mask is appended when the batch is sent
    pub mask: MaskMode,
    /// Whether these are default (inherited) entries
    pub default: bool,
}

impl EntryBatch {
    /// Entries as handed to the setter, including an explicit mask
    pub fn setter_entries(&self) -> Vec<String> {
        let mut entries = self.entries.clone();
        if let Some(mask) = self.mask.explicit_entry() {
            entries.push(mask.canonical());
        }
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Canonicalise and dedupe, keeping first-seen order
pub fn canonical_entries(entries: &[PermissionEntry]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(entries.len());
    entries
        .iter()
        .map(PermissionEntry::canonical)
        .filter(|spec| seen.insert(spec.clone()))
        .collect()
}

/// Builds batches for one rule
#[derive(Debug, Clone)]
pub struct EntrySpecBuilder {
    batch_size: usize,
    mask: MaskMode,
}

impl EntrySpecBuilder {
    /// `batch_size` of zero is treated as one
    pub fn new(batch_size: usize, mask: MaskMode) -> Self {
        Self {
            batch_size: batch_size.max(1),
            mask,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Produce `ceil(unique / batch_size)` batches
    pub fn build(&self, entries: &[PermissionEntry], is_default: bool) -> Vec<EntryBatch> {
        canonical_entries(entries)
            .chunks(self.batch_size)
            .map(|chunk| EntryBatch {
                entries: chunk.to_vec(),
                mask: self.mask.clone(),
                default: is_default,
            })
            .collect()
    }
}

impl Default for EntrySpecBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE, MaskMode::Auto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn users(n: usize) -> Vec<PermissionEntry> {
        (0..n)
            .map(|i| PermissionEntry::User(format!("user{}", i), "rwx".parse().unwrap()))
            .collect()
    }

    #[rstest]
    #[case(0, 64, 0)]
    #[case(1, 64, 1)]
    #[case(64, 64, 1)]
    #[case(65, 64, 2)]
    #[case(10, 3, 4)]
    #[case(7, 1, 7)]
    fn test_batch_count(#[case] n: usize, #[case] k: usize, #[case] expected: usize) {
        let batches = EntrySpecBuilder::new(k, MaskMode::Auto).build(&users(n), false);
        assert_eq!(batches.len(), expected);
        assert!(batches.iter().all(|b| b.len() <= k && !b.is_empty()));

        let total: usize = batches.iter().map(EntryBatch::len).sum();
        assert_eq!(total, n);
    }

    #[test]
    fn test_dedup_preserves_first_seen_order() {
        let entries: Vec<PermissionEntry> = ["g:b:rwx", "u:a:r--", "group:b:rwx", "u:a:r--", "o::---"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let batches = EntrySpecBuilder::new(2, MaskMode::Auto).build(&entries, false);

        let flat: Vec<String> = batches.into_iter().flat_map(|b| b.entries).collect();
        assert_eq!(flat, vec!["g:b:rwx", "u:a:r--", "o::---"]);
    }

    #[test]
    fn test_explicit_mask_appended_per_batch() {
        let mask: MaskMode = "r-x".parse().unwrap();
        let batches = EntrySpecBuilder::new(2, mask).build(&users(3), true);

        assert_eq!(batches.len(), 2);
        for batch in &batches {
            assert!(batch.default);
            assert_eq!(batch.setter_entries().last().unwrap(), "m::r-x");
            assert!(batch.entries.len() <= 2);
        }
    }

    #[test]
    fn test_zero_batch_size_clamped() {
        let builder = EntrySpecBuilder::new(0, MaskMode::Skip);
        assert_eq!(builder.batch_size(), 1);
        assert_eq!(builder.build(&users(2), false).len(), 2);
    }
}
