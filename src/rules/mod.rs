//! Rule model and cache
//!
//! A [`Rule`] is the validated, typed form of one entry in the document's
//! `rules` array. The [`RuleCache`] builds every rule once, up front, so that
//! a malformed document is rejected before anything touches the filesystem.

pub mod cache;
pub mod types;

pub use cache::{CachedRule, RuleCache};
pub use types::{
    ApplyOrder, Depth, MaskMode, MatchCriteria, PatternSyntax, PermissionEntry, Perms, Rule,
    TargetType,
};
