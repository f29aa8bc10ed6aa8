//! Rule types
//!
//! Typed form of a rule after the raw document has been validated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Characters allowed in a permission string
const PERM_ALPHABET: &[char] = &['r', 'w', 'x', 'X', '-'];

/// Validated permission string over `{r,w,x,X,-}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Perms(String);

impl Perms {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Perms {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("permission string is empty".to_string());
        }
        if let Some(c) = s.chars().find(|c| !PERM_ALPHABET.contains(c)) {
            return Err(format!("invalid permission character '{}'", c));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Perms {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Perms> for String {
    fn from(value: Perms) -> Self {
        value.0
    }
}

impl fmt::Display for Perms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single ACL entry
///
/// Only the named variants carry a principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PermissionEntry {
    User(String, Perms),
    Group(String, Perms),
    Owner(Perms),
    OwningGroup(Perms),
    Other(Perms),
    Mask(Perms),
}

impl PermissionEntry {
    /// Canonical `tag:qualifier:perms` form understood by the ACL setter
    pub fn canonical(&self) -> String {
        match self {
            PermissionEntry::User(name, perms) => format!("u:{}:{}", name, perms),
            PermissionEntry::Group(name, perms) => format!("g:{}:{}", name, perms),
            PermissionEntry::Owner(perms) => format!("u::{}", perms),
            PermissionEntry::OwningGroup(perms) => format!("g::{}", perms),
            PermissionEntry::Other(perms) => format!("o::{}", perms),
            PermissionEntry::Mask(perms) => format!("m::{}", perms),
        }
    }

    /// Build an entry from its kind name, optional principal and permission string
    pub fn from_parts(kind: &str, name: Option<&str>, perms: &str) -> Result<Self, String> {
        let perms: Perms = perms.parse()?;
        let name = name.filter(|n| !n.is_empty());

        let entry = match (kind, name) {
            ("user" | "u", Some(n)) => PermissionEntry::User(validate_principal(n)?, perms),
            ("user" | "u" | "owner", None) => PermissionEntry::Owner(perms),
            ("group" | "g", Some(n)) => PermissionEntry::Group(validate_principal(n)?, perms),
            ("group" | "g" | "owning_group", None) => PermissionEntry::OwningGroup(perms),
            ("other" | "o", None) => PermissionEntry::Other(perms),
            ("mask" | "m", None) => PermissionEntry::Mask(perms),
            ("owner" | "owning_group" | "other" | "o" | "mask" | "m", Some(n)) => {
                return Err(format!("'{}' entries cannot name a principal ('{}')", kind, n));
            }
            _ => return Err(format!("unknown entry kind '{}'", kind)),
        };
        Ok(entry)
    }
}

impl FromStr for PermissionEntry {
    type Err = String;

    /// Parse `tag:qualifier:perms`, accepting short (`u`) and long (`user`) tags
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        match parts.as_slice() {
            [tag, qualifier, perms] => Self::from_parts(tag, Some(qualifier), perms),
            _ => Err("expected 'tag:qualifier:perms'".to_string()),
        }
    }
}

impl fmt::Display for PermissionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

fn validate_principal(name: &str) -> Result<String, String> {
    if name.chars().any(|c| c == ':' || c == ',' || c.is_whitespace()) {
        return Err(format!("invalid principal name '{}'", name));
    }
    Ok(name.to_string())
}

/// Depth limit below each root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Limited(u32),
    Infinite,
}

impl Depth {
    /// Whether an object `depth` levels below the root is within the limit
    pub fn allows(&self, depth: usize) -> bool {
        match self {
            Depth::Limited(limit) => depth <= *limit as usize,
            Depth::Infinite => true,
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, Depth::Infinite)
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Depth::Limited(n) => write!(f, "{}", n),
            Depth::Infinite => f.write_str("infinite"),
        }
    }
}

/// Object type a rule can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    File,
    Directory,
}

impl TargetType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TargetType::File => "file",
            TargetType::Directory => "directory",
        }
    }
}

/// Pattern syntax for include/exclude lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternSyntax {
    #[default]
    Glob,
    Regex,
}

impl PatternSyntax {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PatternSyntax::Glob => "glob",
            PatternSyntax::Regex => "regex",
        }
    }
}

/// Order in which per-path candidates are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOrder {
    /// Ancestors before descendants
    #[default]
    ShallowToDeep,
    /// Descendants before ancestors
    DeepToShallow,
}

impl FromStr for ApplyOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shallow_to_deep" | "shallow-to-deep" => Ok(ApplyOrder::ShallowToDeep),
            "deep_to_shallow" | "deep-to-shallow" => Ok(ApplyOrder::DeepToShallow),
            other => Err(format!("unknown apply order '{}'", other)),
        }
    }
}

/// Mask-handling directive carried by every batch
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MaskMode {
    /// Let the setter recalculate the mask
    #[default]
    Auto,
    /// Do not recalculate the mask
    Skip,
    /// Append `m::<perms>` to every batch
    Explicit(Perms),
}

impl MaskMode {
    /// The explicit mask entry, if any
    pub fn explicit_entry(&self) -> Option<PermissionEntry> {
        match self {
            MaskMode::Explicit(perms) => Some(PermissionEntry::Mask(perms.clone())),
            _ => None,
        }
    }
}

impl FromStr for MaskMode {
    type Err = String;

    /// Accepts `auto`, `skip`, `explicit:<perms>` or a bare permission string
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(MaskMode::Auto),
            "skip" => Ok(MaskMode::Skip),
            other => {
                let perms = other.strip_prefix("explicit:").unwrap_or(other);
                perms
                    .parse()
                    .map(MaskMode::Explicit)
                    .map_err(|e| format!("invalid mask mode '{}': {}", other, e))
            }
        }
    }
}

impl TryFrom<String> for MaskMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MaskMode> for String {
    fn from(value: MaskMode) -> Self {
        value.to_string()
    }
}

impl fmt::Display for MaskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskMode::Auto => f.write_str("auto"),
            MaskMode::Skip => f.write_str("skip"),
            MaskMode::Explicit(perms) => write!(f, "explicit:{}", perms),
        }
    }
}

/// Matching criteria of a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCriteria {
    pub target_files: bool,
    pub target_dirs: bool,
    pub syntax: PatternSyntax,
    pub case_sensitive: bool,
    pub match_basename: bool,
    /// Include patterns; empty means "match everything"
    pub include: Vec<String>,
    /// Exclude patterns; any match vetoes
    pub exclude: Vec<String>,
}

impl MatchCriteria {
    pub fn targets(&self, kind: TargetType) -> bool {
        match kind {
            TargetType::File => self.target_files,
            TargetType::Directory => self.target_dirs,
        }
    }

    /// Empty patterns are ignored, as in the matcher
    pub fn has_patterns(&self) -> bool {
        self.include
            .iter()
            .chain(&self.exclude)
            .any(|p| !p.is_empty())
    }
}

impl Default for MatchCriteria {
    fn default() -> Self {
        Self {
            target_files: true,
            target_dirs: true,
            syntax: PatternSyntax::Glob,
            case_sensitive: true,
            match_basename: false,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

/// A validated rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Position in the document
    pub index: usize,
    pub id: Option<String>,
    /// Non-empty
    pub roots: Vec<PathBuf>,
    pub include_root: bool,
    pub depth: Depth,
    pub criteria: MatchCriteria,
    pub file_entries: Vec<PermissionEntry>,
    pub dir_entries: Vec<PermissionEntry>,
    /// Default (inherited) entries, directories only
    pub default_entries: Vec<PermissionEntry>,
    pub mask: Option<MaskMode>,
    pub apply_order: Option<ApplyOrder>,
}

impl Rule {
    /// Label used in logs and reports
    pub fn label(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("rule[{}]", self.index),
        }
    }
}
