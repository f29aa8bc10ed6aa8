//! Configuration types for acl-rollout
//!
//! This module defines the raw rule document as it is loaded from JSON/TOML
//! files and environment variables, plus the immutable [`RunConfig`] built
//! from the command line.

use crate::rules::{ApplyOrder, MaskMode, PatternSyntax, TargetType};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of entries per setter invocation
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Root configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesDocument {
    /// Ordering of per-path application
    pub apply_order: ApplyOrder,

    /// Rules, applied in document order
    pub rules: Vec<RawRule>,
}

/// A rule exactly as written in the document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub roots: Vec<String>,

    pub include_root: bool,

    /// `true` means unlimited depth unless `depth` says otherwise
    pub recurse: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<RawDepth>,

    #[serde(rename = "match")]
    pub criteria: RawMatch,

    /// Entries shared by files and directories
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl: Option<Vec<RawEntry>>,

    /// File entries (replaces `acl` for files)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl_files: Option<Vec<RawEntry>>,

    /// Directory entries (replaces `acl` for directories)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl_dirs: Option<Vec<RawEntry>>,

    /// Default (inherited) entries for directories
    pub default_acl: Vec<RawEntry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask: Option<MaskMode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub apply_order: Option<ApplyOrder>,
}

impl Default for RawRule {
    fn default() -> Self {
        Self {
            id: None,
            roots: Vec::new(),
            include_root: true,
            recurse: false,
            depth: None,
            criteria: RawMatch::default(),
            acl: None,
            acl_files: None,
            acl_dirs: None,
            default_acl: Vec::new(),
            mask: None,
            apply_order: None,
        }
    }
}

/// Depth as written: a number or `"infinite"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDepth {
    Levels(u32),
    Keyword(String),
}

/// Match criteria as written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMatch {
    pub types: Vec<TargetType>,
    pub pattern_syntax: PatternSyntax,
    pub case_sensitive: bool,
    pub match_basename: bool,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for RawMatch {
    fn default() -> Self {
        Self {
            types: vec![TargetType::File, TargetType::Directory],
            pattern_syntax: PatternSyntax::Glob,
            case_sensitive: true,
            match_basename: false,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

/// An ACL entry as written: `"g:team:rwx"` or a structured object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawEntry {
    Spec(String),
    Structured {
        kind: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        perms: String,
    },
}

impl std::fmt::Display for RawEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawEntry::Spec(spec) => f.write_str(spec),
            RawEntry::Structured { kind, name, perms } => {
                write!(f, "{}:{}:{}", kind, name.as_deref().unwrap_or(""), perms)
            }
        }
    }
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// One JSON document at the end of the run
    Json,
    /// One JSON object per line, streamed per rule
    Jsonl,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "json-lines" => Ok(OutputFormat::Jsonl),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured output
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Immutable per-run options, built once from the command line
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub dry_run: bool,
    pub mask_mode: MaskMode,
    pub output: OutputFormat,
    /// Path-scope filters; empty means unrestricted
    pub scope: Vec<PathBuf>,
    pub batch_size: usize,
    /// Overrides the document's `apply_order`
    pub apply_order: Option<ApplyOrder>,
    pub quiet: bool,
    pub verbose: u8,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            mask_mode: MaskMode::Auto,
            output: OutputFormat::Text,
            scope: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            apply_order: None,
            quiet: false,
            verbose: 0,
        }
    }
}
