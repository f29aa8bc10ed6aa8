//! Pattern matching for include/exclude lists
//!
//! Provides glob- and regex-based pattern matching with a single case
//! sensitivity toggle.

use crate::error::ConfigError;
use crate::rules::PatternSyntax;
use globset::{GlobBuilder, GlobMatcher};
use regex::{Regex, RegexBuilder};

/// Compiled pattern matcher
#[derive(Debug)]
pub struct PatternMatcher {
    patterns: Vec<CompiledPattern>,
}

#[derive(Debug)]
struct CompiledPattern {
    source: String,
    engine: Engine,
}

#[derive(Debug)]
enum Engine {
    Glob(GlobMatcher),
    Regex(Regex),
}

impl CompiledPattern {
    fn is_match(&self, candidate: &str) -> bool {
        match &self.engine {
            Engine::Glob(glob) => glob.is_match(candidate),
            Engine::Regex(regex) => regex.is_match(candidate),
        }
    }
}

impl PatternMatcher {
    /// Create a new pattern matcher
    ///
    /// Empty patterns are dropped, so a list of only empty strings behaves
    /// like an empty list. Whitespace is a real pattern and is kept.
    pub fn new(
        patterns: &[String],
        syntax: PatternSyntax,
        case_sensitive: bool,
    ) -> Result<Self, ConfigError> {
        let mut compiled = Vec::with_capacity(patterns.len());

        for pattern in patterns.iter().filter(|p| !p.is_empty()) {
            let engine = match syntax {
                PatternSyntax::Glob => compile_glob(pattern, case_sensitive)?,
                PatternSyntax::Regex => compile_regex(pattern, case_sensitive)?,
            };

            compiled.push(CompiledPattern {
                source: pattern.clone(),
                engine,
            });
        }

        Ok(Self { patterns: compiled })
    }

    /// Create an empty pattern matcher (matches nothing)
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Check if a path matches any pattern
    pub fn matches(&self, candidate: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(candidate))
    }

    /// Check if a path matches any pattern, returning the matching pattern
    pub fn find_match(&self, candidate: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| p.is_match(candidate))
            .map(|p| p.source.as_str())
    }

    /// Check if this matcher has any patterns
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Get the number of patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::empty()
    }
}

/// `*` and `?` never cross `/`; `**` spans directories.
fn compile_glob(pattern: &str, case_sensitive: bool) -> Result<Engine, ConfigError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .backslash_escape(true)
        .case_insensitive(!case_sensitive)
        .build()
        .map(|glob| Engine::Glob(glob.compile_matcher()))
        .map_err(|e| ConfigError::InvalidPattern {
            syntax: PatternSyntax::Glob.as_str(),
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

fn compile_regex(pattern: &str, case_sensitive: bool) -> Result<Engine, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map(Engine::Regex)
        .map_err(|e| ConfigError::InvalidPattern {
            syntax: PatternSyntax::Regex.as_str(),
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}
