//! Rule document loader with layered sources
//!
//! Loads the rule document from the following sources (highest to lowest
//! precedence):
//! 1. Environment variables (`ACL_ROLLOUT__*`, `__` separates nested keys)
//! 2. Document file (JSON, or TOML when the extension is `.toml`)
//! 3. Default values
//!
//! Only the document shape is checked here. Entries and patterns are
//! validated when the [`RuleCache`](crate::rules::RuleCache) is built.

use crate::config::types::{RawDepth, RulesDocument};
use crate::error::ConfigError;
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

/// Environment prefix for document overrides
const ENV_PREFIX: &str = "ACL_ROLLOUT";

/// Pick the document format from a file name
pub fn format_for_path(path: &Path) -> FileFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("toml") => FileFormat::Toml,
        _ => FileFormat::Json,
    }
}

/// Load a rule document from a string (useful for testing)
pub fn load_config_from_str(source: &str, format: FileFormat) -> Result<RulesDocument, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(source, format))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let document: RulesDocument = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_document(&document)?;

    Ok(document)
}

/// Load the rule document from a file, layering environment overrides on top
pub fn load_config(config_path: &str) -> Result<RulesDocument, ConfigError> {
    let expanded = shellexpand::tilde(config_path);
    let path = Path::new(expanded.as_ref());

    // Explicit path provided - must exist
    if !path.exists() {
        return Err(ConfigError::Load(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let config = Config::builder()
        .add_source(File::from(path).format(format_for_path(path)))
        // e.g. ACL_ROLLOUT__APPLY_ORDER=deep_to_shallow
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let document: RulesDocument = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_document(&document)?;

    Ok(document)
}

/// Validate the document shape
fn validate_document(document: &RulesDocument) -> Result<(), ConfigError> {
    if document.rules.is_empty() {
        return Err(ConfigError::Missing {
            field: "rules (at least one rule is required)".to_string(),
        });
    }

    for (idx, rule) in document.rules.iter().enumerate() {
        if rule.roots.is_empty() {
            return Err(ConfigError::Missing {
                field: format!("rules[{}].roots", idx),
            });
        }

        if rule.roots.iter().any(|r| r.trim().is_empty()) {
            return Err(ConfigError::invalid(format!(
                "rules[{}].roots contains an empty path",
                idx
            )));
        }

        if rule.criteria.types.is_empty() {
            return Err(ConfigError::invalid(format!(
                "rules[{}].match.types must name at least one of 'file', 'directory'",
                idx
            )));
        }

        if let Some(RawDepth::Keyword(word)) = &rule.depth
            && word != "infinite"
        {
            return Err(ConfigError::invalid(format!(
                "rules[{}].depth must be a non-negative integer or \"infinite\", got \"{}\"",
                idx, word
            )));
        }
    }

    Ok(())
}
