//! Error types for acl-rollout
//!
//! This module defines the error hierarchy used throughout the application.
//! Everything except [`SetterError`] is fatal and aborts the run before any
//! filesystem mutation. Setter failures are recorded per path and folded into
//! the final exit status instead.

use std::path::PathBuf;
use thiserror::Error;

/// Exit status for a clean run (skipped paths included)
pub const EXIT_SUCCESS: i32 = 0;
/// Exit status when at least one path failed to receive its entries
pub const EXIT_APPLY_FAILED: i32 = 1;
/// Exit status for configuration errors
pub const EXIT_CONFIG: i32 = 2;
/// Exit status for invalid invocation or scope arguments
pub const EXIT_USAGE: i32 = 3;
/// Exit status when a required external tool is missing
pub const EXIT_ENVIRONMENT: i32 = 4;
/// Exit status for other I/O failures (e.g. writing the report)
pub const EXIT_IO: i32 = 5;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scope error: {0}")]
    Scope(#[from] ScopeError),

    #[error("Environment error: {0}")]
    Environment(#[from] EnvironmentError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) => EXIT_CONFIG,
            AppError::Scope(_) => EXIT_USAGE,
            AppError::Environment(_) => EXIT_ENVIRONMENT,
            AppError::Io(_) => EXIT_IO,
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {field}")]
    Missing { field: String },

    #[error("Invalid {syntax} pattern '{pattern}': {reason}")]
    InvalidPattern {
        syntax: &'static str,
        pattern: String,
        reason: String,
    },

    #[error("Invalid ACL entry '{entry}' in rule {rule}: {reason}")]
    InvalidEntry {
        rule: usize,
        entry: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Invalid path-scope argument
#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("Scope path '{}' does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("Scope path '{}' cannot be resolved: {source}", path.display())]
    Unresolvable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A required external tool is unavailable
#[derive(Error, Debug)]
#[error("Required tool '{tool}' not found: {reason}")]
pub struct EnvironmentError {
    pub tool: String,
    pub reason: String,
}

impl EnvironmentError {
    pub fn new(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            reason: reason.into(),
        }
    }
}

/// The ACL setter reported failure for one path/batch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to set ACL on '{}': {message}", path.display())]
pub struct SetterError {
    pub path: PathBuf,
    pub message: String,
}

impl SetterError {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
