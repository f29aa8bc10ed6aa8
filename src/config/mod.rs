//! Configuration module
//!
//! Handles loading the rule document from JSON/TOML files and environment
//! variables, and the immutable per-run options.

pub mod loader;
pub mod types;

pub use ::config::FileFormat;
pub use loader::{format_for_path, load_config, load_config_from_str};
pub use types::*;
