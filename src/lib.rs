//! Declarative ACL rollout
//!
//! Applies access-control rules to filesystem trees. A rule names root paths,
//! matching criteria and the ACL entries objects beneath those roots should
//! receive; the engine works out which objects get which entries, in what
//! order, and drives the native ACL setter.
//!
//! ## Features
//!
//! - **Glob or regex filters** with include/exclude lists, case toggle and
//!   basename matching
//! - **Depth-limited enumeration** below each root, symlinks never followed
//! - **Bulk optimization**: a single recursive setter call when it provably
//!   selects the same objects with the same entries as per-path application
//! - **Batched entries** to stay within OS argument limits
//! - **Deterministic ordering**, shallow-to-deep or deep-to-shallow
//! - **Continue on error**: failures are recorded and reflected in the exit code
//!
//! ## Example Rule Document
//!
//! ```json
//! {
//!   "apply_order": "shallow_to_deep",
//!   "rules": [
//!     {
//!       "id": "team-share",
//!       "roots": ["/srv/team"],
//!       "recurse": true,
//!       "acl": ["g:team:rwX"],
//!       "default_acl": ["g:team:rwX"]
//!     },
//!     {
//!       "roots": ["/srv/team/scripts"],
//!       "depth": 1,
//!       "match": { "types": ["file"], "include": ["*.sh"] },
//!       "acl_files": [{ "kind": "group", "name": "ops", "perms": "r-x" }]
//!     }
//!   ]
//! }
//! ```

pub mod apply;
pub mod config;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod plan;
pub mod report;
pub mod rules;
pub mod walk;

// Re-export main types
pub use apply::{AclSetter, ApplyRequest, SetfaclCommand};
pub use crate::config::{RulesDocument, RunConfig, load_config};
pub use engine::Engine;
pub use error::{AppError, Result};
pub use report::{RunMetrics, RunReport};
pub use rules::RuleCache;
