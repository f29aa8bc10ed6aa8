//! Candidate enumeration
//!
//! Walks each root of a rule and yields the objects within the rule's depth
//! limit. Symlinks are never followed; they surface as
//! [`CandidateKind::Symlink`] and are skipped by the engine, as are sockets,
//! FIFOs and device nodes ([`CandidateKind::Special`]).

pub mod scope;

pub use scope::ScopeFilter;

use crate::rules::{Depth, Rule, TargetType};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// Resolved type of a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateKind {
    File,
    Directory,
    /// Never followed, never touched
    Symlink,
    /// Socket, FIFO or device node
    Special,
}

impl CandidateKind {
    fn from_file_type(file_type: fs::FileType) -> Self {
        if file_type.is_dir() {
            CandidateKind::Directory
        } else if file_type.is_file() {
            CandidateKind::File
        } else if file_type.is_symlink() {
            CandidateKind::Symlink
        } else {
            CandidateKind::Special
        }
    }

    pub fn target_type(&self) -> Option<TargetType> {
        match self {
            CandidateKind::File => Some(TargetType::File),
            CandidateKind::Directory => Some(TargetType::Directory),
            CandidateKind::Symlink | CandidateKind::Special => None,
        }
    }
}

/// A filesystem object discovered under a rule root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Absolute path
    pub path: PathBuf,
    /// `/`-separated path relative to the root; empty for the root itself
    pub relative: String,
    pub basename: String,
    pub kind: CandidateKind,
    /// Levels below the root (0 for the root itself)
    pub depth: usize,
}

/// Result of enumerating one rule
#[derive(Debug, Default)]
pub struct Enumeration {
    pub candidates: Vec<Candidate>,
    /// Roots that do not exist
    pub missing_roots: Vec<PathBuf>,
    /// Entries that could not be read during the walk
    pub errors: Vec<String>,
}

/// Walks rule roots
#[derive(Debug, Default, Clone, Copy)]
pub struct PathEnumerator;

impl PathEnumerator {
    pub fn new() -> Self {
        Self
    }

    /// Enumerate every candidate of `rule`
    ///
    /// Calling this twice on an unchanged tree yields the same sequence.
    pub fn enumerate(&self, rule: &Rule) -> Enumeration {
        let mut out = Enumeration::default();

        for root in &rule.roots {
            let root = match fs::canonicalize(root) {
                Ok(root) => root,
                Err(e) => {
                    warn!(rule = rule.index, root = %root.display(), error = %e, "Root does not exist, skipping");
                    out.missing_roots.push(root.clone());
                    continue;
                }
            };

            self.walk_root(&root, rule.include_root, rule.depth, &mut out);
        }

        debug!(
            rule = rule.index,
            candidates = out.candidates.len(),
            "Enumerated candidates"
        );
        out
    }

    fn walk_root(&self, root: &Path, include_root: bool, depth: Depth, out: &mut Enumeration) {
        // walkdir raises max_depth to min_depth, so depth 0 without the root
        // would otherwise yield the root's children
        if !include_root && depth == Depth::Limited(0) {
            trace!(root = %root.display(), "Depth 0 with root excluded, nothing to walk");
            return;
        }

        let mut walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .min_depth(if include_root { 0 } else { 1 });
        if let Depth::Limited(limit) = depth {
            walker = walker.max_depth(limit as usize);
        }

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "Failed to read entry");
                    out.errors.push(e.to_string());
                    continue;
                }
            };

            let relative = relative_path(root, entry.path());
            let basename = entry.file_name().to_string_lossy().into_owned();
            let kind = CandidateKind::from_file_type(entry.file_type());

            trace!(path = %entry.path().display(), depth = entry.depth(), ?kind, "Candidate");
            out.candidates.push(Candidate {
                path: entry.path().to_path_buf(),
                relative,
                basename,
                kind,
                depth: entry.depth(),
            });
        }
    }
}

fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
