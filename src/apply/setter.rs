//! ACL setter backends
//!
//! [`AclSetter`] is the only place the engine mutates the filesystem. The
//! default backend shells out to `setfacl`; a native binding can replace it
//! without touching planning.

use crate::error::{EnvironmentError, SetterError};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::trace;

/// Name of the native ACL tool
pub const SETFACL: &str = "setfacl";

/// One setter invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyRequest<'a> {
    pub path: &'a Path,
    /// Canonical entries, explicit mask already appended
    pub entries: &'a [String],
    /// Apply to the whole subtree (bulk strategy only)
    pub recursive: bool,
    /// Set default (inherited) entries
    pub default: bool,
    /// Do not recalculate the mask
    pub no_mask_recalc: bool,
}

/// Applies entries to a path
pub trait AclSetter: Send + Sync {
    fn set_acl(&self, request: &ApplyRequest<'_>) -> Result<(), SetterError>;
}

/// `setfacl` process backend
#[derive(Debug, Clone)]
pub struct SetfaclCommand {
    program: PathBuf,
}

impl SetfaclCommand {
    /// Find `setfacl` on `PATH`
    pub fn locate() -> Result<Self, EnvironmentError> {
        which::which(SETFACL)
            .map(Self::with_program)
            .map_err(|e| EnvironmentError::new(SETFACL, e.to_string()))
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments for one invocation; the path is passed through untouched
    pub fn args(request: &ApplyRequest<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::with_capacity(8);
        if request.recursive {
            // never follow symlinks met during the walk
            args.push("-R".into());
            args.push("-P".into());
        }
        if request.default {
            args.push("-d".into());
        }
        if request.no_mask_recalc {
            args.push("-n".into());
        }
        args.push("-m".into());
        args.push(request.entries.join(",").into());
        args.push("--".into());
        args.push(request.path.as_os_str().to_os_string());
        args
    }
}

impl AclSetter for SetfaclCommand {
    fn set_acl(&self, request: &ApplyRequest<'_>) -> Result<(), SetterError> {
        let args = Self::args(request);
        trace!(program = %self.program.display(), ?args, "Running setter");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| SetterError::new(request.path, format!("failed to launch {}: {}", SETFACL, e)))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("{} exited with {}", SETFACL, output.status)
        } else {
            stderr
        };
        Err(SetterError::new(request.path, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_per_path() {
        let entries = vec!["u:alice:rwx".to_string(), "g::r-x".to_string()];
        let request = ApplyRequest {
            path: Path::new("/srv/data"),
            entries: &entries,
            recursive: false,
            default: false,
            no_mask_recalc: false,
        };
        assert_eq!(
            SetfaclCommand::args(&request),
            ["-m", "u:alice:rwx,g::r-x", "--", "/srv/data"].map(OsString::from)
        );
    }

    #[test]
    fn test_args_all_flags() {
        let entries = vec!["g:team:rwx".to_string()];
        let request = ApplyRequest {
            path: Path::new("/d"),
            entries: &entries,
            recursive: true,
            default: true,
            no_mask_recalc: true,
        };
        assert_eq!(
            SetfaclCommand::args(&request),
            ["-R", "-P", "-d", "-n", "-m", "g:team:rwx", "--", "/d"].map(OsString::from)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_args_keep_non_utf8_path_bytes() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new(OsStr::from_bytes(b"/srv/caf\xe9"));
        let entries = vec!["o::r".to_string()];
        let request = ApplyRequest {
            path,
            entries: &entries,
            recursive: false,
            default: false,
            no_mask_recalc: false,
        };
        let args = SetfaclCommand::args(&request);
        assert_eq!(args.last().unwrap().as_bytes(), b"/srv/caf\xe9");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_program_reports_error() {
        let setter = SetfaclCommand::with_program("false");
        let entries = vec!["o::r".to_string()];
        let request = ApplyRequest {
            path: Path::new("/tmp"),
            entries: &entries,
            recursive: false,
            default: false,
            no_mask_recalc: false,
        };
        let err = setter.set_acl(&request).unwrap_err();
        assert_eq!(err.path, Path::new("/tmp"));
    }

    #[test]
    fn test_missing_program_reports_error() {
        let setter = SetfaclCommand::with_program("/nonexistent/setfacl-binary");
        let entries = vec!["o::r".to_string()];
        let request = ApplyRequest {
            path: Path::new("/tmp"),
            entries: &entries,
            recursive: false,
            default: false,
            no_mask_recalc: false,
        };
        let err = setter.set_acl(&request).unwrap_err();
        assert!(err.message.contains("failed to launch"));
    }
}
