//! Report output tests

use acl_rollout::apply::{AclSetter, ApplyRequest};
use acl_rollout::config::{FileFormat, OutputFormat, RunConfig, load_config_from_str};
use acl_rollout::error::SetterError;
use acl_rollout::report::Reporter;
use acl_rollout::rules::RuleCache;
use acl_rollout::walk::ScopeFilter;
use acl_rollout::{Engine, RunReport};
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Rejects every path so reports always carry errors
struct DenyingSetter;

impl AclSetter for DenyingSetter {
    fn set_acl(&self, request: &ApplyRequest<'_>) -> Result<(), SetterError> {
        Err(SetterError::new(request.path, "Operation not supported"))
    }
}

fn render(format: OutputFormat, quiet: bool, root: &Path, dry_run: bool) -> (RunReport, String) {
    let document = json!({ "rules": [
        { "id": "share", "roots": [root], "recurse": true, "acl": ["g:team:rwx"] },
        { "id": "gone", "roots": [root.join("missing")], "acl": ["o::r"] }
    ] });
    let document = load_config_from_str(&document.to_string(), FileFormat::Json).unwrap();
    let cache = RuleCache::new(&document).unwrap();
    let run = RunConfig {
        dry_run,
        ..Default::default()
    };
    let scope = ScopeFilter::unrestricted();
    let engine = Engine::new(&cache, &run, &scope, &DenyingSetter);

    let mut reporter = Reporter::new(format, quiet, Vec::new());
    let report = engine.run_with(&mut |summary| reporter.rule_completed(summary).unwrap());
    reporter.finish(&report).unwrap();

    (report, String::from_utf8(reporter.into_inner()).unwrap())
}

fn tree() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), "").unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    (dir, root)
}

#[test]
fn test_json_report_document() {
    let (_dir, root) = tree();
    let (report, out) = render(OutputFormat::Json, false, &root, false);

    let value: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["metadata"]["tool"], "acl-rollout");
    assert_eq!(value["metadata"]["exit_code"], 1);
    assert_eq!(value["metadata"]["dry_run"], false);
    assert_eq!(value["rules"].as_array().unwrap().len(), 2);
    assert_eq!(value["rules"][0]["status"], "failed");
    assert_eq!(value["rules"][0]["strategy"], "bulk");
    assert_eq!(value["rules"][0]["entry_specs"]["files"][0], "g:team:rwx");
    assert_eq!(value["rules"][1]["status"], "skipped");
    assert_eq!(value["metrics"]["paths_failed"], 1);
    assert_eq!(value["metrics"]["success_rate"], 0.0);
    assert_eq!(value["config"]["rules"][0]["id"], "share");
    assert_eq!(value["errors"].as_array().unwrap().len(), report.errors.len());
    assert!(!value["warnings"].as_array().unwrap().is_empty());
}

#[test]
fn test_jsonl_streams_rules_then_summary() {
    let (_dir, root) = tree();
    let (_, out) = render(OutputFormat::Jsonl, false, &root, true);

    let lines: Vec<Value> = out
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["type"], "rule");
    assert_eq!(lines[0]["id"], "share");
    assert_eq!(lines[0]["status"], "success");
    assert_eq!(lines[1]["type"], "rule");
    assert_eq!(lines[1]["id"], "gone");
    assert_eq!(lines[2]["type"], "summary");
    assert_eq!(lines[2]["metadata"]["exit_code"], 0);
    assert_eq!(lines[2]["metadata"]["dry_run"], true);
}

#[test]
fn test_text_output() {
    let (_dir, root) = tree();
    let (_, out) = render(OutputFormat::Text, false, &root, false);

    assert!(out.contains("[failed] share (bulk): 0 applied, 1 failed, 0 skipped"));
    assert!(out.contains("error: Failed to set ACL"));
    assert!(out.contains("[skipped] gone (per_path)"));
    assert!(out.contains("Rules: 2 | Paths: 0 applied, 1 failed"));
    assert!(out.contains("warning: gone:"));
}

#[test]
fn test_text_quiet_keeps_summary_only() {
    let (_dir, root) = tree();
    let (_, out) = render(OutputFormat::Text, true, &root, true);

    assert!(out.starts_with("Dry run: no permissions were changed"));
    assert!(!out.contains("[success]"));
    assert!(!out.contains("warning:"));
    assert!(out.contains("Rules: 2"));
}
