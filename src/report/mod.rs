//! Result aggregation and reporting
//!
//! Per-rule summaries and the final [`RunReport`], rendered as text, a single
//! JSON document, or JSON Lines (one object per rule as it completes, then a
//! summary line).

pub mod metrics;

pub use metrics::{MetricsSnapshot, RunMetrics, success_rate};

use crate::config::OutputFormat;
use crate::plan::Strategy;
use serde::Serialize;
use std::io::{self, BufWriter, Write};
use std::time::{Duration, SystemTime};

/// Final state of one rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    Success,
    Failed,
    Skipped,
}

impl RuleStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RuleStatus::Success => "success",
            RuleStatus::Failed => "failed",
            RuleStatus::Skipped => "skipped",
        }
    }

    /// Derive the status from a rule's own counters
    pub fn from_metrics(metrics: &MetricsSnapshot, had_work: bool) -> Self {
        if metrics.paths_failed > 0 || metrics.entries_failed > 0 {
            RuleStatus::Failed
        } else if !had_work {
            RuleStatus::Skipped
        } else {
            RuleStatus::Success
        }
    }
}

/// Canonical entries a rule applied, per target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntrySpecs {
    pub files: Vec<String>,
    pub directories: Vec<String>,
    pub defaults: Vec<String>,
}

/// Outcome of one rule
#[derive(Debug, Clone, Serialize)]
pub struct RuleSummary {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub status: RuleStatus,
    pub strategy: Strategy,
    pub roots: Vec<String>,
    pub entry_specs: EntrySpecs,
    pub metrics: MetricsSnapshot,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl RuleSummary {
    pub fn label(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("rule[{}]", self.index))
    }
}

/// Run metadata
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub tool: &'static str,
    pub version: &'static str,
    /// Seconds since the Unix epoch at run start
    pub timestamp: u64,
    pub duration_ms: u64,
    pub exit_code: i32,
    pub dry_run: bool,
}

impl ReportMetadata {
    pub fn new(started: SystemTime, duration: Duration, exit_code: i32, dry_run: bool) -> Self {
        Self {
            tool: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            timestamp: started
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            duration_ms: duration.as_millis() as u64,
            exit_code,
            dry_run,
        }
    }
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub metadata: ReportMetadata,
    /// Snapshot of the rule document
    pub config: serde_json::Value,
    pub rules: Vec<RuleSummary>,
    pub metrics: MetricsSnapshot,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl RunReport {
    pub fn exit_code(&self) -> i32 {
        self.metadata.exit_code
    }

    /// Write the pretty JSON report and flush it, so a short write is an error
    pub fn write_to<W: Write>(&self, out: W) -> io::Result<()> {
        let mut writer = BufWriter::new(out);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

/// Tagged line for JSON Lines output
#[derive(Serialize)]
struct Line<'a, T: Serialize> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    body: &'a T,
}

#[derive(Serialize)]
struct SummaryBody<'a> {
    metadata: &'a ReportMetadata,
    metrics: &'a MetricsSnapshot,
    warnings: &'a [String],
    errors: &'a [String],
}

/// Writes report output in the selected format
pub struct Reporter<W: Write> {
    format: OutputFormat,
    quiet: bool,
    out: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(format: OutputFormat, quiet: bool, out: W) -> Self {
        Self { format, quiet, out }
    }

    /// Called as each rule completes
    pub fn rule_completed(&mut self, summary: &RuleSummary) -> io::Result<()> {
        match self.format {
            OutputFormat::Jsonl => {
                let line = Line {
                    kind: "rule",
                    body: summary,
                };
                serde_json::to_writer(&mut self.out, &line)?;
                writeln!(self.out)?;
            }
            OutputFormat::Text if !self.quiet => {
                let m = &summary.metrics;
                writeln!(
                    self.out,
                    "[{}] {} ({}): {} applied, {} failed, {} skipped",
                    summary.status.as_str(),
                    summary.label(),
                    summary.strategy,
                    m.paths_applied,
                    m.paths_failed,
                    m.paths_skipped,
                )?;
                for error in &summary.errors {
                    writeln!(self.out, "    error: {}", error)?;
                }
            }
            OutputFormat::Text | OutputFormat::Json => {}
        }
        self.out.flush()
    }

    /// Called once with the final report
    pub fn finish(&mut self, report: &RunReport) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut self.out, report)?;
                writeln!(self.out)?;
            }
            OutputFormat::Jsonl => {
                let body = SummaryBody {
                    metadata: &report.metadata,
                    metrics: &report.metrics,
                    warnings: &report.warnings,
                    errors: &report.errors,
                };
                let line = Line {
                    kind: "summary",
                    body: &body,
                };
                serde_json::to_writer(&mut self.out, &line)?;
                writeln!(self.out)?;
            }
            OutputFormat::Text => self.write_text_summary(report)?,
        }
        self.out.flush()
    }

    fn write_text_summary(&mut self, report: &RunReport) -> io::Result<()> {
        let m = &report.metrics;
        if report.metadata.dry_run {
            writeln!(self.out, "Dry run: no permissions were changed")?;
        }
        writeln!(
            self.out,
            "Rules: {} | Paths: {} applied, {} failed, {} skipped",
            report.rules.len(),
            m.paths_applied,
            m.paths_failed,
            m.paths_skipped
        )?;
        writeln!(
            self.out,
            "Entries: {}/{} ok ({:.1}%) | bulk rules: {} | cache hits: {}",
            m.entries_ok, m.entries_attempted, m.success_rate, m.bulk_rules, m.cache_hits
        )?;
        if !self.quiet {
            for warning in &report.warnings {
                writeln!(self.out, "warning: {}", warning)?;
            }
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
