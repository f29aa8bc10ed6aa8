//! acl-rollout
//!
//! Applies a declarative ACL rule document to filesystem trees.

use acl_rollout::{
    AclSetter, AppError, Engine, RuleCache, SetfaclCommand,
    apply::SETFACL,
    config::{LogFormat, OutputFormat, RunConfig, DEFAULT_BATCH_SIZE, load_config},
    error::{EXIT_IO, EXIT_SUCCESS, EXIT_USAGE},
    report::Reporter,
    rules::{ApplyOrder, MaskMode},
    walk::ScopeFilter,
};
use anyhow::Context;
use clap::Parser;
use clap::builder::TypedValueParser;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Apply declarative ACL rules to filesystem trees
#[derive(Parser, Debug)]
#[command(name = "acl-rollout")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the rule document (JSON, or TOML with a .toml extension)
    #[arg(short, long, env = "ACL_ROLLOUT_CONFIG")]
    config: String,

    /// Plan and report without changing any permissions
    #[arg(short = 'n', long, env = "ACL_ROLLOUT_DRY_RUN")]
    dry_run: bool,

    /// Mask handling: auto, skip, or explicit:<perms>
    #[arg(long, env = "ACL_ROLLOUT_MASK", default_value = "auto")]
    mask: MaskMode,

    /// Output format (text, json, jsonl)
    #[arg(short, long, env = "ACL_ROLLOUT_OUTPUT", default_value = "text")]
    output: OutputFormat,

    /// Only touch objects at or below this path (repeatable)
    #[arg(long = "scope", value_name = "PATH")]
    scope: Vec<PathBuf>,

    /// Maximum entries per setter invocation
    #[arg(long, env = "ACL_ROLLOUT_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE,
          value_parser = clap::value_parser!(u64).range(1..).map(|v| v as usize))]
    batch_size: usize,

    /// Override the application order (shallow_to_deep, deep_to_shallow)
    #[arg(long, env = "ACL_ROLLOUT_ORDER")]
    order: Option<ApplyOrder>,

    /// Only print warnings, errors and the final summary
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log format (pretty, json)
    #[arg(long, env = "ACL_ROLLOUT_LOG_FORMAT", default_value = "pretty")]
    log_format: LogFormat,

    /// Also write the JSON report to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

fn init_logging(args: &Args) {
    let level = if args.quiet {
        "warn"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    match args.log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_writer(io::stderr)).init(),
    }
}

fn run(args: Args) -> anyhow::Result<i32> {
    info!(version = env!("CARGO_PKG_VERSION"), "Starting acl-rollout");

    // Load and parse the rule document
    let document = load_config(&args.config)
        .map_err(AppError::from)
        .inspect_err(|e| error!(error = %e, "Failed to load configuration"))?;
    let cache = RuleCache::new(&document)
        .map_err(AppError::from)
        .inspect_err(|e| error!(error = %e, "Invalid rule document"))?;

    let run_config = RunConfig {
        dry_run: args.dry_run,
        mask_mode: args.mask.clone(),
        output: args.output,
        scope: args.scope.clone(),
        batch_size: args.batch_size,
        apply_order: args.order,
        quiet: args.quiet,
        verbose: args.verbose,
    };

    let scope = ScopeFilter::new(&run_config.scope)
        .map_err(AppError::from)
        .inspect_err(|e| error!(error = %e, "Invalid path scope"))?;

    // The setter is never invoked in dry-run, so a missing binary is fine there
    let setter = if run_config.dry_run {
        SetfaclCommand::locate().unwrap_or_else(|_| SetfaclCommand::with_program(SETFACL))
    } else {
        SetfaclCommand::locate()
            .map_err(AppError::from)
            .inspect_err(|e| error!(error = %e, "Environment check failed"))?
    };
    info!(setter = %setter.program().display(), "Using ACL setter");
    let setter: &dyn AclSetter = &setter;

    let engine = Engine::new(&cache, &run_config, &scope, setter);
    let mut reporter = Reporter::new(run_config.output, run_config.quiet, io::stdout().lock());

    let report = engine.run_with(&mut |summary| {
        if let Err(e) = reporter.rule_completed(summary) {
            warn!(error = %e, "Failed to write rule summary");
        }
    });

    reporter
        .finish(&report)
        .map_err(AppError::from)
        .context("writing report to stdout")?;

    if let Some(path) = &args.report {
        let file = File::create(path)
            .map_err(AppError::from)
            .with_context(|| format!("creating report file {}", path.display()))?;
        report
            .write_to(file)
            .map_err(AppError::from)
            .with_context(|| format!("writing report file {}", path.display()))?;
    }

    Ok(report.exit_code())
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_USAGE as u8)
            } else {
                ExitCode::from(EXIT_SUCCESS as u8)
            };
        }
    };

    init_logging(&args);

    match run(args) {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            let code = e
                .downcast_ref::<AppError>()
                .map(AppError::exit_code)
                .unwrap_or(EXIT_IO);
            eprintln!("error: {:#}", e);
            ExitCode::from(code as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_size_parsing() {
        let args = Args::try_parse_from(["acl-rollout", "-c", "rules.json", "--batch-size", "5"])
            .unwrap();
        assert_eq!(args.batch_size, 5);

        let args = Args::try_parse_from(["acl-rollout", "-c", "rules.json"]).unwrap();
        assert_eq!(args.batch_size, DEFAULT_BATCH_SIZE);

        let err = Args::try_parse_from(["acl-rollout", "-c", "rules.json", "--batch-size", "0"])
            .unwrap_err();
        assert!(err.use_stderr());
    }
}
