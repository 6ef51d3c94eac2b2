//! Command handler functions for the casecov CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::config::{CoverageConfig, ExclusionPattern};
use crate::error::CasecovError;
use crate::ingest::{self, RunArtifacts};
use crate::mangle::ManglingScheme;
use crate::report::{self, CoverageReport, JsonFormatter, ReportFormatter, TextFormatter};
use crate::targets;

/// Output style for the `report` command.
#[derive(Clone, ValueEnum)]
pub enum Style {
    Text,
    Json,
}

/// Inputs of the `report` command.
pub struct ReportArgs {
    pub dump: PathBuf,
    /// `NAME=DIR` or `DIR`, one per test run.
    pub runs: Vec<String>,
    pub style: Style,
    pub exclude: Vec<String>,
    pub config: Option<PathBuf>,
    pub mangling: Option<ManglingScheme>,
}

/// Merge the optional config file with CLI overrides.
fn resolve_config(args: &ReportArgs) -> Result<CoverageConfig> {
    let mut config = match &args.config {
        Some(path) => CoverageConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => CoverageConfig::default(),
    };
    if let Some(scheme) = args.mangling {
        config.mangling = scheme;
    }
    config
        .exclude
        .extend(args.exclude.iter().map(|p| ExclusionPattern::from_cli(p)));
    Ok(config)
}

pub fn cmd_analyze(dump: &Path) -> Result<String> {
    let analysis = ingest::load_dump(dump)
        .with_context(|| format!("Failed to analyze {}", dump.display()))?;
    Ok(report::format_static_summary(&analysis.summary()))
}

pub fn cmd_report(args: &ReportArgs) -> Result<String> {
    if args.runs.is_empty() {
        return Err(CasecovError::MissingArtifact("no test runs given".to_string()).into());
    }
    let config = resolve_config(args)?;

    let analysis = ingest::load_dump(&args.dump)
        .with_context(|| format!("Failed to analyze {}", args.dump.display()))?;

    let runs = args
        .runs
        .iter()
        .map(|arg| {
            let (name, dir) = ingest::parse_run_arg(arg);
            ingest::load_run(&name, &dir)
                .with_context(|| format!("Failed to load run '{}' from {}", name, dir.display()))
        })
        .collect::<Result<Vec<RunArtifacts>>>()?;

    let mangler = config.mangling.mangler();
    let coverage = ingest::compute_coverage(analysis, &runs, mangler.as_ref())?;

    let targets = targets::apply_exclusions(
        targets::actionable_targets(&coverage),
        &config.exclusions(),
    );
    let report = CoverageReport::new(&coverage, targets);

    let formatter: &dyn ReportFormatter = match args.style {
        Style::Text => &TextFormatter,
        Style::Json => &JsonFormatter,
    };
    Ok(report.format(formatter)?)
}

pub fn cmd_mangle(names: &[String], scheme: ManglingScheme) -> Result<String> {
    let mangler = scheme.mangler();

    let mut out = String::new();
    for name in names {
        writeln!(out, "{}\t{}", name, mangler.mangle(name)).unwrap();
    }
    Ok(out)
}
