//! Output formatting for coverage results.

use std::fmt::Write;

use chrono::Utc;
use serde::Serialize;

use crate::error::Result;
use crate::model::{AggregatedCoverage, FunctionCoverage, StaticSummary};
use crate::targets::ActionTarget;

/// Everything a formatter needs, detached from the pipeline types.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageReport {
    pub generated_at: String,
    pub runs: Vec<String>,
    pub coverage_percent: f64,
    pub canonical_covered: usize,
    pub canonical_total: usize,
    pub bugs_total: usize,
    pub unknown_total: usize,
    pub summary: StaticSummary,
    /// Functions no run could map to a runtime definition.
    pub unmapped: Vec<String>,
    pub functions: Vec<FunctionCoverage>,
    pub targets: Vec<ActionTarget>,
}

impl CoverageReport {
    /// `targets` should already have exclusions applied.
    pub fn new(coverage: &AggregatedCoverage, targets: Vec<ActionTarget>) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            runs: coverage.runs.iter().map(|r| r.run.clone()).collect(),
            coverage_percent: coverage.coverage_percent(),
            canonical_covered: coverage.canonical_covered,
            canonical_total: coverage.canonical_total,
            bugs_total: coverage.bugs_total,
            unknown_total: coverage.unknown_total,
            summary: coverage.analysis.summary(),
            unmapped: coverage.unmapped().into_iter().map(str::to_string).collect(),
            functions: coverage.function_coverage(),
            targets,
        }
    }

    /// Format using a specific formatter.
    pub fn format(&self, formatter: &dyn ReportFormatter) -> Result<String> {
        formatter.format(self)
    }
}

/// Trait for formatting coverage reports.
pub trait ReportFormatter {
    /// Format the report to a string.
    fn format(&self, report: &CoverageReport) -> Result<String>;
}

/// Plain text formatter.
pub struct TextFormatter;

impl ReportFormatter for TextFormatter {
    fn format(&self, report: &CoverageReport) -> Result<String> {
        let mut out = String::new();

        let pct = report.coverage_percent;
        let covered = report.canonical_covered;
        let total = report.canonical_total;
        let runs = report.runs.len();
        writeln!(
            out,
            "Branch coverage: {pct:.1}% ({covered}/{total} canonical branches, {runs} runs)"
        )
        .unwrap();
        writeln!(out, "Bugs (unhandled input): {}", report.bugs_total).unwrap();
        writeln!(out, "Unknown crashes:        {}", report.unknown_total).unwrap();
        writeln!(out, "Excluded (impossible):  {}", report.summary.excluded_total).unwrap();

        if !report.unmapped.is_empty() {
            writeln!(out, "Unmapped functions:     {}", report.unmapped.len()).unwrap();
        }

        let partial: Vec<&FunctionCoverage> = report
            .functions
            .iter()
            .filter(|f| f.canonical_covered < f.canonical_total)
            .collect();
        if !partial.is_empty() {
            out.push('\n');
            writeln!(out, "{:<50} {:>8} {:>8}", "FUNCTION", "BRANCHES", "RATE").unwrap();
            writeln!(out, "{}", "-".repeat(68)).unwrap();
            for f in partial {
                writeln!(
                    out,
                    "{:<50} {:>8} {:>7.1}%",
                    f.name,
                    format!("{}/{}", f.canonical_covered, f.canonical_total),
                    f.percent()
                )
                .unwrap();
            }
        }

        if !report.targets.is_empty() {
            out.push('\n');
            out.push_str("Targets:\n");
            for t in &report.targets {
                let indexes: Vec<u32> = t.branches.iter().map(|b| b.branch_index).collect();
                writeln!(
                    out,
                    "  [{}] {}  branches: {}",
                    t.reason.as_str(),
                    t.function,
                    format_index_ranges(&indexes)
                )
                .unwrap();
            }
        }

        Ok(out)
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &CoverageReport) -> Result<String> {
        let mut out = serde_json::to_string_pretty(report)?;
        out.push('\n');
        Ok(out)
    }
}

/// Text rendering of the static-only counters.
#[must_use]
pub fn format_static_summary(summary: &StaticSummary) -> String {
    let mut out = String::new();
    writeln!(out, "Functions:           {}", summary.total_functions).unwrap();
    writeln!(out, "Branches:            {}", summary.total_branches).unwrap();
    writeln!(out, "  canonical:         {}", summary.canonical_total).unwrap();
    writeln!(out, "  unhandled input:   {}", summary.bugs_total).unwrap();
    writeln!(out, "  unknown crash:     {}", summary.unknown_total).unwrap();
    writeln!(out, "  excluded:          {}", summary.excluded_total).unwrap();
    writeln!(out, "  compiler generated: {}", summary.compiler_generated_total).unwrap();
    out
}

/// Format indexes into compact range notation, e.g. "0, 2-4".
///
/// The input slice must be sorted in ascending order.
#[must_use]
pub fn format_index_ranges(indexes: &[u32]) -> String {
    let mut ranges: Vec<(u32, u32)> = Vec::new();
    for &idx in indexes {
        match ranges.last_mut() {
            Some((_, end)) if idx == *end + 1 => *end = idx,
            _ => ranges.push((idx, idx)),
        }
    }

    ranges
        .iter()
        .map(|&(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{start}-{end}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::model::{BranchHit, BranchId, TestRunHits};
    use crate::parsers::case_tree;
    use crate::targets::actionable_targets;

    fn sample_report() -> CoverageReport {
        let analysis = case_tree::analyze(
            r#"Main.dispatch = [{arg:0}]: (%case !{arg:0} [(%concase Main.A 0 [] 1), (%concase Main.B 1 [] 2), (%concase Main.C 2 [] 3)] Just (CRASH "Unhandled input for Main.dispatch"))
Main.safe = [{arg:0}]: (%case !{arg:0} [(%concase Main.A 0 [] 1)] Just (CRASH "No clauses in Main.safe"))"#,
        )
        .unwrap();
        let run = TestRunHits {
            run: "unit".to_string(),
            hits: vec![
                BranchHit {
                    id: BranchId::new("Main", "dispatch", 0, 0),
                    hit_count: 2,
                },
                BranchHit {
                    id: BranchId::new("Main", "safe", 0, 0),
                    hit_count: 1,
                },
            ],
            unmapped: vec!["Main.helper".to_string()],
        };
        let coverage = aggregate(analysis, vec![run]);
        let targets = actionable_targets(&coverage);
        CoverageReport::new(&coverage, targets)
    }

    #[test]
    fn test_text_report() {
        let out = sample_report().format(&TextFormatter).unwrap();

        assert!(out.contains("Branch coverage: 50.0% (2/4 canonical branches, 1 runs)"));
        assert!(out.contains("Bugs (unhandled input): 1"));
        assert!(out.contains("Excluded (impossible):  1"));
        assert!(out.contains("Unmapped functions:     1"));
        assert!(out.contains("Main.dispatch"));
        assert!(out.contains("[uncovered] Main.dispatch  branches: 1-2"));
        assert!(out.contains("[unhandled-input] Main.dispatch  branches: 3"));
    }

    #[test]
    fn test_json_report() {
        let out = sample_report().format(&JsonFormatter).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value["canonical_total"], 4);
        assert_eq!(value["canonical_covered"], 2);
        assert_eq!(value["bugs_total"], 1);
        assert_eq!(value["unmapped"][0], "Main.helper");
        assert_eq!(value["targets"][0]["reason"], "uncovered_canonical");
        assert!(value["generated_at"].as_str().is_some());
    }

    #[test]
    fn test_format_index_ranges() {
        assert_eq!(format_index_ranges(&[]), "");
        assert_eq!(format_index_ranges(&[0, 2, 3, 4, 7]), "0, 2-4, 7");
    }

    #[test]
    fn test_static_summary_text() {
        let summary = sample_report().summary;
        let out = format_static_summary(&summary);
        assert!(out.contains("Functions:           2"));
        assert!(out.contains("  canonical:         4"));
    }
}
