//! Actionable follow-ups derived from an aggregated coverage result.
//!
//! Exclusion patterns only hide compiler-generated targets from this list.
//! They run after aggregation and never touch any counter.

use serde::Serialize;

use crate::config::ExclusionPattern;
use crate::model::{AggregatedCoverage, BranchClass, BranchId, ClassifiedBranch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetReason {
    /// Reachable branches no run has hit yet.
    UncoveredCanonical,
    /// A partial function: the fallback is a possible real defect.
    UnhandledInput,
    /// A fallback whose message we could not classify.
    UnknownCrash,
    /// Branches of a compiler-generated function.
    CompilerGenerated,
}

impl TargetReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetReason::UncoveredCanonical => "uncovered",
            TargetReason::UnhandledInput => "unhandled-input",
            TargetReason::UnknownCrash => "unknown-crash",
            TargetReason::CompilerGenerated => "compiler-generated",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionTarget {
    pub function: String,
    pub reason: TargetReason,
    pub branches: Vec<BranchId>,
}

/// Targets in function order; within a function, in `TargetReason` order.
pub fn actionable_targets(coverage: &AggregatedCoverage) -> Vec<ActionTarget> {
    let mut targets = Vec::new();

    for function in &coverage.analysis.functions {
        for reason in [
            TargetReason::UncoveredCanonical,
            TargetReason::UnhandledInput,
            TargetReason::UnknownCrash,
            TargetReason::CompilerGenerated,
        ] {
            let branches: Vec<BranchId> = function
                .branches
                .iter()
                .filter(|b| needs_attention(reason, b, coverage))
                .map(|b| b.id.clone())
                .collect();
            if !branches.is_empty() {
                targets.push(ActionTarget {
                    function: function.full_name.clone(),
                    reason,
                    branches,
                });
            }
        }
    }

    targets
}

fn needs_attention(
    reason: TargetReason,
    branch: &ClassifiedBranch,
    coverage: &AggregatedCoverage,
) -> bool {
    match reason {
        TargetReason::UncoveredCanonical => {
            branch.class.is_canonical() && !coverage.is_covered(&branch.id)
        }
        TargetReason::UnhandledInput => matches!(branch.class, BranchClass::BugUnhandledInput),
        TargetReason::UnknownCrash => matches!(branch.class, BranchClass::UnknownCrash(_)),
        TargetReason::CompilerGenerated => {
            matches!(branch.class, BranchClass::CompilerGenerated)
                && !coverage.is_covered(&branch.id)
        }
    }
}

/// Drop compiler-generated targets whose function matches any pattern.
pub fn apply_exclusions(
    targets: Vec<ActionTarget>,
    exclusions: &[ExclusionPattern],
) -> Vec<ActionTarget> {
    targets
        .into_iter()
        .filter(|t| {
            t.reason != TargetReason::CompilerGenerated
                || !exclusions.iter().any(|p| p.matches(&t.function))
        })
        .collect()
}
