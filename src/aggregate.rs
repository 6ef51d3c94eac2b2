//! Combine the hits of independent test runs into one coverage result.
//!
//! Runs are merged with OR semantics: a branch is covered when any run hit
//! it at least once. Hit counts are never summed, so the union is
//! commutative, associative and idempotent, and runs may be folded in any
//! order.

use std::collections::BTreeSet;

use crate::model::{AggregatedCoverage, BranchId, StaticBranchAnalysis, TestRunHits};

/// Union of every branch hit at least once across `runs`.
pub fn merge_branch_hits<'a, I>(runs: I) -> BTreeSet<BranchId>
where
    I: IntoIterator<Item = &'a TestRunHits>,
{
    runs.into_iter()
        .flat_map(|run| run.hits.iter())
        .filter(|hit| hit.hit_count > 0)
        .map(|hit| hit.id.clone())
        .collect()
}

/// Fold all runs into the final coverage value. Totals come from the
/// static analysis alone; runtime data only decides what is covered.
pub fn aggregate(analysis: StaticBranchAnalysis, runs: Vec<TestRunHits>) -> AggregatedCoverage {
    let covered = merge_branch_hits(&runs);
    let canonical_covered = analysis
        .branches
        .iter()
        .filter(|b| b.class.is_canonical() && covered.contains(&b.id))
        .count();

    AggregatedCoverage {
        canonical_total: analysis.canonical_total,
        canonical_covered,
        bugs_total: analysis.bugs_total(),
        unknown_total: analysis.unknown_total(),
        analysis,
        runs,
        covered,
    }
}
