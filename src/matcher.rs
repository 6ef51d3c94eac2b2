//! Attribute runtime profiler hits to statically-known functions.
//!
//! Each function's runtime definition is located by its mangled name, and
//! the annotated lines between that definition and the next one are taken
//! as the function's body.

use std::ops::Bound;

use crate::mangle::Mangler;
use crate::model::{BranchHit, CompiledFunction, StaticBranchAnalysis, TestRunHits};
use crate::parsers::profile::{Definition, ProfileData};

/// The runtime definition a function was attributed to, with the line
/// totals of its range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRange {
    pub runtime_id: String,
    pub start_line: u32,
    /// Exclusive; `None` runs to the end of the file.
    pub end_line: Option<u32>,
    pub executed: u64,
    pub total: u64,
    pub canonical_count: usize,
    /// `canonical_count` scaled by `executed / total`, rounded down. Only an
    /// approximation: line-level data cannot tell which branch ran.
    pub approximate_executed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionMatch {
    Matched(MatchedRange),
    /// No runtime definition carries this function's name. Never counted
    /// as covered.
    UnknownMapping,
}

/// Index of the definition for `expected`: an exact match if there is
/// one, otherwise the first whose id ends with `expected`. Infix matches
/// are never accepted.
pub fn find_definition(expected: &str, definitions: &[Definition]) -> Option<usize> {
    definitions
        .iter()
        .position(|d| d.runtime_id == expected)
        .or_else(|| {
            definitions
                .iter()
                .position(|d| d.runtime_id.ends_with(expected))
        })
}

/// First definition line after `start`, if any.
fn next_definition_line(start: u32, definitions: &[Definition]) -> Option<u32> {
    definitions
        .iter()
        .map(|d| d.line)
        .filter(|&line| line > start)
        .min()
}

/// Match one function against a run's profile.
pub fn match_function(
    function: &CompiledFunction,
    profile: &ProfileData,
    mangler: &dyn Mangler,
) -> FunctionMatch {
    let expected = mangler.mangle(&function.full_name);
    let Some(idx) = find_definition(&expected, &profile.definitions) else {
        return FunctionMatch::UnknownMapping;
    };
    let definition = &profile.definitions[idx];
    let start_line = definition.line;
    let end_line = next_definition_line(start_line, &profile.definitions);

    let upper = match end_line {
        Some(end) => Bound::Excluded(end),
        None => Bound::Unbounded,
    };
    let (executed, total) = profile
        .lines
        .range((Bound::Included(start_line), upper))
        .fold((0, 0), |(executed, total), (_, stats)| {
            (executed + stats.executed, total + stats.total)
        });

    let canonical_count = function.canonical_count();
    let approximate_executed = if total == 0 {
        0
    } else {
        (canonical_count as u64 * executed / total) as usize
    };

    FunctionMatch::Matched(MatchedRange {
        runtime_id: definition.runtime_id.clone(),
        start_line,
        end_line,
        executed,
        total,
        canonical_count,
        approximate_executed,
    })
}

/// Match every function of the analysis against one run's profile.
///
/// A matched function with `approximate_executed = k` contributes a hit for
/// its first `k` canonical branches, in branch order.
pub fn match_run(
    analysis: &StaticBranchAnalysis,
    run: &str,
    profile: &ProfileData,
    mangler: &dyn Mangler,
) -> TestRunHits {
    let mut hits = TestRunHits {
        run: run.to_string(),
        ..Default::default()
    };

    for function in &analysis.functions {
        match match_function(function, profile, mangler) {
            FunctionMatch::Matched(range) => {
                hits.hits.extend(
                    function
                        .canonical_branches()
                        .take(range.approximate_executed)
                        .map(|b| BranchHit {
                            id: b.id.clone(),
                            hit_count: range.executed,
                        }),
                );
            }
            FunctionMatch::UnknownMapping => {
                if function.canonical_count() > 0 {
                    log::warn!(
                        "run '{}': no runtime definition for {} (expected {})",
                        run,
                        function.full_name,
                        mangler.mangle(&function.full_name)
                    );
                } else {
                    log::debug!("run '{}': no runtime definition for {}", run, function.full_name);
                }
                hits.unmapped.push(function.full_name.clone());
            }
        }
    }

    log::info!(
        "run '{}': {} branch hits, {} unmapped functions",
        run,
        hits.hits.len(),
        hits.unmapped.len()
    );
    hits
}
