mod common;

use std::collections::BTreeSet;

use casecov::aggregate::{aggregate, merge_branch_hits};
use casecov::model::{BranchHit, BranchId, TestRunHits};
use proptest::prelude::*;

/// Build runs whose hits point at branches of the fixture analysis.
fn runs_from(picks: &[Vec<(usize, u64)>]) -> Vec<TestRunHits> {
    let analysis = common::analysis();
    picks
        .iter()
        .enumerate()
        .map(|(i, hits)| TestRunHits {
            run: format!("run-{i}"),
            hits: hits
                .iter()
                .map(|&(idx, hit_count)| BranchHit {
                    id: analysis.branches[idx % analysis.branches.len()].id.clone(),
                    hit_count,
                })
                .collect(),
            unmapped: Vec::new(),
        })
        .collect()
}

fn picks_strategy() -> impl Strategy<Value = Vec<Vec<(usize, u64)>>> {
    prop::collection::vec(prop::collection::vec((0usize..64, 0u64..4), 0..8), 0..5)
}

proptest! {
    #[test]
    fn merge_is_commutative(picks in picks_strategy()) {
        let runs = runs_from(&picks);
        let mut reversed = runs.clone();
        reversed.reverse();
        prop_assert_eq!(merge_branch_hits(&runs), merge_branch_hits(&reversed));
    }

    #[test]
    fn merge_ignores_run_order(
        (runs, shuffled) in picks_strategy().prop_flat_map(|picks| {
            let runs = runs_from(&picks);
            (Just(runs.clone()), Just(runs).prop_shuffle())
        })
    ) {
        prop_assert_eq!(merge_branch_hits(&runs), merge_branch_hits(&shuffled));
    }

    #[test]
    fn merging_groups_equals_merging_all(
        picks in picks_strategy(),
        groups in prop::collection::vec(0usize..3, 5),
    ) {
        let runs = runs_from(&picks);
        let mut partitions: Vec<Vec<TestRunHits>> = vec![Vec::new(); 3];
        for (i, run) in runs.iter().enumerate() {
            partitions[groups[i % groups.len()]].push(run.clone());
        }

        let fanned_in: BTreeSet<BranchId> = partitions
            .iter()
            .flat_map(|group| merge_branch_hits(group))
            .collect();
        prop_assert_eq!(fanned_in, merge_branch_hits(&runs));
    }

    #[test]
    fn merge_is_idempotent(picks in picks_strategy()) {
        let runs = runs_from(&picks);
        let doubled: Vec<TestRunHits> = runs.iter().chain(runs.iter()).cloned().collect();
        prop_assert_eq!(merge_branch_hits(&runs), merge_branch_hits(&doubled));
    }

    #[test]
    fn coverage_is_monotonic_and_bounded(picks in picks_strategy()) {
        let runs = runs_from(&picks);
        let mut previous = 0;
        for n in 0..=runs.len() {
            let coverage = aggregate(common::analysis(), runs[..n].to_vec());
            let pct = coverage.coverage_percent();
            prop_assert!((0.0..=100.0).contains(&pct));
            prop_assert!(coverage.canonical_covered >= previous);
            prop_assert!(coverage.canonical_covered <= coverage.canonical_total);
            previous = coverage.canonical_covered;
        }
    }
}

#[test]
fn fixture_runs_merge_with_or_semantics() {
    let analysis = common::analysis();
    let mangler = casecov::mangle::UniformMangler;

    let unit = common::run("unit", common::UNIT_HTML)
        .hits(&analysis, &mangler)
        .unwrap();
    let props = common::run("props", common::PROPS_HTML)
        .hits(&analysis, &mangler)
        .unwrap();

    let unit_only = aggregate(analysis.clone(), vec![unit.clone()]);
    let props_only = aggregate(analysis.clone(), vec![props.clone()]);
    let both = aggregate(analysis, vec![unit, props]);

    assert_eq!(unit_only.canonical_covered, 4);
    assert_eq!(props_only.canonical_covered, 4);
    assert_eq!(both.canonical_covered, 7);
    assert_eq!(both.canonical_total, 8);
    assert_eq!(both.coverage_percent(), 87.5);
    assert_eq!(both.bugs_total, 1);
    assert_eq!(both.unknown_total, 1);
    assert_eq!(both.unmapped().into_iter().collect::<Vec<_>>(), vec!["Main.weird"]);
}

#[test]
fn empty_canonical_total_reports_full_coverage() {
    let analysis = casecov::parsers::case_tree::analyze(
        r#"Main.absurd = [{arg:0}]: (CRASH "No clauses in Main.absurd")"#,
    )
    .unwrap();
    let coverage = aggregate(analysis, Vec::new());
    assert_eq!(coverage.coverage_percent(), 100.0);
}
