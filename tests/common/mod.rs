#![allow(dead_code)]

use std::path::Path;

use casecov::ingest::RunArtifacts;
use casecov::model::StaticBranchAnalysis;
use tempfile::TempDir;

pub const CASES: &str = include_str!("../fixtures/cases.txt");
pub const DEFINITIONS: &str = include_str!("../fixtures/runs/unit/main.ss");
pub const UNIT_HTML: &str = include_str!("../fixtures/runs/unit/main.ss.html");
pub const PROPS_HTML: &str = include_str!("../fixtures/runs/props/main.ss.html");

pub fn analysis() -> StaticBranchAnalysis {
    casecov::parsers::case_tree::analyze(CASES).unwrap()
}

pub fn run(name: &str, annotated: &str) -> RunArtifacts {
    RunArtifacts {
        name: name.to_string(),
        annotated: annotated.to_string(),
        definitions: DEFINITIONS.to_string(),
    }
}

/// Lay out the fixtures on disk the way a build leaves them: one dump file
/// and a directory per test run. The caller must hold onto `TempDir`.
pub fn setup_workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("cases.txt"), CASES).unwrap();
    write_run(dir.path(), "unit", UNIT_HTML);
    write_run(dir.path(), "props", PROPS_HTML);
    dir
}

fn write_run(root: &Path, name: &str, annotated: &str) {
    let run_dir = root.join(name);
    std::fs::create_dir(&run_dir).unwrap();
    std::fs::write(run_dir.join("main.ss.html"), annotated).unwrap();
    std::fs::write(run_dir.join("main.ss"), DEFINITIONS).unwrap();
}
