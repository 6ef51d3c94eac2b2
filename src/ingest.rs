//! Loading artifacts from disk and running the whole pipeline.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::aggregate::aggregate;
use crate::detect::{detect_kind, ArtifactKind};
use crate::error::{CasecovError, Result};
use crate::mangle::Mangler;
use crate::matcher::match_run;
use crate::model::{AggregatedCoverage, StaticBranchAnalysis, TestRunHits};
use crate::parsers::case_tree;
use crate::parsers::profile::ProfileData;

/// The raw profiler artifacts of one test execution.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    pub name: String,
    pub annotated: String,
    pub definitions: String,
}

impl RunArtifacts {
    /// Parse and match this run against the static analysis.
    pub fn hits(
        &self,
        analysis: &StaticBranchAnalysis,
        mangler: &dyn Mangler,
    ) -> Result<TestRunHits> {
        let profile = ProfileData::from_artifacts(&self.annotated, &self.definitions)
            .map_err(|e| match e {
                CasecovError::MissingArtifact(msg) => {
                    CasecovError::MissingArtifact(format!("run '{}': {}", self.name, msg))
                }
                other => other,
            })?;
        Ok(match_run(analysis, &self.name, &profile, mangler))
    }
}

/// Read a case-tree dump and build the static analysis.
///
/// A file recognized as profiler output is rejected instead of being parsed
/// into an empty analysis.
pub fn load_dump(path: &Path) -> Result<StaticBranchAnalysis> {
    let text = fs::read_to_string(path).map_err(|e| missing_or_io(e, path))?;
    match detect_kind(path, text.as_bytes()) {
        Some(ArtifactKind::CaseTreeDump) | None => case_tree::analyze(&text),
        Some(kind) => Err(CasecovError::Parse(format!(
            "{} looks like {}, not a case-tree dump",
            path.display(),
            kind
        ))),
    }
}

fn missing_or_io(err: std::io::Error, path: &Path) -> CasecovError {
    if err.kind() == std::io::ErrorKind::NotFound {
        CasecovError::MissingArtifact(format!("{} does not exist", path.display()))
    } else {
        CasecovError::Io(err)
    }
}

/// Parse a `NAME=DIR` run argument. Without a name, the directory's last
/// component is used.
pub fn parse_run_arg(arg: &str) -> (String, PathBuf) {
    match arg.split_once('=') {
        Some((name, dir)) if !name.is_empty() => (name.to_string(), PathBuf::from(dir)),
        _ => {
            let dir = PathBuf::from(arg);
            let name = dir
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unnamed")
                .to_string();
            (name, dir)
        }
    }
}

/// Collect the profiler artifacts of one run from a directory.
///
/// Line numbers in an annotation file only refer to its own definitions
/// source, so each annotation file is paired with the definitions file of
/// the same name without the HTML extension (`main.ss.html` and `main.ss`).
/// Unpaired files are ignored. More than one pair is ambiguous.
pub fn load_run(name: &str, dir: &Path) -> Result<RunArtifacts> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| missing_or_io(e, dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    let mut annotations: Vec<(PathBuf, String)> = Vec::new();
    let mut definitions: BTreeMap<PathBuf, String> = BTreeMap::new();

    for path in paths {
        let content = fs::read(&path)?;
        match detect_kind(&path, &content) {
            Some(ArtifactKind::ProfileAnnotations) => {
                annotations.push((path, String::from_utf8_lossy(&content).into_owned()));
            }
            Some(ArtifactKind::ProfileDefinitions) => {
                definitions.insert(path, String::from_utf8_lossy(&content).into_owned());
            }
            _ => log::debug!("run '{}': skipping {}", name, path.display()),
        }
    }

    if annotations.iter().all(|(_, text)| text.trim().is_empty()) {
        return Err(CasecovError::MissingArtifact(format!(
            "no profiler annotations in {}",
            dir.display()
        )));
    }

    let mut pairs = Vec::new();
    for (path, annotated) in annotations.into_iter().filter(|(_, t)| !t.trim().is_empty()) {
        let source = path.with_extension("");
        match definitions.remove(&source) {
            Some(defs) => pairs.push((path, annotated, defs)),
            None => log::warn!(
                "run '{}': ignoring {}, no definitions source {}",
                name,
                path.display(),
                source.display()
            ),
        }
    }
    for path in definitions.keys() {
        log::warn!(
            "run '{}': ignoring definitions {} without annotations",
            name,
            path.display()
        );
    }

    if pairs.len() > 1 {
        let files: Vec<String> = pairs.iter().map(|(p, _, _)| p.display().to_string()).collect();
        return Err(CasecovError::Other(format!(
            "run '{}' holds profiles of {} programs ({}); give each its own directory",
            name,
            pairs.len(),
            files.join(", ")
        )));
    }
    let (_, annotated, definitions) = pairs.pop().ok_or_else(|| {
        CasecovError::MissingArtifact(format!(
            "no definitions source for the annotations in {}",
            dir.display()
        ))
    })?;

    Ok(RunArtifacts {
        name: name.to_string(),
        annotated,
        definitions,
    })
}

/// Match every run against the analysis and fold the results.
pub fn compute_coverage(
    analysis: StaticBranchAnalysis,
    runs: &[RunArtifacts],
    mangler: &dyn Mangler,
) -> Result<AggregatedCoverage> {
    let hits = runs
        .iter()
        .map(|run| run.hits(&analysis, mangler))
        .collect::<Result<Vec<_>>>()?;
    Ok(aggregate(analysis, hits))
}
