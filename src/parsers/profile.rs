/// Parser for the runtime profiler output of one test run.
///
/// Two artifacts are involved:
///
///   annotated source (HTML): every profiled sub-expression is wrapped in
///   markup carrying `title="line L char C count N"`. The surrounding markup
///   is irrelevant; we only scan for the title attributes.
///
///   definitions source (.ss): one top-level `(define <runtimeId> ...)` per
///   line. The 1-based line of each definition delimits the range of
///   annotated lines belonging to it.
use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CasecovError, Result};

use super::ParseStats;

/// Every profiler title attribute, whatever its fields.
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"title="(line[^"]*)""#).unwrap());

/// One `<field> <number>` pair inside a title.
static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(line|char|count) (\d+)").unwrap());

/// A top-level definition starts in column 0; indented ones are nested.
static DEFINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(define\s+([^\s()]+)").unwrap());

/// A single profiled expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileMarker {
    pub line: u32,
    pub column: u32,
    pub count: u64,
}

/// Expressions on one source line: how many ran at least once, out of all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineStats {
    pub executed: u64,
    pub total: u64,
}

/// A top-level runtime definition and the line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub runtime_id: String,
    pub line: u32,
}

/// Parsed profiler data for one test run.
#[derive(Debug, Clone, Default)]
pub struct ProfileData {
    pub lines: BTreeMap<u32, LineStats>,
    /// In file order, so lines are ascending.
    pub definitions: Vec<Definition>,
    pub marker_stats: ParseStats,
}

impl ProfileData {
    /// Parse both artifacts. Either one being empty means the run produced
    /// no profile at all.
    pub fn from_artifacts(annotated: &str, definitions: &str) -> Result<Self> {
        if annotated.trim().is_empty() {
            return Err(CasecovError::MissingArtifact(
                "annotated profiler output is empty".to_string(),
            ));
        }
        if definitions.trim().is_empty() {
            return Err(CasecovError::MissingArtifact(
                "runtime definitions source is empty".to_string(),
            ));
        }
        Ok(parse(annotated, definitions))
    }
}

/// Parse both artifacts without checking for emptiness.
pub fn parse(annotated: &str, definitions: &str) -> ProfileData {
    let (markers, marker_stats) = parse_markers(annotated);
    if marker_stats.skipped > 0 {
        log::debug!(
            "profiler: discarded {} malformed markers ({} kept)",
            marker_stats.skipped,
            marker_stats.parsed
        );
    }
    ProfileData {
        lines: reduce_by_line(&markers),
        definitions: parse_definitions(definitions),
        marker_stats,
    }
}

/// Scan for every profiler title. Titles missing any of the three fields
/// are counted as skipped.
pub fn parse_markers(annotated: &str) -> (Vec<ProfileMarker>, ParseStats) {
    let mut markers = Vec::new();
    let mut stats = ParseStats::default();

    for caps in TITLE_RE.captures_iter(annotated) {
        match parse_title(&caps[1]) {
            Some(marker) => {
                markers.push(marker);
                stats.parsed += 1;
            }
            None => stats.skipped += 1,
        }
    }

    (markers, stats)
}

fn parse_title(title: &str) -> Option<ProfileMarker> {
    let mut line = None;
    let mut column = None;
    let mut count = None;

    for caps in FIELD_RE.captures_iter(title) {
        let value = &caps[2];
        match &caps[1] {
            "line" => line = value.parse::<u32>().ok(),
            "char" => column = value.parse::<u32>().ok(),
            "count" => count = value.parse::<u64>().ok(),
            _ => {}
        }
    }

    Some(ProfileMarker {
        line: line?,
        column: column?,
        count: count?,
    })
}

/// Group markers by line.
pub fn reduce_by_line(markers: &[ProfileMarker]) -> BTreeMap<u32, LineStats> {
    let mut lines: BTreeMap<u32, LineStats> = BTreeMap::new();
    for marker in markers {
        let entry = lines.entry(marker.line).or_default();
        entry.total += 1;
        if marker.count > 0 {
            entry.executed += 1;
        }
    }
    lines
}

/// Collect `(define <id> ...)` forms with their 1-based line numbers.
pub fn parse_definitions(source: &str) -> Vec<Definition> {
    source
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            DEFINE_RE.captures(line).map(|caps| Definition {
                runtime_id: caps[1].to_string(),
                line: idx as u32 + 1,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_markers_in_markup() {
        let html = r#"<span class=pc1 title="line 3 char 5 count 2">(f x)</span>
<span class=pc0 title="line 3 char 9 count 0">x</span><span title="line 7 char 1 count 11">y</span>"#;
        let (markers, stats) = parse_markers(html);

        assert_eq!(stats, ParseStats { parsed: 3, skipped: 0 });
        assert_eq!(
            markers[0],
            ProfileMarker {
                line: 3,
                column: 5,
                count: 2
            }
        );
        assert_eq!(markers[2].count, 11);
    }

    #[test]
    fn test_malformed_markers_are_discarded() {
        let html = r#"<a title="line 1 char 2 count 3">ok</a>
<a title="line 4 char 5">no count</a>
<a title="line x char 1 count 1">bad line</a>
<a title="something else">ignored</a>"#;
        let (markers, stats) = parse_markers(html);

        assert_eq!(markers.len(), 1);
        assert_eq!(stats, ParseStats { parsed: 1, skipped: 2 });
    }

    #[test]
    fn test_reduce_by_line() {
        let markers = vec![
            ProfileMarker { line: 2, column: 1, count: 4 },
            ProfileMarker { line: 2, column: 6, count: 0 },
            ProfileMarker { line: 5, column: 1, count: 0 },
        ];
        let lines = reduce_by_line(&markers);

        assert_eq!(lines[&2], LineStats { executed: 1, total: 2 });
        assert_eq!(lines[&5], LineStats { executed: 0, total: 1 });
    }

    #[test]
    fn test_parse_definitions() {
        let ss = "(import (chezscheme))\n\
                  (define MainC-46main (lambda () 0))\n\
                  ; comment\n\
                  (define MainC-46safeHead (lambda (arg) arg))\n";
        let defs = parse_definitions(ss);

        assert_eq!(
            defs,
            vec![
                Definition {
                    runtime_id: "MainC-46main".to_string(),
                    line: 2
                },
                Definition {
                    runtime_id: "MainC-46safeHead".to_string(),
                    line: 4
                },
            ]
        );
    }

    #[test]
    fn test_nested_defines_do_not_split_a_function() {
        let ss = "(define MainC-46f (lambda (x)\n  (define helper 1)\n  (g x)))\n(define MainC-46g 0)\n";
        let defs = parse_definitions(ss);

        let ids: Vec<(&str, u32)> = defs.iter().map(|d| (d.runtime_id.as_str(), d.line)).collect();
        assert_eq!(ids, vec![("MainC-46f", 1), ("MainC-46g", 4)]);
    }

    #[test]
    fn test_from_artifacts_requires_both() {
        assert!(matches!(
            ProfileData::from_artifacts("", "(define a 1)"),
            Err(CasecovError::MissingArtifact(_))
        ));
        assert!(matches!(
            ProfileData::from_artifacts(r#"title="line 1 char 1 count 1""#, "\n"),
            Err(CasecovError::MissingArtifact(_))
        ));
    }
}
