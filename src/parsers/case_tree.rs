/// Parser for the compiler's case-tree dump.
///
/// One function per line:
///   <FullName> = [args...] <body>
///
/// The body is not parsed structurally. We only count the reachable
/// alternatives and look for the fallback:
///   %concase [tag] Ctor ...    constructor branch
///   %constcase 0 ...           constant branch
///   (CRASH "message")          compiler-inserted fallback, at most one
///
/// Lines without a name/body separator are skipped.
use crate::error::{CasecovError, Result};
use crate::model::*;

use super::ParseStats;

const CONCASE: &str = "%concase";
const CONSTCASE: &str = "%constcase";
const CRASH_MARKER: &str = "(CRASH \"";

/// Parse a whole dump into the static analysis snapshot.
///
/// A dump with no content at all means the compiler produced nothing, which
/// is fatal; individual unreadable lines are not.
pub fn analyze(text: &str) -> Result<StaticBranchAnalysis> {
    if text.trim().is_empty() {
        return Err(CasecovError::MissingArtifact(
            "case-tree dump is empty".to_string(),
        ));
    }
    let (functions, stats) = parse_dump(text);
    log::debug!(
        "case-tree dump: {} functions parsed, {} lines skipped",
        stats.parsed,
        stats.skipped
    );
    Ok(StaticBranchAnalysis::new(functions))
}

/// Parse every recognizable line of a dump.
pub fn parse_dump(text: &str) -> (Vec<CompiledFunction>, ParseStats) {
    let mut functions = Vec::new();
    let mut stats = ParseStats::default();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line) {
            Some(func) => {
                functions.push(func);
                stats.parsed += 1;
            }
            None => stats.skipped += 1,
        }
    }

    (functions, stats)
}

/// Parse a single dump line into a classified function.
pub fn parse_line(line: &str) -> Option<CompiledFunction> {
    let (lhs, body) = split_definition(line)?;
    let full_name = lhs.trim();
    if full_name.is_empty() {
        return None;
    }
    let (module_name, func_name) = split_full_name(full_name);

    let reachable_class = if is_compiler_generated(&module_name, &func_name) {
        BranchClass::CompilerGenerated
    } else {
        BranchClass::Canonical
    };

    // Constructors first, then constants, then the fallback.
    let patterns = alternative_patterns(body, CONCASE)
        .into_iter()
        .chain(alternative_patterns(body, CONSTCASE));

    let mut branches: Vec<ClassifiedBranch> = patterns
        .enumerate()
        .map(|(idx, pattern)| ClassifiedBranch {
            id: BranchId::new(&module_name, &func_name, 0, idx as u32),
            class: reachable_class.clone(),
            pattern,
        })
        .collect();

    let fallback = crash_message(body);
    if let Some(message) = &fallback {
        branches.push(ClassifiedBranch {
            id: BranchId::new(&module_name, &func_name, 0, branches.len() as u32),
            class: BranchClass::from(CrashReason::from_message(message)),
            pattern: "_".to_string(),
        });
    }

    Some(CompiledFunction {
        full_name: full_name.to_string(),
        module_name,
        func_name,
        branches,
        has_default_case: fallback.is_some(),
    })
}

/// Split `name = body` at the first `=`.
///
/// Operator names may end in `=` (`Prelude.EqOrd.==`, `Main./=`). When the
/// first run of `=` is followed by another `=`, the run belongs to the name;
/// otherwise its last `=` is the separator. The body may contain `=` freely.
fn split_definition(line: &str) -> Option<(&str, &str)> {
    let start = line.find('=')?;
    let run = line[start..].len() - line[start..].trim_start_matches('=').len();
    let end = start + run;

    let rest = &line[end..];
    match rest.trim_start().strip_prefix('=') {
        Some(body) => Some((&line[..end], body)),
        None => Some((&line[..end - 1], rest)),
    }
}

/// Pattern text for each occurrence of `marker`, in order of appearance.
fn alternative_patterns(body: &str, marker: &str) -> Vec<String> {
    body.match_indices(marker)
        .map(|(pos, _)| pattern_after(&body[pos + marker.len()..]))
        .collect()
}

/// The first token following a case marker, skipping a bracketed tag list
/// such as `[cons]`.
fn pattern_after(rest: &str) -> String {
    let mut rest = rest.trim_start();
    if rest.starts_with('[') {
        if let Some(end) = rest.find(']') {
            rest = rest[end + 1..].trim_start();
        }
    }
    let token: String = rest
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != ')' && *c != ']' && *c != '[')
        .collect();
    if token.is_empty() {
        "?".to_string()
    } else {
        token
    }
}

/// Message of the first `(CRASH "...")` in the body, honouring `\"`
/// escapes. An unterminated message runs to the end of the line.
fn crash_message(body: &str) -> Option<String> {
    let start = body.find(CRASH_MARKER)? + CRASH_MARKER.len();
    let mut message = String::new();
    let mut chars = body[start..].chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return Some(message),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    message.push(escaped);
                }
            }
            _ => message.push(c),
        }
    }
    Some(message)
}
