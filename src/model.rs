//! Branch-level model shared by every stage of the pipeline. The case-tree
//! parser produces a `StaticBranchAnalysis`, each test run contributes a
//! `TestRunHits`, and the aggregator folds both into `AggregatedCoverage`.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// Compute a coverage percentage, returning 100.0 when the total is zero.
/// A function with nothing to cover is fully covered.
#[must_use]
pub fn percent(covered: u64, total: u64) -> f64 {
    if total == 0 {
        100.0
    } else {
        covered as f64 / total as f64 * 100.0
    }
}

/// Split a fully-qualified name on its last `.` into `(module, func)`.
/// Names without a dot live in the empty module.
pub fn split_full_name(full_name: &str) -> (String, String) {
    match full_name.rsplit_once('.') {
        Some((module, func)) => (module.to_string(), func.to_string()),
        None => (String::new(), full_name.to_string()),
    }
}

/// Names the compiler invents for lifted or shared code rather than user
/// definitions: `{csegen:12}`, `{eta:0}`, primitives and the builtin module.
pub fn is_compiler_generated(module_name: &str, func_name: &str) -> bool {
    func_name.starts_with('{')
        || func_name.starts_with("prim__")
        || module_name == "_builtin"
        || module_name.starts_with("_builtin.")
}

/// Stable identity of one branch within an analysis snapshot.
///
/// Field order matters: the derived `Ord` compares module, function, case
/// and branch in that order, which keeps every set operation deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BranchId {
    pub module_name: String,
    pub func_name: String,
    pub case_index: u32,
    pub branch_index: u32,
}

impl BranchId {
    pub fn new(module_name: &str, func_name: &str, case_index: u32, branch_index: u32) -> Self {
        Self {
            module_name: module_name.to_string(),
            func_name: func_name.to_string(),
            case_index,
            branch_index,
        }
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.module_name.is_empty() {
            write!(f, "{}#{}:{}", self.func_name, self.case_index, self.branch_index)
        } else {
            write!(
                f,
                "{}.{}#{}:{}",
                self.module_name, self.func_name, self.case_index, self.branch_index
            )
        }
    }
}

/// Why the compiler inserted a fallback branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrashReason {
    /// The function has no clauses at all; every input is impossible.
    NoClauses,
    /// A partial function; reaching this branch is a real defect.
    UnhandledInput,
    /// Inserted by the optimizer (e.g. Nat-to-Integer rewriting).
    OptimizerArtifact,
    Unknown(String),
}

const NO_CLAUSES_MARKER: &str = "No clauses";
const UNHANDLED_INPUT_MARKER: &str = "Unhandled input";
const OPTIMIZER_MARKER: &str = "Nat case not covered";

impl CrashReason {
    /// Classify a CRASH message. Markers are checked in priority order since
    /// one message may contain several of them.
    pub fn from_message(message: &str) -> Self {
        if message.contains(NO_CLAUSES_MARKER) {
            CrashReason::NoClauses
        } else if message.contains(UNHANDLED_INPUT_MARKER) {
            CrashReason::UnhandledInput
        } else if message.contains(OPTIMIZER_MARKER) {
            CrashReason::OptimizerArtifact
        } else {
            CrashReason::Unknown(message.to_string())
        }
    }
}

/// Semantic class of a branch. Only `Canonical` counts toward coverage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "class", content = "message", rename_all = "snake_case")]
pub enum BranchClass {
    Canonical,
    ExcludedNoClauses,
    BugUnhandledInput,
    OptimizerArtifact,
    UnknownCrash(String),
    CompilerGenerated,
}

impl From<CrashReason> for BranchClass {
    fn from(reason: CrashReason) -> Self {
        match reason {
            CrashReason::NoClauses => BranchClass::ExcludedNoClauses,
            CrashReason::UnhandledInput => BranchClass::BugUnhandledInput,
            CrashReason::OptimizerArtifact => BranchClass::OptimizerArtifact,
            CrashReason::Unknown(message) => BranchClass::UnknownCrash(message),
        }
    }
}

impl BranchClass {
    pub fn is_canonical(&self) -> bool {
        matches!(self, BranchClass::Canonical)
    }

    /// Structurally impossible or non-semantic; dropped from both sides of
    /// the coverage ratio.
    pub fn is_excluded(&self) -> bool {
        matches!(
            self,
            BranchClass::ExcludedNoClauses | BranchClass::OptimizerArtifact
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BranchClass::Canonical => "canonical",
            BranchClass::ExcludedNoClauses => "excluded_no_clauses",
            BranchClass::BugUnhandledInput => "bug_unhandled_input",
            BranchClass::OptimizerArtifact => "optimizer_artifact",
            BranchClass::UnknownCrash(_) => "unknown_crash",
            BranchClass::CompilerGenerated => "compiler_generated",
        }
    }
}

impl fmt::Display for BranchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A branch with its identity, class and the pattern text it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedBranch {
    pub id: BranchId,
    pub class: BranchClass,
    pub pattern: String,
}

/// One function from the case-tree dump.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledFunction {
    pub full_name: String,
    pub module_name: String,
    pub func_name: String,
    pub branches: Vec<ClassifiedBranch>,
    pub has_default_case: bool,
}

impl CompiledFunction {
    pub fn canonical_count(&self) -> usize {
        self.count_class(BranchClass::is_canonical)
    }

    pub fn count_class(&self, pred: impl Fn(&BranchClass) -> bool) -> usize {
        self.branches.iter().filter(|b| pred(&b.class)).count()
    }

    pub fn canonical_branches(&self) -> impl Iterator<Item = &ClassifiedBranch> {
        self.branches.iter().filter(|b| b.class.is_canonical())
    }

    pub fn is_compiler_generated(&self) -> bool {
        is_compiler_generated(&self.module_name, &self.func_name)
    }
}

/// Flattened, read-only view over every function of one dump.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StaticBranchAnalysis {
    pub functions: Vec<CompiledFunction>,
    pub branches: Vec<ClassifiedBranch>,
    pub canonical_total: usize,
}

impl StaticBranchAnalysis {
    pub fn new(functions: Vec<CompiledFunction>) -> Self {
        let branches: Vec<ClassifiedBranch> = functions
            .iter()
            .flat_map(|f| f.branches.iter().cloned())
            .collect();
        let canonical_total = branches.iter().filter(|b| b.class.is_canonical()).count();
        Self {
            functions,
            branches,
            canonical_total,
        }
    }

    fn count_class(&self, pred: impl Fn(&BranchClass) -> bool) -> usize {
        self.branches.iter().filter(|b| pred(&b.class)).count()
    }

    pub fn bugs_total(&self) -> usize {
        self.count_class(|c| matches!(c, BranchClass::BugUnhandledInput))
    }

    pub fn unknown_total(&self) -> usize {
        self.count_class(|c| matches!(c, BranchClass::UnknownCrash(_)))
    }

    pub fn excluded_total(&self) -> usize {
        self.count_class(BranchClass::is_excluded)
    }

    pub fn compiler_generated_total(&self) -> usize {
        self.count_class(|c| matches!(c, BranchClass::CompilerGenerated))
    }

    #[must_use]
    pub fn summary(&self) -> StaticSummary {
        StaticSummary {
            total_functions: self.functions.len(),
            total_branches: self.branches.len(),
            canonical_total: self.canonical_total,
            bugs_total: self.bugs_total(),
            unknown_total: self.unknown_total(),
            excluded_total: self.excluded_total(),
            compiler_generated_total: self.compiler_generated_total(),
        }
    }
}

/// Static-only counters, available before any test run is considered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaticSummary {
    pub total_functions: usize,
    pub total_branches: usize,
    pub canonical_total: usize,
    pub bugs_total: usize,
    pub unknown_total: usize,
    pub excluded_total: usize,
    pub compiler_generated_total: usize,
}

/// A branch observed in one test-run artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchHit {
    pub id: BranchId,
    pub hit_count: u64,
}

/// Everything one test execution contributed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestRunHits {
    pub run: String,
    pub hits: Vec<BranchHit>,
    /// Functions whose runtime definition could not be located in this run.
    pub unmapped: Vec<String>,
}

/// Coverage of a single function after aggregation.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionCoverage {
    pub name: String,
    pub canonical_total: usize,
    pub canonical_covered: usize,
}

impl FunctionCoverage {
    #[must_use]
    pub fn percent(&self) -> f64 {
        percent(self.canonical_covered as u64, self.canonical_total as u64)
    }
}

/// Terminal result of one invocation. Built fresh by the aggregator and
/// never updated in place.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedCoverage {
    pub analysis: StaticBranchAnalysis,
    pub runs: Vec<TestRunHits>,
    pub covered: BTreeSet<BranchId>,
    pub canonical_total: usize,
    pub canonical_covered: usize,
    pub bugs_total: usize,
    pub unknown_total: usize,
}

impl AggregatedCoverage {
    #[must_use]
    pub fn coverage_percent(&self) -> f64 {
        percent(self.canonical_covered as u64, self.canonical_total as u64)
    }

    pub fn is_covered(&self, id: &BranchId) -> bool {
        self.covered.contains(id)
    }

    pub fn function_coverage(&self) -> Vec<FunctionCoverage> {
        self.analysis
            .functions
            .iter()
            .map(|f| FunctionCoverage {
                name: f.full_name.clone(),
                canonical_total: f.canonical_count(),
                canonical_covered: f
                    .canonical_branches()
                    .filter(|b| self.is_covered(&b.id))
                    .count(),
            })
            .collect()
    }

    /// Functions left unmapped by at least one run.
    pub fn unmapped(&self) -> BTreeSet<&str> {
        self.runs
            .iter()
            .flat_map(|r| r.unmapped.iter().map(String::as_str))
            .collect()
    }
}
