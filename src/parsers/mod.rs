pub mod case_tree;
pub mod profile;

/// How much of a semi-structured input was usable. Malformed records are
/// dropped rather than failing the parse, so callers log these counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub parsed: usize,
    pub skipped: usize,
}
