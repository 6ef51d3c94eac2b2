/// Auto-detection of input artifacts.
///
/// Strategy:
///   1. Check file extension for strong hints
///   2. Peek at the first bytes of the file content
use std::path::Path;

/// The artifacts the pipeline consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Compiler case-tree dump.
    CaseTreeDump,
    /// Profiler-annotated source (HTML with `title="line .. count .."`).
    ProfileAnnotations,
    /// Runtime source with one `(define ...)` per line.
    ProfileDefinitions,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::CaseTreeDump => "case-tree dump",
            ArtifactKind::ProfileAnnotations => "profile annotations",
            ArtifactKind::ProfileDefinitions => "profile definitions",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect the artifact kind from filename and file content.
pub fn detect_kind(path: &Path, content: &[u8]) -> Option<ArtifactKind> {
    if let Some(kind) = detect_by_extension(path) {
        return Some(kind);
    }
    detect_by_content(content)
}

fn detect_by_extension(path: &Path) -> Option<ArtifactKind> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "html" | "htm" => Some(ArtifactKind::ProfileAnnotations),
        "ss" | "scm" => Some(ArtifactKind::ProfileDefinitions),
        _ => None,
    }
}

fn detect_by_content(content: &[u8]) -> Option<ArtifactKind> {
    // The first few KB are enough to tell these apart.
    let head_len = content.len().min(4096);
    let head = String::from_utf8_lossy(&content[..head_len]);

    if head.contains("title=\"line ") {
        return Some(ArtifactKind::ProfileAnnotations);
    }

    if head.lines().any(|l| l.starts_with("(define ")) {
        return Some(ArtifactKind::ProfileDefinitions);
    }

    let looks_like_dump = head
        .lines()
        .any(|l| l.contains(" = ") && (l.contains("%case") || l.contains("(CRASH ")));
    if looks_like_dump {
        return Some(ArtifactKind::CaseTreeDump);
    }

    None
}
