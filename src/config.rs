//! User configuration: exclusion patterns and the mangling scheme.
//!
//! Loaded from an optional JSON file and then overridden by CLI flags. The
//! resulting value is passed explicitly into the pipeline.

use std::path::Path;

use serde::Deserialize;

use crate::error::Result;
use crate::mangle::ManglingScheme;
use crate::model::split_full_name;

/// Prefixes of names the compiler generates on its own.
pub const BUILTIN_PREFIXES: &[&str] = &["{csegen", "{eta", "prim__", "_builtin."];

/// A name pattern hiding compiler-generated functions from the target list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExclusionPattern {
    pub pattern: String,
    #[serde(default)]
    pub prefix: bool,
}

impl ExclusionPattern {
    pub fn exact(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            prefix: false,
        }
    }

    pub fn prefix(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            prefix: true,
        }
    }

    /// CLI form: a trailing `*` makes it a prefix pattern.
    pub fn from_cli(arg: &str) -> Self {
        match arg.strip_suffix('*') {
            Some(prefix) => Self::prefix(prefix),
            None => Self::exact(arg),
        }
    }

    fn matches_name(&self, name: &str) -> bool {
        if self.prefix {
            name.starts_with(&self.pattern)
        } else {
            name == self.pattern
        }
    }

    /// Match against the fully-qualified name or its unqualified part.
    pub fn matches(&self, full_name: &str) -> bool {
        let (_, func) = split_full_name(full_name);
        self.matches_name(full_name) || self.matches_name(&func)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    pub exclude: Vec<ExclusionPattern>,
    pub mangling: ManglingScheme,
    pub builtin_exclusions: bool,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            mangling: ManglingScheme::default(),
            builtin_exclusions: true,
        }
    }
}

impl CoverageConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Effective exclusion list: built-ins first (when enabled), then the
    /// user's patterns in order.
    pub fn exclusions(&self) -> Vec<ExclusionPattern> {
        let builtins = BUILTIN_PREFIXES
            .iter()
            .filter(|_| self.builtin_exclusions)
            .map(|p| ExclusionPattern::prefix(p));
        builtins.chain(self.exclude.iter().cloned()).collect()
    }
}
