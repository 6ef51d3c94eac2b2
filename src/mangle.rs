//! Reproduction of the compiler's runtime identifier encoding.
//!
//! The hit matcher relies on this being byte-for-byte identical to what the
//! compiler emits, so the encoding rules live behind the [`Mangler`] trait
//! and can be swapped as a unit.
use std::fmt::Write;

use clap::ValueEnum;
use serde::Deserialize;

use crate::model::split_full_name;

/// Turns a fully-qualified static name into its runtime identifier.
pub trait Mangler {
    fn mangle(&self, full_name: &str) -> String;
}

/// Every character outside `[A-Za-z0-9_]` becomes `C-<code point>`,
/// including the namespace separator.
pub struct UniformMangler;

impl Mangler for UniformMangler {
    fn mangle(&self, full_name: &str) -> String {
        let mut out = String::with_capacity(full_name.len() * 2);
        encode_into(&mut out, full_name);
        out
    }
}

/// Namespace segments are joined with a literal `-`; only the segments
/// themselves go through the character encoding.
pub struct NamespaceHyphenMangler;

impl Mangler for NamespaceHyphenMangler {
    fn mangle(&self, full_name: &str) -> String {
        let (module, func) = split_full_name(full_name);
        let mut out = String::with_capacity(full_name.len() * 2);
        if !module.is_empty() {
            for segment in module.split('.') {
                encode_into(&mut out, segment);
                out.push('-');
            }
        }
        encode_into(&mut out, &func);
        out
    }
}

fn encode_into(out: &mut String, text: &str) {
    for c in text.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else {
            write!(out, "C-{}", c as u32).unwrap();
        }
    }
}

/// Mangle with the default (uniform) encoding.
pub fn mangle(full_name: &str) -> String {
    UniformMangler.mangle(full_name)
}

/// Selectable encoding scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ManglingScheme {
    #[default]
    Uniform,
    NamespaceHyphen,
}

impl ManglingScheme {
    pub fn mangler(&self) -> Box<dyn Mangler> {
        match self {
            ManglingScheme::Uniform => Box::new(UniformMangler),
            ManglingScheme::NamespaceHyphen => Box::new(NamespaceHyphenMangler),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mangle_passes_identifier_chars() {
        assert_eq!(mangle("safe_Head2"), "safe_Head2");
    }

    #[test]
    fn test_mangle_encodes_separator_uniformly() {
        assert_eq!(mangle("Main.safeHead"), "MainC-46safeHead");
        assert_eq!(mangle("Data.List.sort"), "DataC-46ListC-46sort");
    }

    #[test]
    fn test_mangle_operator() {
        let mangled = mangle("Module.==");
        assert_eq!(mangled, "ModuleC-46C-61C-61");
        assert!(mangled.ends_with("C-61C-61"));
    }

    #[test]
    fn test_mangle_compiler_generated_name() {
        assert_eq!(mangle("{csegen:3}"), "C-123csegenC-583C-125");
    }

    #[test]
    fn test_namespace_hyphen_scheme() {
        let m = NamespaceHyphenMangler;
        assert_eq!(m.mangle("Data.List.sort"), "Data-List-sort");
        assert_eq!(m.mangle("main"), "main");
        assert!(m.mangle("Module.==").ends_with("C-61C-61"));
    }

    #[test]
    fn test_scheme_value_names() {
        assert_eq!(
            ManglingScheme::from_str("uniform", true).unwrap(),
            ManglingScheme::Uniform
        );
        assert_eq!(
            ManglingScheme::from_str("namespace-hyphen", false).unwrap(),
            ManglingScheme::NamespaceHyphen
        );
        assert!(ManglingScheme::from_str("bogus", true).is_err());
    }
}
