//! Errors for tree addressing, type lookup and schema completion.
//!
//! Every error here describes a structural problem the caller must fix; none
//! of them is transient. Lookups of unknown names carry the closest
//! registered alternatives so messages can suggest a correction.
//!
//! Shape mismatches are the one aggregated kind: a single
//! [`complete`](crate::TypeRegistry::complete) pass reports every offending
//! path at once through [`Mismatches`].

use std::fmt;

use thiserror::Error;

use crate::path::Path;
use crate::tree::Tree;

/// Result alias for schema operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by path utilities, the type registry and completion.
#[derive(Debug, Error)]
pub enum Error {
    /// A relative path climbed above the root, or a path could not be used
    /// where it was given.
    #[error("invalid path {path}: {reason}")]
    InvalidPath { path: Path, reason: String },

    /// A write needed to walk through a location holding a non-mapping value.
    #[error("path conflict at {path}: found {found} where a mapping was required")]
    PathConflict { path: Path, found: String },

    /// A type name did not resolve to a registration or a combinator.
    #[error("unknown type '{name}'{}", hint(.suggestions))]
    UnknownType { name: String, suggestions: Vec<String> },

    /// An `_inherit` chain loops back on itself.
    #[error("recursive type: {}", .chain.join(" -> "))]
    RecursiveType { chain: Vec<String> },

    /// A type descriptor could not be read from its tree form.
    #[error("invalid descriptor for type '{name}': {reason}")]
    InvalidDescriptor { name: String, reason: String },

    /// One or more values contradict their resolved types.
    #[error("{0}")]
    SchemaMismatch(Mismatches),

    /// Two different scalar values met at the same path during a strict merge.
    #[error("merge conflict at {path}: {left} vs {right}")]
    MergeConflict { path: Path, left: Tree, right: Tree },
}

/// A single value whose shape contradicts its type.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub path: Path,
    pub expected: String,
    pub found: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: expected {}, found {}", self.path, self.expected, self.found)
    }
}

/// Every mismatch found in one completion pass, in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mismatches(pub Vec<Mismatch>);

impl Mismatches {
    pub fn iter(&self) -> impl Iterator<Item = &Mismatch> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Paths of every offending value.
    pub fn paths(&self) -> Vec<&Path> {
        self.0.iter().map(|m| &m.path).collect()
    }
}

impl fmt::Display for Mismatches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema mismatch at {} path(s):", self.0.len())?;
        for mismatch in &self.0 {
            write!(f, "\n  - {}", mismatch)?;
        }
        Ok(())
    }
}

fn hint(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (available: {})", suggestions.join(", "))
    }
}

/// Rank `candidates` by edit distance to `name`.
///
/// Returns up to five close matches. When nothing is close, every candidate
/// is returned in sorted order so the caller still sees what exists.
pub fn suggest<'a>(name: &str, candidates: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut all: Vec<&str> = candidates.into_iter().collect();
    all.sort_unstable();
    all.dedup();

    let threshold = (name.len() / 3).max(2);
    let mut close: Vec<(usize, &str)> = all
        .iter()
        .map(|candidate| (strsim::levenshtein(name, candidate), *candidate))
        .filter(|(distance, _)| *distance <= threshold)
        .collect();
    close.sort();

    if close.is_empty() {
        all.into_iter().map(String::from).collect()
    } else {
        close.into_iter().take(5).map(|(_, c)| c.to_string()).collect()
    }
}
