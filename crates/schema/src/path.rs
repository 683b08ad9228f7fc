//! Path addressing for nested trees.
//!
//! A [`Path`] is an ordered sequence of [`Segment`]s naming a location in a
//! [`Tree`]. The empty path is the root. Relative paths may contain parent
//! markers (`".."`) which must be resolved against a base path with
//! [`resolve_relative`] before they address anything.
//!
//! The free functions here are the only way the rest of the workspace reads
//! and writes trees by path:
//!
//! - [`get`] walks without creating anything and returns `None` for absent
//!   locations (a present null is `Some(Tree::null())`).
//! - [`set`] creates intermediate mappings on the way down but refuses to
//!   walk through a scalar ([`Error::PathConflict`]).
//! - [`remove`] detaches a subtree.
//!
//! # Examples
//!
//! ```
//! # use bigraph_schema::{path, Path, Tree};
//! let mut tree = Tree::map();
//! path::set(&mut tree, &Path::from("a.b"), Tree::from(1)).unwrap();
//! assert_eq!(path::get(&tree, &Path::from("a.b")), Some(&Tree::from(1)));
//! ```

use std::fmt;

use crate::error::{Error, Result};
use crate::tree::{Scalar, Tree};

/// Token naming the parent of the current location.
pub const PARENT: &str = "..";

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// Mapping key.
    Key(String),
    /// Sequence index.
    Index(usize),
    /// Parent marker; only meaningful in relative paths.
    Up,
}

impl Segment {
    /// Key form used when the segment addresses a mapping.
    fn as_key(&self) -> Option<String> {
        match self {
            Segment::Key(key) => Some(key.clone()),
            Segment::Index(index) => Some(index.to_string()),
            Segment::Up => None,
        }
    }

    /// Index form used when the segment addresses a sequence.
    fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Index(index) => Some(*index),
            Segment::Key(key) => key.parse().ok(),
            Segment::Up => None,
        }
    }

    fn to_tree(&self) -> Tree {
        match self {
            Segment::Key(key) => Tree::from(key.as_str()),
            Segment::Index(index) => Tree::from(*index as i64),
            Segment::Up => Tree::from(PARENT),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, "{}", key),
            Segment::Index(index) => write!(f, "{}", index),
            Segment::Up => write!(f, "{}", PARENT),
        }
    }
}

impl From<&str> for Segment {
    fn from(s: &str) -> Self {
        if s == PARENT {
            Segment::Up
        } else {
            Segment::Key(s.to_string())
        }
    }
}

impl From<String> for Segment {
    fn from(s: String) -> Self {
        if s == PARENT {
            Segment::Up
        } else {
            Segment::Key(s)
        }
    }
}

impl From<&String> for Segment {
    fn from(s: &String) -> Self {
        Segment::from(s.as_str())
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

/// A location in a nested tree.
///
/// Paths are cheap value types; every operation that extends or shortens a
/// path returns a new one.
///
/// ```
/// # use bigraph_schema::Path;
/// let path = Path::from("a.b.c");
/// assert_eq!(path.len(), 3);
/// assert_eq!(path.parent().to_string(), "a.b");
/// assert_eq!(Path::root().to_string(), "<root>");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// The empty path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dot-separated path. The empty string is the root.
    pub fn parse(s: &str) -> Self {
        if s.is_empty() {
            return Self::root();
        }
        s.split('.').map(Segment::from).collect()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn first(&self) -> Option<&Segment> {
        self.segments.first()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Extend the path by one segment.
    pub fn child(&self, segment: impl Into<Segment>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self::new(segments)
    }

    /// Concatenate another path onto this one.
    pub fn join(&self, other: &Path) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self::new(segments)
    }

    /// All segments but the last. The parent of the root is the root.
    pub fn parent(&self) -> Self {
        let end = self.segments.len().saturating_sub(1);
        Self::new(self.segments[..end].to_vec())
    }

    /// The first `len` segments.
    pub fn prefix(&self, len: usize) -> Self {
        Self::new(self.segments[..len.min(self.segments.len())].to_vec())
    }

    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Whether the path contains parent markers.
    pub fn is_relative(&self) -> bool {
        self.segments.contains(&Segment::Up)
    }

    /// Read a path stored as a wire: a sequence of string/integer keys, or a
    /// bare string naming a single key.
    pub fn from_tree(tree: &Tree) -> Option<Self> {
        match tree {
            Tree::Scalar(Scalar::Str(key)) => Some(Self::new(vec![Segment::from(key.as_str())])),
            Tree::Sequence(items) => items
                .iter()
                .map(|item| match item {
                    Tree::Scalar(Scalar::Str(key)) => Some(Segment::from(key.as_str())),
                    Tree::Scalar(Scalar::Int(index)) => usize::try_from(*index).ok().map(Segment::Index),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
                .map(Self::new),
            _ => None,
        }
    }

    /// Store the path as a wire value.
    pub fn to_tree(&self) -> Tree {
        Tree::Sequence(self.segments.iter().map(Segment::to_tree).collect())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "<root>");
        }
        let parts: Vec<String> = self.segments.iter().map(Segment::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl<S: Into<Segment>> FromIterator<S> for Path {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&Path> for Path {
    fn from(path: &Path) -> Self {
        path.clone()
    }
}

impl From<Vec<Segment>> for Path {
    fn from(segments: Vec<Segment>) -> Self {
        Self::new(segments)
    }
}

impl From<Vec<&str>> for Path {
    fn from(keys: Vec<&str>) -> Self {
        keys.into_iter().collect()
    }
}

impl<const N: usize> From<[&str; N]> for Path {
    fn from(keys: [&str; N]) -> Self {
        keys.into_iter().collect()
    }
}

impl From<Segment> for Path {
    fn from(segment: Segment) -> Self {
        Self::new(vec![segment])
    }
}

/// Read the value at `path`. `None` means absent.
pub fn get<'a>(tree: &'a Tree, path: &Path) -> Option<&'a Tree> {
    path.segments()
        .iter()
        .try_fold(tree, |node, segment| match node {
            Tree::Mapping(map) => segment.as_key().and_then(|key| map.get(&key)),
            Tree::Sequence(items) => segment.as_index().and_then(|index| items.get(index)),
            Tree::Scalar(_) => None,
        })
}

/// Mutable variant of [`get`].
pub fn get_mut<'a>(tree: &'a mut Tree, path: &Path) -> Option<&'a mut Tree> {
    let mut node = tree;
    for segment in path.segments() {
        node = match node {
            Tree::Mapping(map) => map.get_mut(&segment.as_key()?)?,
            Tree::Sequence(items) => items.get_mut(segment.as_index()?)?,
            Tree::Scalar(_) => return None,
        };
    }
    Some(node)
}

/// Write `value` at `path`, creating intermediate mappings as needed.
///
/// # Errors
///
/// - [`Error::PathConflict`] if an intermediate location holds a scalar.
/// - [`Error::InvalidPath`] for parent markers or out-of-range indices.
pub fn set(tree: &mut Tree, path: &Path, value: Tree) -> Result<()> {
    let Some((last, parents)) = path.segments().split_last() else {
        *tree = value;
        return Ok(());
    };

    let mut node = tree;
    for (depth, segment) in parents.iter().enumerate() {
        node = descend_or_create(node, segment, path, depth)?;
    }
    assign(node, last, value, path)
}

fn descend_or_create<'a>(
    node: &'a mut Tree,
    segment: &Segment,
    path: &Path,
    depth: usize,
) -> Result<&'a mut Tree> {
    match node {
        Tree::Mapping(map) => {
            let key = segment.as_key().ok_or_else(|| unresolved_parent(path))?;
            Ok(map.entry(key).or_insert_with(Tree::map))
        }
        Tree::Sequence(items) => {
            let index = segment.as_index().ok_or_else(|| Error::InvalidPath {
                path: path.clone(),
                reason: format!("segment '{}' does not index a sequence", segment),
            })?;
            if index == items.len() {
                items.push(Tree::map());
            }
            let len = items.len();
            items.get_mut(index).ok_or_else(|| Error::InvalidPath {
                path: path.clone(),
                reason: format!("index {} out of range for sequence of length {}", index, len),
            })
        }
        Tree::Scalar(scalar) => Err(Error::PathConflict {
            path: path.prefix(depth),
            found: Tree::Scalar(scalar.clone()).describe(),
        }),
    }
}

fn assign(node: &mut Tree, segment: &Segment, value: Tree, path: &Path) -> Result<()> {
    match node {
        Tree::Mapping(map) => {
            let key = segment.as_key().ok_or_else(|| unresolved_parent(path))?;
            map.insert(key, value);
            Ok(())
        }
        Tree::Sequence(items) => {
            let index = segment.as_index().ok_or_else(|| Error::InvalidPath {
                path: path.clone(),
                reason: format!("segment '{}' does not index a sequence", segment),
            })?;
            if index < items.len() {
                items[index] = value;
            } else if index == items.len() {
                items.push(value);
            } else {
                return Err(Error::InvalidPath {
                    path: path.clone(),
                    reason: format!("index {} out of range for sequence of length {}", index, items.len()),
                });
            }
            Ok(())
        }
        Tree::Scalar(_) => Err(Error::PathConflict {
            path: path.parent(),
            found: node.describe(),
        }),
    }
}

fn unresolved_parent(path: &Path) -> Error {
    Error::InvalidPath {
        path: path.clone(),
        reason: "parent markers must be resolved before writing".to_string(),
    }
}

/// Detach and return the value at `path`. Removing the root leaves an empty
/// mapping behind.
pub fn remove(tree: &mut Tree, path: &Path) -> Option<Tree> {
    let Some(last) = path.last() else {
        return Some(std::mem::take(tree));
    };
    match get_mut(tree, &path.parent())? {
        Tree::Mapping(map) => map.shift_remove(&last.as_key()?),
        Tree::Sequence(items) => {
            let index = last.as_index()?;
            (index < items.len()).then(|| items.remove(index))
        }
        Tree::Scalar(_) => None,
    }
}

/// Resolve `relative` against `base`, consuming each parent marker by
/// dropping the last segment of the path built so far.
///
/// ```
/// # use bigraph_schema::{path::resolve_relative, Path};
/// let base = Path::from("cell.membrane");
/// let resolved = resolve_relative(&base, &Path::from(vec!["..", "glucose"])).unwrap();
/// assert_eq!(resolved, Path::from("cell.glucose"));
/// ```
///
/// # Errors
///
/// [`Error::InvalidPath`] if the markers climb above the root.
pub fn resolve_relative(base: &Path, relative: &Path) -> Result<Path> {
    let mut segments = base.segments().to_vec();
    for segment in relative.segments() {
        match segment {
            Segment::Up => {
                if segments.pop().is_none() {
                    return Err(Error::InvalidPath {
                        path: relative.clone(),
                        reason: format!("escapes above the root when resolved against {}", base),
                    });
                }
            }
            other => segments.push(other.clone()),
        }
    }
    Ok(Path::new(segments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_path_display_and_parent() {
        let path = Path::from("a.b.c");
        assert_eq!(path.to_string(), "a.b.c");
        assert_eq!(path.parent(), Path::from("a.b"));
        assert_eq!(Path::root().parent(), Path::root());
    }

    #[test]
    fn test_get_distinguishes_absent_from_null() {
        let tree = Tree::from(json!({"a": {"b": null}}));
        assert_eq!(get(&tree, &Path::from("a.b")), Some(&Tree::null()));
        assert_eq!(get(&tree, &Path::from("a.c")), None);
        assert_eq!(get(&tree, &Path::from("a.b.c")), None);
    }

    #[test]
    fn test_get_indexes_sequences() {
        let tree = Tree::from(json!({"xs": [10, 20]}));
        assert_eq!(get(&tree, &Path::from("xs.1")), Some(&Tree::from(20)));
        assert_eq!(get(&tree, &Path::root().child("xs").child(0usize)), Some(&Tree::from(10)));
    }

    #[test]
    fn test_set_creates_intermediate_mappings() {
        let mut tree = Tree::map();
        set(&mut tree, &Path::from("down.here"), Tree::from(10)).unwrap();
        assert_eq!(tree, Tree::from(json!({"down": {"here": 10}})));
    }

    #[test]
    fn test_set_through_scalar_is_conflict() {
        let mut tree = Tree::from(json!({"a": 1}));
        let err = set(&mut tree, &Path::from("a.b"), Tree::from(2)).unwrap_err();
        match err {
            Error::PathConflict { path, .. } => assert_eq!(path, Path::from("a")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(tree, Tree::from(json!({"a": 1})));
    }

    #[test]
    fn test_set_appends_to_sequence() {
        let mut tree = Tree::from(json!({"xs": [1]}));
        set(&mut tree, &Path::from("xs.1"), Tree::from(2)).unwrap();
        assert_eq!(tree, Tree::from(json!({"xs": [1, 2]})));
        assert!(matches!(
            set(&mut tree, &Path::from("xs.5"), Tree::from(3)),
            Err(Error::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_set_root_replaces_tree() {
        let mut tree = Tree::from(json!({"a": 1}));
        set(&mut tree, &Path::root(), Tree::from(json!({"b": 2}))).unwrap();
        assert_eq!(tree, Tree::from(json!({"b": 2})));
    }

    #[test]
    fn test_remove() {
        let mut tree = Tree::from(json!({"a": {"b": 1, "c": 2}}));
        assert_eq!(remove(&mut tree, &Path::from("a.b")), Some(Tree::from(1)));
        assert_eq!(tree, Tree::from(json!({"a": {"c": 2}})));
        assert_eq!(remove(&mut tree, &Path::from("a.zz")), None);
    }

    #[test]
    fn test_resolve_relative() {
        let base = Path::from("cell.membrane");
        let wire = Path::from(vec!["..", "..", "env", "glucose"]);
        assert_eq!(resolve_relative(&base, &wire).unwrap(), Path::from("env.glucose"));
        assert_eq!(resolve_relative(&base, &Path::from("x")).unwrap(), Path::from("cell.membrane.x"));
    }

    #[test]
    fn test_resolve_relative_escaping_root_fails() {
        let base = Path::from("cell");
        let err = resolve_relative(&base, &Path::from(vec!["..", "..", "x"])).unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
    }

    #[test]
    fn test_wire_round_trip() {
        let wire = Path::from(vec!["..", "store"]).child(2usize);
        assert_eq!(Path::from_tree(&wire.to_tree()), Some(wire));
        assert_eq!(Path::from_tree(&Tree::from("store")), Some(Path::from("store")));
        assert_eq!(Path::from_tree(&Tree::from(1.5)), None);
    }

    fn key() -> impl Strategy<Value = String> {
        "[a-z]{1,4}"
    }

    proptest! {
        /// Writing then reading a fresh path returns the written value.
        #[test]
        fn prop_set_then_get(keys in proptest::collection::vec(key(), 0..5), value in any::<i64>()) {
            let mut tree = Tree::from(json!({"existing": {"leaf": 1}}));
            let path: Path = std::iter::once("fresh".to_string()).chain(keys).collect();
            set(&mut tree, &path, Tree::from(value)).unwrap();
            prop_assert_eq!(get(&tree, &path), Some(&Tree::from(value)));
            prop_assert_eq!(get(&tree, &Path::from("existing.leaf")), Some(&Tree::from(1)));
        }
    }
}
