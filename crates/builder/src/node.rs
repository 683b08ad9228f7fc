//! Node handles.
//!
//! A [`Node`] is a path-addressed view into a builder's schema and state
//! trees. Nodes do not own data: they hold a weak reference to the builder's
//! workspace and their absolute path. Child handles are created on first
//! access and cached, so repeated navigation returns the same handle.
//!
//! Every mutating method runs as one transaction: the trees are written,
//! then completed, and restored if either step fails.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use bigraph_schema::edge::{is_edge, EdgeRecord};
use bigraph_schema::merge::merge_into;
use bigraph_schema::types::reserved;
use bigraph_schema::{path, MergeStrategy, Path, Segment, Tree};
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::error::{Error, Result};
use crate::workspace::Workspace;

/// Handle to one location of a builder's trees.
#[derive(Clone)]
pub struct Node {
    inner: Rc<NodeInner>,
}

struct NodeInner {
    workspace: Weak<RefCell<Workspace>>,
    path: Path,
    children: RefCell<IndexMap<Segment, Node>>,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node").field("path", &self.inner.path).finish()
    }
}

impl Node {
    pub(crate) fn new(workspace: Weak<RefCell<Workspace>>, path: Path) -> Self {
        Self {
            inner: Rc::new(NodeInner {
                workspace,
                path,
                children: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// Absolute path of this node.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Handle for a direct child. Nothing is written.
    pub fn child(&self, key: impl Into<Segment>) -> Node {
        let segment = key.into();
        self.inner
            .children
            .borrow_mut()
            .entry(segment.clone())
            .or_insert_with(|| Node::new(self.inner.workspace.clone(), self.inner.path.child(segment)))
            .clone()
    }

    /// Handle for a descendant, relative to this node.
    pub fn at(&self, relative: impl Into<Path>) -> Node {
        relative
            .into()
            .segments()
            .iter()
            .fold(self.clone(), |node, segment| node.child(segment.clone()))
    }

    /// The state value here, or `None` if absent.
    pub fn value(&self) -> Result<Option<Tree>> {
        self.read(|ws| path::get(&ws.state, self.path()).cloned())
    }

    /// The schema fragment here, or `None` if absent.
    pub fn schema(&self) -> Result<Option<Tree>> {
        self.read(|ws| path::get(&ws.schema, self.path()).cloned())
    }

    pub fn is_edge(&self) -> Result<bool> {
        self.read(|ws| path::get(&ws.state, self.path()).is_some_and(is_edge))
    }

    /// The edge record here, if this node is an edge.
    pub fn edge(&self) -> Result<Option<EdgeRecord>> {
        self.read(|ws| path::get(&ws.state, self.path()).and_then(EdgeRecord::from_tree))
    }

    /// Handles for every child key in the schema or the state, schema keys
    /// first. Reserved keys are skipped.
    pub fn children(&self) -> Result<Vec<Node>> {
        let keys = self.read(|ws| {
            let keys_of = |tree: &Tree| -> Vec<String> {
                path::get(tree, self.path())
                    .and_then(Tree::as_mapping)
                    .map(|map| map.keys().filter(|key| !reserved::is_reserved(key)).cloned().collect())
                    .unwrap_or_default()
            };
            let mut keys: IndexSet<String> = keys_of(&ws.schema).into_iter().collect();
            keys.extend(keys_of(&ws.state));
            keys
        })?;
        Ok(keys.into_iter().map(|key| self.child(key)).collect())
    }

    /// Write `value` at `keys` below this node.
    ///
    /// - A mapping with `_type` and/or `_value` is split: `_value` goes to
    ///   the state tree, the remaining keys to the schema tree (a bare
    ///   `_type` is stored as the type name).
    /// - Any other non-empty mapping is written key by key through child
    ///   handles.
    /// - Everything else is written to the state tree as is.
    pub fn set(&self, keys: impl Into<Path>, value: impl Into<Tree>) -> Result<()> {
        let target = self.at(keys);
        let value = value.into();
        debug!(path = %target.path(), "set");
        self.transact(|ws| target.write(ws, value))
    }

    fn write(&self, ws: &mut Workspace, value: Tree) -> Result<()> {
        let map = match value {
            Tree::Mapping(map) if !map.is_empty() => map,
            other => return Ok(path::set(&mut ws.state, self.path(), other)?),
        };

        if map.contains_key(reserved::TYPE) || map.contains_key(reserved::VALUE) {
            let mut declaration = map;
            if let Some(state) = declaration.shift_remove(reserved::VALUE) {
                path::set(&mut ws.state, self.path(), state)?;
            }
            let declaration = match declaration.get(reserved::TYPE) {
                Some(name) if declaration.len() == 1 => name.clone(),
                _ if declaration.is_empty() => return Ok(()),
                _ => Tree::Mapping(declaration),
            };
            return Ok(path::set(&mut ws.schema, self.path(), declaration)?);
        }

        for (key, child) in map {
            self.child(key).write(ws, child)?;
        }
        Ok(())
    }

    /// Merge `partial` into the state here. Leaves in `partial` replace
    /// existing leaves.
    pub fn update(&self, partial: impl Into<Tree>) -> Result<()> {
        let partial = partial.into();
        debug!(path = %self.path(), "update");
        self.transact(|ws| {
            match path::get_mut(&mut ws.state, self.path()) {
                Some(existing) => merge_into(existing, partial, MergeStrategy::Override, self.path())?,
                None => path::set(&mut ws.state, self.path(), partial)?,
            }
            Ok(())
        })
    }

    pub(crate) fn workspace(&self) -> Result<Rc<RefCell<Workspace>>> {
        self.inner.workspace.upgrade().ok_or(Error::Detached)
    }

    pub(crate) fn read<T>(&self, op: impl FnOnce(&Workspace) -> T) -> Result<T> {
        let workspace = self.workspace()?;
        let guard = workspace.try_borrow().map_err(|_| Error::Busy)?;
        Ok(op(&guard))
    }

    pub(crate) fn transact<T>(&self, op: impl FnOnce(&mut Workspace) -> Result<T>) -> Result<T> {
        let workspace = self.workspace()?;
        let mut guard = workspace.try_borrow_mut().map_err(|_| Error::Busy)?;
        let result = guard.transact(op);
        result
    }

    /// Error unless this node is an edge.
    pub(crate) fn require_edge<'w>(&self, ws: &'w Workspace) -> Result<&'w Tree> {
        path::get(&ws.state, self.path())
            .filter(|value| is_edge(value))
            .ok_or_else(|| Error::NotAnEdge { path: self.path().clone() })
    }
}

#[cfg(test)]
mod tests {
    use crate::Builder;
    use bigraph_schema::{Path, Tree};
    use serde_json::json;

    #[test]
    fn test_child_handles_are_cached() {
        let builder = Builder::new().unwrap();
        let a = builder.root().child("a");
        let again = builder.root().child("a");
        assert_eq!(a.path(), &Path::from("a"));
        assert!(std::rc::Rc::ptr_eq(&a.inner, &again.inner));
        assert_eq!(builder.at("a.b.c").path(), &Path::from("a.b.c"));
    }

    #[test]
    fn test_navigation_does_not_write() {
        let builder = Builder::new().unwrap();
        let node = builder.at("nothing.here");
        assert_eq!(node.value().unwrap(), None);
        assert_eq!(builder.state().get_key("nothing"), None);
    }

    #[test]
    fn test_set_routes_type_and_value() {
        let builder = Builder::new().unwrap();
        builder
            .root()
            .set(["down", "here"], Tree::from(json!({"_value": 10, "_type": "integer"})))
            .unwrap();
        assert_eq!(builder.at("down.here").value().unwrap(), Some(Tree::from(10)));
        assert_eq!(builder.at("down.here").schema().unwrap(), Some(Tree::from("integer")));
    }

    #[test]
    fn test_set_keeps_type_overrides() {
        let builder = Builder::new().unwrap();
        builder
            .root()
            .set("mass", Tree::from(json!({"_type": "float", "_default": 2.5})))
            .unwrap();
        assert_eq!(builder.at("mass").value().unwrap(), Some(Tree::from(2.5)));
        assert_eq!(
            builder.at("mass").schema().unwrap(),
            Some(Tree::from(json!({"_type": "float", "_default": 2.5})))
        );
    }

    #[test]
    fn test_set_plain_mapping_recurses() {
        let builder = Builder::new().unwrap();
        builder
            .root()
            .set(Path::root(), Tree::from(json!({"cell": {"mass": 1.5, "label": "a"}})))
            .unwrap();
        assert_eq!(builder.at("cell.mass").value().unwrap(), Some(Tree::from(1.5)));
        assert_eq!(builder.at("cell.label").schema().unwrap(), Some(Tree::from("string")));
    }

    #[test]
    fn test_failed_set_rolls_back() {
        let builder = Builder::new().unwrap();
        builder.root().set("level", Tree::from(json!({"_type": "float", "_value": 1.0}))).unwrap();
        let before = builder.document();

        let err = builder.root().set("level", "not a number").unwrap_err();
        assert!(err.to_string().contains("level"));
        assert_eq!(builder.document(), before);

        assert!(builder.root().set("level.inner", 1).is_err());
        assert_eq!(builder.document(), before);
    }

    #[test]
    fn test_update_overrides_leaves() {
        let builder = Builder::new().unwrap();
        builder.root().set("cell", Tree::from(json!({"a": 1, "b": {"c": 2}}))).unwrap();
        builder.at("cell").update(Tree::from(json!({"a": 5, "b": {"d": 3}}))).unwrap();
        assert_eq!(
            builder.at("cell").value().unwrap(),
            Some(Tree::from(json!({"a": 5, "b": {"c": 2, "d": 3}})))
        );
    }

    #[test]
    fn test_children_union_schema_and_state() {
        let builder = Builder::new().unwrap();
        builder.root().set("cell", Tree::from(json!({"x": {"_type": "float"}, "y": 1}))).unwrap();
        let names: Vec<String> = builder
            .at("cell")
            .children()
            .unwrap()
            .iter()
            .map(|node| node.path().to_string())
            .collect();
        assert_eq!(names, vec!["cell.x", "cell.y"]);
    }

    #[test]
    fn test_handles_detach_when_builder_drops() {
        let node = {
            let builder = Builder::new().unwrap();
            builder.at("a")
        };
        assert!(matches!(node.value(), Err(crate::Error::Detached)));
    }
}
