//! The builder façade.
//!
//! A [`Builder`] owns the canonical schema and state trees. Everything else,
//! including every [`Node`] handed out, is a view onto them.

use std::cell::RefCell;
use std::path::{Path as FsPath, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use bigraph_schema::edge::{collect_edges, edge_kind, keys};
use bigraph_schema::merge::deep_merge;
use bigraph_schema::{EdgeKind, Path, Tree, TypeRegistry};
use tracing::{debug, info};

use crate::compose::{Composer, Composite};
use crate::config::BuilderConfig;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::implementation::ImplementationRegistry;
use crate::node::Node;
use crate::process::ProcessSpec;
use crate::workspace::Workspace;

/// Inputs to [`Builder::construct`]. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct BuilderOptions {
    types: Option<TypeRegistry>,
    implementations: Option<ImplementationRegistry>,
    config: BuilderConfig,
    schema: Tree,
    state: Tree,
    document: Option<PathBuf>,
}

impl BuilderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Type registry to resolve against. Defaults to the built-in types.
    pub fn types(mut self, types: TypeRegistry) -> Self {
        self.types = Some(types);
        self
    }

    /// Implementation registry for `add_process`. Defaults to
    /// [`ImplementationRegistry::with_builtins`].
    pub fn implementations(mut self, implementations: ImplementationRegistry) -> Self {
        self.implementations = Some(implementations);
        self
    }

    pub fn config(mut self, config: BuilderConfig) -> Self {
        self.config = config;
        self
    }

    /// Initial schema tree.
    pub fn schema(mut self, schema: impl Into<Tree>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Initial state tree.
    pub fn state(mut self, state: impl Into<Tree>) -> Self {
        self.state = state.into();
        self
    }

    /// Document merged into the initial trees.
    pub fn document(mut self, path: impl Into<PathBuf>) -> Self {
        self.document = Some(path.into());
        self
    }
}

/// One edge found by [`Builder::edges`].
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSummary {
    pub path: Path,
    pub kind: EdgeKind,
    pub address: String,
}

/// Owner of a schema tree and a state tree under construction.
///
/// ```
/// # use bigraph_builder::Builder;
/// # use bigraph_schema::Tree;
/// # use serde_json::json;
/// let builder = Builder::new()?;
/// builder.root().set(["down", "here"], Tree::from(json!({"_value": 10, "_type": "integer"})))?;
/// assert_eq!(builder.at("down.here").value()?, Some(Tree::from(10)));
/// assert!(builder.at("emitter").is_edge()?);
/// # Ok::<(), bigraph_builder::Error>(())
/// ```
#[derive(Debug)]
pub struct Builder {
    workspace: Rc<RefCell<Workspace>>,
    root: Node,
}

impl Builder {
    /// An empty builder with the built-in registries and default config.
    pub fn new() -> Result<Self> {
        Self::construct(BuilderOptions::default())
    }

    /// Build from explicit options.
    ///
    /// The document, if any, is merged strictly over the given trees. Both
    /// trees are completed once, then the emitter is attached unless its key
    /// is already taken.
    pub fn construct(options: BuilderOptions) -> Result<Self> {
        let BuilderOptions {
            types,
            implementations,
            config,
            mut schema,
            mut state,
            document,
        } = options;
        config.validate()?;

        let mut types = types.unwrap_or_default();
        config.register_types(&mut types)?;

        if let Some(path) = &document {
            let loaded = Document::read(path)?;
            schema = deep_merge(&schema, &loaded.schema)?;
            state = deep_merge(&state, &loaded.state)?;
        }

        let mut workspace = Workspace {
            schema,
            state,
            types: Arc::new(types),
            implementations: Arc::new(implementations.unwrap_or_else(ImplementationRegistry::with_builtins)),
            config,
        };
        workspace.complete()?;
        workspace.attach_emitter()?;

        let workspace = Rc::new(RefCell::new(workspace));
        let root = Node::new(Rc::downgrade(&workspace), Path::root());
        debug!(document = ?document, "builder constructed");
        Ok(Self { workspace, root })
    }

    /// Load a document written by [`write`](Builder::write).
    pub fn load(path: impl AsRef<FsPath>) -> Result<Self> {
        Self::load_with(path, BuilderOptions::default())
    }

    /// Load a document with explicit registries and config.
    pub fn load_with(path: impl AsRef<FsPath>, options: BuilderOptions) -> Result<Self> {
        Self::construct(options.document(path.as_ref()))
    }

    /// Resume from whatever a [`Composer`] produced. The composite's trees
    /// replace any trees in `options`.
    pub fn from_composite(composite: &impl Composite, options: BuilderOptions) -> Result<Self> {
        Self::construct(options.schema(composite.schema().clone()).state(composite.state().clone()))
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Node handle at an absolute path.
    pub fn at(&self, path: impl Into<Path>) -> Node {
        self.root.at(path)
    }

    pub fn child(&self, key: &str) -> Node {
        self.root.child(key)
    }

    /// Copy of the completed schema tree.
    pub fn schema(&self) -> Tree {
        self.workspace.borrow().schema.clone()
    }

    /// Copy of the completed state tree.
    pub fn state(&self) -> Tree {
        self.workspace.borrow().state.clone()
    }

    /// [`Node::set`] from the root.
    pub fn set(&self, keys: impl Into<Path>, value: impl Into<Tree>) -> Result<()> {
        self.root.set(keys, value)
    }

    /// [`Node::update`] at the root.
    pub fn update(&self, partial: impl Into<Tree>) -> Result<()> {
        self.root.update(partial)
    }

    /// Declare an edge under the root at `key`.
    pub fn add_process(&self, key: &str, spec: ProcessSpec) -> Result<()> {
        self.root.child(key).add_process(spec)
    }

    /// [`Node::connect_all`] from the root.
    pub fn connect_all(&self) -> Result<usize> {
        self.root.connect_all()
    }

    /// Snapshot of both trees.
    pub fn document(&self) -> Document {
        let ws = self.workspace.borrow();
        Document::new(ws.schema.clone(), ws.state.clone())
    }

    /// Write the document to `path`, JSON or YAML by extension.
    pub fn write(&self, path: impl AsRef<FsPath>) -> Result<()> {
        self.document().write(path)
    }

    /// Hand the trees to `composer` and return the runnable unit.
    pub fn generate<C: Composer>(&self, composer: &C) -> Result<C::Output> {
        let ws = self.workspace.borrow();
        info!(edges = collect_edges(&ws.state).len(), "generating composite");
        composer
            .compose(&ws.schema, &ws.state, &ws.implementations)
            .map_err(|err| Error::Compose(Box::new(err)))
    }

    /// Drop everything and re-attach a fresh emitter. On failure both trees
    /// are left as they were.
    pub fn reset(&self) -> Result<()> {
        self.root.transact(|ws| {
            ws.schema = Tree::map();
            ws.state = Tree::map();
            ws.attach_emitter()
        })
    }

    /// Every edge, in tree order.
    pub fn edges(&self) -> Vec<EdgeSummary> {
        let ws = self.workspace.borrow();
        collect_edges(&ws.state)
            .into_iter()
            .filter_map(|(path, record)| {
                Some(EdgeSummary {
                    kind: edge_kind(record)?,
                    address: record
                        .get_key(keys::ADDRESS)
                        .and_then(Tree::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    path,
                })
            })
            .collect()
    }

    pub fn config(&self) -> BuilderConfig {
        self.workspace.borrow().config.clone()
    }

    pub fn types(&self) -> Arc<TypeRegistry> {
        Arc::clone(&self.workspace.borrow().types)
    }

    pub fn implementations(&self) -> Arc<ImplementationRegistry> {
        Arc::clone(&self.workspace.borrow().implementations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{Snapshot, SnapshotComposer};
    use serde_json::json;

    /// Composer that calls back into the builder while composing.
    struct CallsBack<F>(F);

    impl<F: Fn() -> Result<()>> Composer for CallsBack<F> {
        type Output = Snapshot;
        type Error = Error;

        fn compose(&self, schema: &Tree, state: &Tree, _implementations: &ImplementationRegistry) -> Result<Snapshot> {
            (self.0)()?;
            Ok(Snapshot {
                schema: schema.clone(),
                state: state.clone(),
            })
        }
    }

    fn busy(result: Result<Snapshot>) -> bool {
        match result {
            Err(Error::Compose(err)) => matches!(err.downcast_ref::<Error>(), Some(Error::Busy)),
            _ => false,
        }
    }

    #[test]
    fn test_new_attaches_emitter() {
        let builder = Builder::new().unwrap();
        let edges = builder.edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].path, Path::from("emitter"));
        assert_eq!(edges[0].kind, EdgeKind::Step);
        assert_eq!(edges[0].address, "local:ram-emitter");
        assert_eq!(
            builder.at("emitter.config").value().unwrap(),
            Some(Tree::from(json!({"emit": {}})))
        );
    }

    #[test]
    fn test_emitter_key_from_config() {
        let config = BuilderConfig {
            emitter_key: "recorder".to_string(),
            ..BuilderConfig::default()
        };
        let builder = Builder::construct(BuilderOptions::new().config(config)).unwrap();
        assert!(builder.at("recorder").is_edge().unwrap());
        assert_eq!(builder.at("emitter").value().unwrap(), None);
    }

    #[test]
    fn test_existing_key_blocks_emitter() {
        let builder = Builder::construct(BuilderOptions::new().state(Tree::from(json!({"emitter": 3})))).unwrap();
        assert_eq!(builder.at("emitter").value().unwrap(), Some(Tree::from(3)));
        assert!(builder.edges().is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = BuilderConfig {
            default_interval: 0.0,
            ..BuilderConfig::default()
        };
        assert!(matches!(
            Builder::construct(BuilderOptions::new().config(config)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_construct_completes_initial_trees() {
        let builder = Builder::construct(
            BuilderOptions::new()
                .schema(Tree::from(json!({"a": "integer", "b": "list[float]"})))
                .state(Tree::from(json!({"c": "x"}))),
        )
        .unwrap();
        let state = builder.state();
        assert_eq!(state.get_key("a"), Some(&Tree::from(0)));
        assert_eq!(state.get_key("b"), Some(&Tree::from(json!([]))));
        assert_eq!(builder.schema().get_key("c"), Some(&Tree::from("string")));
    }

    #[test]
    fn test_document_conflicts_with_initial_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        Document::new(Tree::map(), Tree::from(json!({"a": 1}))).write(&path).unwrap();

        let err = Builder::construct(BuilderOptions::new().state(Tree::from(json!({"a": 2}))).document(&path))
            .unwrap_err();
        assert!(matches!(err, Error::Schema(bigraph_schema::Error::MergeConflict { .. })));
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.yaml");
        let builder = Builder::new().unwrap();
        builder.set("level", Tree::from(json!({"_type": "float", "_value": 4.0}))).unwrap();
        builder.write(&path).unwrap();

        let loaded = Builder::load(&path).unwrap();
        assert_eq!(loaded.document(), builder.document());
    }

    #[test]
    fn test_generate_and_resume() {
        let builder = Builder::new().unwrap();
        builder.set("x", 1.5).unwrap();
        let snapshot = builder.generate(&SnapshotComposer).unwrap();
        assert_eq!(snapshot.state.get_key("x"), Some(&Tree::from(1.5)));

        let resumed = Builder::from_composite(&snapshot, BuilderOptions::new()).unwrap();
        assert_eq!(resumed.document(), builder.document());
    }

    #[test]
    fn test_reset() {
        let builder = Builder::new().unwrap();
        builder.set("x", 1).unwrap();
        let node = builder.at("x");
        builder.reset().unwrap();
        assert_eq!(node.value().unwrap(), None);
        assert_eq!(builder.edges().len(), 1);
    }

    #[test]
    fn test_tree_copies_do_not_block_mutation() {
        let builder = Builder::new().unwrap();
        let schema = builder.schema();
        let state = builder.state();
        builder.set("x", 1.0).unwrap();

        assert_eq!(state.get_key("x"), None);
        assert_eq!(schema.get_key("x"), None);
        assert_eq!(builder.state().get_key("x"), Some(&Tree::from(1.0)));
    }

    #[test]
    fn test_mutation_during_generate_is_busy() {
        let builder = Builder::new().unwrap();
        builder.set("x", 1).unwrap();
        let node = builder.at("y");
        let before = builder.document();

        assert!(busy(builder.generate(&CallsBack(|| node.set(Path::root(), 2)))));
        assert!(busy(builder.generate(&CallsBack(|| builder.reset()))));
        assert!(!busy(builder.generate(&CallsBack(|| node.value().map(drop)))));
        assert_eq!(builder.document(), before);
    }
}
