//! Integration test harness for bigraph builders.
//!
//! Provides fixture implementations, a registry pre-loaded with them, and a
//! [`TestHarness`] that can run every edge of a builder's model once so tests
//! can check the wiring end to end: Build → Wire → Generate → Resume.

use std::sync::Arc;

use bigraph_builder::{
    Builder, BuilderConfig, BuilderOptions, Composer, Implementation, ImplementationRegistry, RamEmitter, Snapshot,
};
use bigraph_schema::edge::{collect_edges, EdgeRecord};
use bigraph_schema::path::{self, resolve_relative};
use bigraph_schema::{EdgeKind, Path, Tree, TypeRegistry};
use thiserror::Error;
use tracing::debug;

/// Process that grows `level` by `rate * level * interval`.
#[derive(Debug, Default)]
pub struct Increase;

impl Increase {
    pub const NAME: &'static str = "increase";
}

impl Implementation for Increase {
    fn kind(&self) -> EdgeKind {
        EdgeKind::Process
    }

    fn config_schema(&self) -> Tree {
        let rate: Tree = [("_type", Tree::from("float")), ("_default", Tree::from(0.1))]
            .into_iter()
            .collect();
        [("rate", rate)].into_iter().collect()
    }

    fn inputs(&self, _config: &Tree) -> Tree {
        [("level", Tree::from("float"))].into_iter().collect()
    }

    fn outputs(&self, _config: &Tree) -> Tree {
        [("level", Tree::from("float"))].into_iter().collect()
    }

    fn update(&self, config: &Tree, inputs: &Tree, interval: Option<f64>) -> Tree {
        let rate = config.get_key("rate").and_then(Tree::as_f64).unwrap_or(0.0);
        let level = inputs.get_key("level").and_then(Tree::as_f64).unwrap_or(0.0);
        [("level", Tree::from(rate * level * interval.unwrap_or(1.0)))].into_iter().collect()
    }
}

/// Step that writes the sum of its `a` and `b` inputs to `total`.
#[derive(Debug, Default)]
pub struct Sum;

impl Sum {
    pub const NAME: &'static str = "sum";
}

impl Implementation for Sum {
    fn kind(&self) -> EdgeKind {
        EdgeKind::Step
    }

    fn inputs(&self, _config: &Tree) -> Tree {
        [("a", Tree::from("float")), ("b", Tree::from("float"))].into_iter().collect()
    }

    fn outputs(&self, _config: &Tree) -> Tree {
        [("total", Tree::from("float"))].into_iter().collect()
    }

    fn update(&self, _config: &Tree, inputs: &Tree, _interval: Option<f64>) -> Tree {
        let total: f64 = ["a", "b"]
            .iter()
            .filter_map(|port| inputs.get_key(port).and_then(Tree::as_f64))
            .sum();
        [("total", Tree::from(total))].into_iter().collect()
    }
}

/// Built-in implementations plus the fixtures, with the emitter shared so
/// its history can be inspected.
pub fn registries() -> (ImplementationRegistry, Arc<RamEmitter>) {
    let recorder = Arc::new(RamEmitter::default());
    let mut implementations = ImplementationRegistry::new();
    implementations.register_shared(RamEmitter::NAME, recorder.clone());
    implementations.register(Increase::NAME, Increase);
    implementations.register(Sum::NAME, Sum);
    (implementations, recorder)
}

/// Errors raised while running a model once.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("edge {path}: {source}")]
    Implementation {
        path: Path,
        #[source]
        source: bigraph_builder::Error,
    },

    #[error(transparent)]
    Schema(#[from] bigraph_schema::Error),
}

/// Composer that runs every edge exactly once, in tree order.
///
/// Each edge reads its inputs from the current state and its update is
/// applied before the next edge runs. Float outputs are added to their
/// target store, everything else replaces it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOnce;

impl Composer for RunOnce {
    type Output = Snapshot;
    type Error = RunError;

    fn compose(
        &self,
        schema: &Tree,
        state: &Tree,
        implementations: &ImplementationRegistry,
    ) -> Result<Snapshot, RunError> {
        let mut state = state.clone();
        let edges: Vec<Path> = collect_edges(&state).into_iter().map(|(at, _)| at).collect();

        for at in edges {
            let Some(record) = path::get(&state, &at).and_then(EdgeRecord::from_tree) else {
                continue;
            };
            let implementation = implementations
                .get(&record.address)
                .map_err(|source| RunError::Implementation { path: at.clone(), source })?;
            let parent = at.parent();

            let mut inputs = Tree::map();
            for (port, wire) in &record.inputs {
                let store = resolve_relative(&parent, wire)?;
                if let Some(value) = path::get(&state, &store) {
                    path::set(&mut inputs, &Path::root().child(port.as_str()), value.clone())?;
                }
            }

            let interval = match record.kind {
                EdgeKind::Process => record.interval,
                EdgeKind::Step => None,
            };
            let update = implementation.update(&record.config, &inputs, interval);
            debug!(edge = %at, update = %update, "applied update");

            for (port, value) in update.as_mapping().into_iter().flatten() {
                let Some(wire) = record.outputs.get(port) else {
                    continue;
                };
                let store = resolve_relative(&parent, wire)?;
                let next = match (path::get(&state, &store).and_then(Tree::as_f64), value.as_f64()) {
                    (Some(current), Some(delta)) => Tree::from(current + delta),
                    _ => value.clone(),
                };
                path::set(&mut state, &store, next)?;
            }
        }

        Ok(Snapshot {
            schema: schema.clone(),
            state,
        })
    }
}

/// Test harness around one builder.
pub struct TestHarness {
    builder: Builder,
    recorder: Arc<RamEmitter>,
}

impl TestHarness {
    /// A builder with the fixture registries and default config.
    ///
    /// # Panics
    ///
    /// Panics if the builder cannot be constructed.
    pub fn new() -> Self {
        Self::with_config(BuilderConfig::default())
    }

    /// # Panics
    ///
    /// Panics if the builder cannot be constructed.
    pub fn with_config(config: BuilderConfig) -> Self {
        let (implementations, recorder) = registries();
        let options = BuilderOptions::new()
            .types(TypeRegistry::new())
            .implementations(implementations)
            .config(config);
        let builder = Builder::construct(options).expect("builder construction failed");
        Self { builder, recorder }
    }

    pub fn builder(&self) -> &Builder {
        &self.builder
    }

    /// Options carrying this harness's registries and config, for building
    /// a second builder that should behave the same.
    pub fn options(&self) -> BuilderOptions {
        BuilderOptions::new()
            .types((*self.builder.types()).clone())
            .implementations((*self.builder.implementations()).clone())
            .config(self.builder.config())
    }

    /// Run every edge once and resume building from the result.
    ///
    /// # Panics
    ///
    /// Panics if generation or resumption fails.
    pub fn run_once(&mut self) {
        let snapshot = self.builder.generate(&RunOnce).expect("run failed");
        self.builder = Builder::from_composite(&snapshot, self.options()).expect("resume failed");
    }

    /// Every input mapping the emitter has received.
    pub fn recorded(&self) -> Vec<Tree> {
        self.recorder.history()
    }

    /// Get a state value's float form.
    pub fn get_float(&self, path: &str) -> Option<f64> {
        self.builder.at(path).value().ok().flatten().and_then(|value| value.as_f64())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
