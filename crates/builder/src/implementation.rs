//! Implementation registry.
//!
//! Edges refer to their behaviour by an **address** such as
//! `local:increase`. The [`ImplementationRegistry`] resolves addresses to
//! [`Implementation`]s, which tell the builder:
//!
//! - whether the edge is a process (time-stepped) or a step (triggered)
//! - which configuration keys it expects, with defaults
//! - the types of its input and output ports, given a configuration
//!
//! The builder never runs [`Implementation::update`] itself; it is exposed
//! for whatever executes the composite.
//!
//! # Addresses
//!
//! Only the `local:` protocol is served by a registry. Addresses without a
//! protocol are treated as local, so `increase` and `local:increase` name
//! the same implementation.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bigraph_schema::error::suggest;
use bigraph_schema::{EdgeKind, Tree};
use indexmap::IndexMap;
use tracing::debug;

use crate::error::{Error, Result};

/// Protocol prefix of addresses served by a registry.
pub const LOCAL: &str = "local:";

/// The address under which a registered name is stored in state.
pub fn address_of(name: &str) -> String {
    if name.contains(':') {
        name.to_string()
    } else {
        format!("{}{}", LOCAL, name)
    }
}

/// Registered name for an address.
pub fn strip_protocol(address: &str) -> &str {
    address.strip_prefix(LOCAL).unwrap_or(address)
}

/// Capability descriptor of a computational unit.
pub trait Implementation: fmt::Debug + Send + Sync {
    /// Process or step.
    fn kind(&self) -> EdgeKind;

    /// Schema of the configuration mapping. Defaults declared here are
    /// filled in when the edge is added.
    fn config_schema(&self) -> Tree {
        Tree::map()
    }

    /// Input port schema for a completed configuration.
    fn inputs(&self, config: &Tree) -> Tree;

    /// Output port schema for a completed configuration.
    fn outputs(&self, config: &Tree) -> Tree;

    /// Compute a partial state update from the current inputs.
    ///
    /// `interval` is `Some` for processes and `None` for steps.
    fn update(&self, config: &Tree, inputs: &Tree, interval: Option<f64>) -> Tree;
}

/// Registry of implementations keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ImplementationRegistry {
    implementations: IndexMap<String, Arc<dyn Implementation>>,
}

impl ImplementationRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in `ram-emitter`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(RamEmitter::NAME, RamEmitter::default());
        registry
    }

    /// Add or replace an implementation. A `local:` prefix on `name` is
    /// dropped.
    pub fn register(&mut self, name: &str, implementation: impl Implementation + 'static) {
        self.register_shared(name, Arc::new(implementation));
    }

    pub fn register_shared(&mut self, name: &str, implementation: Arc<dyn Implementation>) {
        let name = strip_protocol(name).to_string();
        debug!(name = %name, kind = %implementation.kind(), "registering implementation");
        self.implementations.insert(name, implementation);
    }

    pub fn contains(&self, address: &str) -> bool {
        self.implementations.contains_key(strip_protocol(address))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.implementations.keys().map(String::as_str)
    }

    /// Resolve an address.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownImplementation`] with the closest registered names.
    pub fn get(&self, address: &str) -> Result<Arc<dyn Implementation>> {
        self.implementations
            .get(strip_protocol(address))
            .cloned()
            .ok_or_else(|| Error::UnknownImplementation {
                address: address.to_string(),
                suggestions: suggest(strip_protocol(address), self.names()),
            })
    }
}

/// In-memory emitter.
///
/// A step whose input ports are exactly the entries of its `emit`
/// configuration. Every update is recorded and can be read back with
/// [`history`](RamEmitter::history).
#[derive(Debug, Default)]
pub struct RamEmitter {
    history: Mutex<Vec<Tree>>,
}

impl RamEmitter {
    pub const NAME: &'static str = "ram-emitter";

    /// Every input mapping received so far, oldest first.
    pub fn history(&self) -> Vec<Tree> {
        self.records().clone()
    }

    /// A panic elsewhere while recording leaves the list itself intact.
    fn records(&self) -> MutexGuard<'_, Vec<Tree>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Implementation for RamEmitter {
    fn kind(&self) -> EdgeKind {
        EdgeKind::Step
    }

    fn config_schema(&self) -> Tree {
        [("emit", Tree::from("tree[any]"))].into_iter().collect()
    }

    fn inputs(&self, config: &Tree) -> Tree {
        config.get_key("emit").cloned().unwrap_or_default()
    }

    fn outputs(&self, _config: &Tree) -> Tree {
        Tree::map()
    }

    fn update(&self, _config: &Tree, inputs: &Tree, _interval: Option<f64>) -> Tree {
        self.records().push(inputs.clone());
        Tree::map()
    }
}
