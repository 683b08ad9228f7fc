//! Edge declaration.
//!
//! [`Node::add_process`] turns a node into an edge backed by a registered
//! implementation. The implementation decides the edge kind and, given the
//! completed configuration, its port schemas.

use bigraph_schema::edge::{edge_schema, EdgeRecord};
use bigraph_schema::merge::deep_merge_with;
use bigraph_schema::{path, Direction, EdgeKind, Mapping, MergeStrategy, Path, Segment, Tree};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::implementation::address_of;
use crate::node::Node;
use crate::wiring::check_wire;

/// Everything needed to declare one edge.
///
/// ```
/// # use bigraph_builder::ProcessSpec;
/// let spec = ProcessSpec::new("increase")
///     .with("rate", 0.1)
///     .input("level", "level_store")
///     .interval(0.5);
/// assert_eq!(spec.address(), "increase");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessSpec {
    address: String,
    config: Tree,
    overrides: Mapping,
    inputs: IndexMap<String, Path>,
    outputs: IndexMap<String, Path>,
    interval: Option<f64>,
}

impl ProcessSpec {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            config: Tree::map(),
            ..Self::default()
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Base configuration mapping.
    pub fn config(mut self, config: impl Into<Tree>) -> Self {
        self.config = config.into();
        self
    }

    /// Keyword override, merged over the base configuration.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Tree>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// Explicit input wire, relative to the edge's parent.
    pub fn input(mut self, port: impl Into<String>, wire: impl Into<Path>) -> Self {
        self.inputs.insert(port.into(), wire.into());
        self
    }

    /// Explicit output wire, relative to the edge's parent.
    pub fn output(mut self, port: impl Into<String>, wire: impl Into<Path>) -> Self {
        self.outputs.insert(port.into(), wire.into());
        self
    }

    pub fn inputs(mut self, wires: IndexMap<String, Path>) -> Self {
        self.inputs = wires;
        self
    }

    pub fn outputs(mut self, wires: IndexMap<String, Path>) -> Self {
        self.outputs = wires;
        self
    }

    /// Time step for processes. Ignored for steps.
    pub fn interval(mut self, interval: f64) -> Self {
        self.interval = Some(interval);
        self
    }

    fn wires(&self, direction: Direction) -> &IndexMap<String, Path> {
        match direction {
            Direction::Inputs => &self.inputs,
            Direction::Outputs => &self.outputs,
        }
    }
}

impl Node {
    /// Declare an edge at this node.
    ///
    /// The configuration is the base mapping with its keyword
    /// overrides merged on top, completed against the implementation's
    /// configuration schema so declared defaults are present. Any previous
    /// value at this node is replaced.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for the root node, an empty key or an
    ///   empty address.
    /// - [`Error::UnknownImplementation`] if the address is not registered.
    /// - [`Error::UnknownPort`] if an explicit wire names an undeclared port.
    /// - [`bigraph_schema::Error::InvalidPath`] if an explicit wire is empty.
    pub fn add_process(&self, spec: ProcessSpec) -> Result<()> {
        match self.path().last() {
            None => return Err(Error::InvalidArgument("cannot add a process at the root".to_string())),
            Some(Segment::Key(key)) if key.is_empty() => {
                return Err(Error::InvalidArgument("process name must not be empty".to_string()))
            }
            _ => {}
        }
        for (port, wire) in spec.inputs.iter().chain(&spec.outputs) {
            check_wire(port, wire)?;
        }
        if spec.address.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "process at {} needs an implementation address",
                self.path()
            )));
        }

        self.transact(|ws| {
            let implementation = ws.implementations.get(&spec.address)?;
            let kind = implementation.kind();

            let config = deep_merge_with(&spec.config, &Tree::Mapping(spec.overrides.clone()), MergeStrategy::Override)?;
            let (_, config) = ws.types.complete(&implementation.config_schema(), &config)?;
            let inputs = implementation.inputs(&config);
            let outputs = implementation.outputs(&config);

            let mut record = EdgeRecord::new(kind, address_of(&spec.address));
            for (direction, ports) in [(Direction::Inputs, &inputs), (Direction::Outputs, &outputs)] {
                let declared = ports.as_mapping();
                for (port, wire) in spec.wires(direction) {
                    if !declared.is_some_and(|ports| ports.contains_key(port)) {
                        return Err(Error::UnknownPort {
                            port: port.clone(),
                            edge: self.path().clone(),
                            available: declared.map(|ports| ports.keys().cloned().collect()).unwrap_or_default(),
                        });
                    }
                    let side = match direction {
                        Direction::Inputs => &mut record.inputs,
                        Direction::Outputs => &mut record.outputs,
                    };
                    side.insert(port.clone(), wire.clone());
                }
            }
            record.config = config;
            record.interval = match (kind, spec.interval) {
                (EdgeKind::Process, interval) => Some(interval.unwrap_or(ws.config.default_interval)),
                (EdgeKind::Step, Some(interval)) => {
                    warn!(path = %self.path(), interval, "ignoring interval on a step");
                    None
                }
                (EdgeKind::Step, None) => None,
            };

            debug!(path = %self.path(), address = %record.address, kind = %kind, "adding edge");
            path::set(&mut ws.schema, self.path(), edge_schema(kind, inputs, outputs))?;
            path::set(&mut ws.state, self.path(), record.to_tree())?;
            Ok(())
        })
    }
}
