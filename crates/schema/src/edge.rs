//! Edge records.
//!
//! An edge is a state-tree mapping describing a computational unit rather
//! than passive data:
//!
//! ```json
//! {
//!   "kind": "process",
//!   "address": "local:increase",
//!   "config": {"rate": 0.1},
//!   "inputs": {"level": ["level_store"]},
//!   "outputs": {"level": ["level_store"]},
//!   "interval": 1.0
//! }
//! ```
//!
//! Wires (the values of `inputs`/`outputs`) are paths resolved against the
//! edge's parent location. The matching schema entry declares the port
//! types under `_inputs`/`_outputs`.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::path::Path;
use crate::tree::{Mapping, Tree};
use crate::types::reserved;

/// State keys of an edge record.
pub mod keys {
    pub const KIND: &str = "kind";
    pub const ADDRESS: &str = "address";
    pub const CONFIG: &str = "config";
    pub const INPUTS: &str = "inputs";
    pub const OUTPUTS: &str = "outputs";
    pub const INTERVAL: &str = "interval";
}

/// Whether an edge steps through time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Has a time-interval contract.
    Process,
    /// Triggered, no interval.
    Step,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Process => "process",
            EdgeKind::Step => "step",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "process" => Ok(EdgeKind::Process),
            "step" => Ok(EdgeKind::Step),
            other => Err(format!("unknown edge kind: {}", other)),
        }
    }
}

/// Which side of an edge a port sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Inputs,
    Outputs,
}

impl Direction {
    pub const BOTH: [Direction; 2] = [Direction::Inputs, Direction::Outputs];

    /// Key of the wiring map in the edge's state record.
    pub fn state_key(&self) -> &'static str {
        match self {
            Direction::Inputs => keys::INPUTS,
            Direction::Outputs => keys::OUTPUTS,
        }
    }

    /// Key of the port schema in the edge's schema entry.
    pub fn schema_key(&self) -> &'static str {
        match self {
            Direction::Inputs => reserved::INPUTS,
            Direction::Outputs => reserved::OUTPUTS,
        }
    }
}

/// The kind of an edge record, or `None` if `value` is not an edge.
pub fn edge_kind(value: &Tree) -> Option<EdgeKind> {
    value.get_key(keys::KIND)?.as_str()?.parse().ok()
}

/// Whether `value` is an edge record.
pub fn is_edge(value: &Tree) -> bool {
    edge_kind(value).is_some()
}

/// The wiring map of one side of an edge record.
pub fn wires(value: &Tree, direction: Direction) -> Option<&Mapping> {
    value.get_key(direction.state_key())?.as_mapping()
}

/// Every edge record in a state tree with its absolute path, in tree order.
/// Edges are not searched for nested edges.
pub fn collect_edges(state: &Tree) -> Vec<(Path, &Tree)> {
    fn walk<'a>(node: &'a Tree, at: &Path, out: &mut Vec<(Path, &'a Tree)>) {
        if is_edge(node) {
            out.push((at.clone(), node));
            return;
        }
        if let Some(map) = node.as_mapping() {
            for (key, child) in map {
                if !reserved::is_reserved(key) {
                    walk(child, &at.child(key.as_str()), out);
                }
            }
        }
    }

    let mut edges = Vec::new();
    walk(state, &Path::root(), &mut edges);
    edges
}

/// Build the schema entry for an edge.
pub fn edge_schema(kind: EdgeKind, inputs: Tree, outputs: Tree) -> Tree {
    let mut schema = Mapping::new();
    schema.insert(reserved::TYPE.to_string(), Tree::from(kind.as_str()));
    schema.insert(reserved::INPUTS.to_string(), inputs);
    schema.insert(reserved::OUTPUTS.to_string(), outputs);
    Tree::Mapping(schema)
}

/// Typed view of an edge record, used when declaring new edges.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    pub kind: EdgeKind,
    pub address: String,
    pub config: Tree,
    pub inputs: IndexMap<String, Path>,
    pub outputs: IndexMap<String, Path>,
    pub interval: Option<f64>,
}

impl EdgeRecord {
    pub fn new(kind: EdgeKind, address: impl Into<String>) -> Self {
        Self {
            kind,
            address: address.into(),
            config: Tree::map(),
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            interval: None,
        }
    }

    /// Read a record back from state. Wires that are not paths are skipped.
    pub fn from_tree(value: &Tree) -> Option<Self> {
        let kind = edge_kind(value)?;
        let address = value.get_key(keys::ADDRESS)?.as_str()?.to_string();
        let read_wires = |direction: Direction| -> IndexMap<String, Path> {
            wires(value, direction)
                .map(|map| {
                    map.iter()
                        .filter_map(|(port, wire)| Some((port.clone(), Path::from_tree(wire)?)))
                        .collect()
                })
                .unwrap_or_default()
        };
        Some(Self {
            kind,
            address,
            config: value.get_key(keys::CONFIG).cloned().unwrap_or_else(Tree::map),
            inputs: read_wires(Direction::Inputs),
            outputs: read_wires(Direction::Outputs),
            interval: value.get_key(keys::INTERVAL).and_then(Tree::as_f64),
        })
    }

    pub fn to_tree(&self) -> Tree {
        let wire_map = |wires: &IndexMap<String, Path>| -> Tree {
            wires.iter().map(|(port, path)| (port.clone(), path.to_tree())).collect()
        };
        let mut record = Mapping::new();
        record.insert(keys::KIND.to_string(), Tree::from(self.kind.as_str()));
        record.insert(keys::ADDRESS.to_string(), Tree::from(self.address.as_str()));
        record.insert(keys::CONFIG.to_string(), self.config.clone());
        record.insert(keys::INPUTS.to_string(), wire_map(&self.inputs));
        record.insert(keys::OUTPUTS.to_string(), wire_map(&self.outputs));
        if let Some(interval) = self.interval {
            record.insert(keys::INTERVAL.to_string(), Tree::from(interval));
        }
        Tree::Mapping(record)
    }
}
