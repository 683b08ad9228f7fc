//! Wiring resolver.
//!
//! Wires are stored in the edge's state record under `inputs`/`outputs` and
//! resolved against the edge's parent. [`Node::connect`] sets one wire;
//! [`Node::connect_all`] fills every missing wire below a node with a store
//! named after the port.

use bigraph_schema::edge::{collect_edges, wires};
use bigraph_schema::{path, Direction, Path, Segment};
use indexmap::IndexSet;
use tracing::debug;

use crate::error::{Error, Result};
use crate::node::Node;
use crate::workspace::Workspace;

impl Node {
    /// Wire `port` of the edge at this node to `target`.
    ///
    /// A port declared on both sides is wired on both.
    ///
    /// # Errors
    ///
    /// - [`Error::NotAnEdge`] if this node is not an edge.
    /// - [`Error::UnknownPort`] if neither side declares `port`.
    /// - [`bigraph_schema::Error::InvalidPath`] if `target` is empty.
    pub fn connect(&self, port: &str, target: impl Into<Path>) -> Result<()> {
        let target = target.into();
        check_wire(port, &target)?;
        debug!(edge = %self.path(), port, target = %target, "connect");
        self.transact(|ws| {
            self.require_edge(ws)?;
            let mut wired = false;
            for direction in Direction::BOTH {
                if ws.ports(self.path(), direction)?.contains_key(port) {
                    let at = self.path().child(direction.state_key()).child(port);
                    path::set(&mut ws.state, &at, target.to_tree())?;
                    wired = true;
                }
            }
            if wired {
                Ok(())
            } else {
                Err(Error::UnknownPort {
                    port: port.to_string(),
                    edge: self.path().clone(),
                    available: port_names(ws, self.path())?,
                })
            }
        })
    }

    /// Wire every unwired port of every edge at or below this node to a
    /// sibling store named `<port><wireSuffix>`. Returns the number of wires
    /// added; running it again adds none.
    pub fn connect_all(&self) -> Result<usize> {
        let suffix = self.read(|ws| ws.config.wire_suffix.clone())?;
        self.connect_all_with_suffix(&suffix)
    }

    /// [`connect_all`](Node::connect_all) with an explicit suffix.
    pub fn connect_all_with_suffix(&self, suffix: &str) -> Result<usize> {
        self.transact(|ws| {
            let Some(subtree) = path::get(&ws.state, self.path()) else {
                return Ok(0);
            };

            let mut missing = Vec::new();
            for (relative, edge) in collect_edges(subtree) {
                let at = self.path().join(&relative);
                for direction in Direction::BOTH {
                    let existing = wires(edge, direction);
                    for port in ws.ports(&at, direction)?.keys() {
                        if !existing.is_some_and(|wired| wired.contains_key(port)) {
                            missing.push((at.child(direction.state_key()).child(port.as_str()), port.clone()));
                        }
                    }
                }
            }

            for (at, port) in &missing {
                let store = Path::from(Segment::Key(format!("{}{}", port, suffix)));
                path::set(&mut ws.state, at, store.to_tree())?;
            }
            debug!(path = %self.path(), added = missing.len(), "connect_all");
            Ok(missing.len())
        })
    }
}

/// Wires name a store, so the edge's parent itself is not a valid target.
pub(crate) fn check_wire(port: &str, wire: &Path) -> Result<()> {
    if wire.is_empty() {
        return Err(bigraph_schema::Error::InvalidPath {
            path: wire.clone(),
            reason: format!("wire for port '{port}' must not be empty"),
        }
        .into());
    }
    Ok(())
}

/// Declared port names of both sides, inputs first.
pub(crate) fn port_names(ws: &Workspace, edge: &Path) -> Result<Vec<String>> {
    let mut names = IndexSet::new();
    for direction in Direction::BOTH {
        names.extend(ws.ports(edge, direction)?.into_keys());
    }
    Ok(names.into_iter().collect())
}
