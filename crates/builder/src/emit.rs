//! Emit router.
//!
//! Routes data to the builder's emitter edge. Each routed key adds three
//! entries to the emitter:
//!
//! - `config.emit.<key>`: the type of the routed data
//! - `inputs.<key>`: a wire to the store holding it
//! - `_inputs.<key>` in its schema: the same type, so completion checks the
//!   wire like any other port

use bigraph_schema::edge::{edge_kind, edge_schema, keys, wires};
use bigraph_schema::path::resolve_relative;
use bigraph_schema::types::reserved;
use bigraph_schema::{path, Direction, Path, Segment, Tree};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::node::Node;
use crate::wiring::port_names;
use crate::workspace::Workspace;

/// One key to add to the emitter.
#[derive(Debug)]
struct Route {
    key: String,
    schema: Tree,
    source: Path,
}

impl Node {
    /// Route data at this node to the emitter, keyed by port name (or by
    /// the node's own key when it is not an edge).
    ///
    /// - On an edge with `port` given: route the store that port is wired
    ///   to. Inputs are searched before outputs.
    /// - On an edge without `port`: route every wired port. Unwired ports
    ///   are skipped with a warning.
    /// - On any other node: route this node's own value.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownPort`] if `port` is declared on neither side.
    /// - [`Error::UnwiredPort`] if `port` is declared but has no wire.
    /// - [`Error::EmitKeyConflict`] if two routed ports would share an
    ///   emitter key but read different stores.
    /// - [`Error::NotAnEdge`] if `port` is given on a non-edge node, or the
    ///   emitter is missing.
    pub fn emit(&self, port: Option<&str>) -> Result<()> {
        self.route(None, port)
    }

    /// [`emit`](Node::emit) under an explicit emitter key.
    pub fn emit_as(&self, key: &str, port: Option<&str>) -> Result<()> {
        if key.is_empty() || reserved::is_reserved(key) {
            return Err(Error::InvalidArgument(format!("invalid emit key '{}'", key)));
        }
        self.route(Some(key), port)
    }

    fn route(&self, key: Option<&str>, port: Option<&str>) -> Result<()> {
        self.transact(|ws| {
            let routes = match path::get(&ws.state, self.path()).and_then(edge_kind) {
                Some(_) => self.edge_routes(ws, key, port)?,
                None if port.is_some() => return Err(Error::NotAnEdge { path: self.path().clone() }),
                None => vec![self.store_route(ws, key)?],
            };
            for route in routes {
                attach(ws, route)?;
            }
            Ok(())
        })
    }

    fn edge_routes(&self, ws: &Workspace, key: Option<&str>, port: Option<&str>) -> Result<Vec<Route>> {
        let edge = self.require_edge(ws)?;
        let parent = self.path().parent();

        let mut routes: Vec<Route> = Vec::new();
        for direction in Direction::BOTH {
            let ports = ws.ports(self.path(), direction)?;
            let wired = wires(edge, direction);
            for (name, schema) in ports {
                if port.is_some_and(|wanted| wanted != name) {
                    continue;
                }
                let wire = wired.and_then(|wired| wired.get(&name)).and_then(Path::from_tree);
                let Some(wire) = wire else {
                    if port.is_some() {
                        return Err(Error::UnwiredPort {
                            edge: self.path().clone(),
                            port: name,
                        });
                    }
                    warn!(edge = %self.path(), port = %name, "skipping unwired port");
                    continue;
                };
                let route = Route {
                    key: key.map(str::to_string).unwrap_or_else(|| name.clone()),
                    schema,
                    source: resolve_relative(&parent, &wire)?,
                };
                if port.is_some() {
                    return Ok(vec![route]);
                }
                // A port on both sides wired to one store is routed once.
                if let Some(existing) = routes.iter().find(|existing| existing.key == route.key) {
                    if existing.source != route.source {
                        return Err(Error::EmitKeyConflict {
                            key: route.key,
                            first: existing.source.clone(),
                            second: route.source,
                        });
                    }
                    continue;
                }
                routes.push(route);
            }
        }

        match port {
            Some(port) => Err(Error::UnknownPort {
                port: port.to_string(),
                edge: self.path().clone(),
                available: port_names(ws, self.path())?,
            }),
            None => Ok(routes),
        }
    }

    fn store_route(&self, ws: &Workspace, key: Option<&str>) -> Result<Route> {
        let key = match (key, self.path().last()) {
            (Some(key), _) => key.to_string(),
            (None, Some(last)) => last.to_string(),
            (None, None) => return Err(Error::InvalidArgument("cannot emit the root without a key".to_string())),
        };
        let schema = path::get(&ws.schema, self.path())
            .cloned()
            .or_else(|| path::get(&ws.state, self.path()).map(|value| ws.types.infer(value)))
            .unwrap_or_else(|| Tree::from("any"));
        Ok(Route {
            key,
            schema,
            source: self.path().clone(),
        })
    }
}

/// Add `route` to the emitter's config, wiring and port schema.
fn attach(ws: &mut Workspace, route: Route) -> Result<()> {
    let emitter = ws.emitter_path();
    let kind = path::get(&ws.state, &emitter)
        .and_then(edge_kind)
        .ok_or_else(|| Error::NotAnEdge { path: emitter.clone() })?;

    let parent = emitter.parent();
    let wire: Path = std::iter::repeat(Segment::Up)
        .take(parent.len())
        .chain(route.source.segments().iter().cloned())
        .collect();
    debug!(key = %route.key, source = %route.source, "routing to emitter");

    if !path::get(&ws.schema, &emitter).is_some_and(Tree::is_mapping) {
        path::set(&mut ws.schema, &emitter, edge_schema(kind, Tree::map(), Tree::map()))?;
    }
    let config = emitter.child(keys::CONFIG).child("emit").child(route.key.as_str());
    let input = emitter.child(keys::INPUTS).child(route.key.as_str());
    let port = emitter.child(reserved::INPUTS).child(route.key.as_str());
    path::set(&mut ws.state, &config, route.schema.clone())?;
    path::set(&mut ws.state, &input, wire.to_tree())?;
    path::set(&mut ws.schema, &port, route.schema)?;
    Ok(())
}
