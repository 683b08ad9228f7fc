//! Schema completion.
//!
//! [`TypeRegistry::complete`] takes a schema tree and a state tree and
//! returns both fully resolved:
//!
//! 1. **Edge discovery**: edge records in state without a schema entry get
//!    `{_type: <kind>}`.
//! 2. **Wire projection**: each wired port with a declared type stamps that
//!    type onto the store it points at (if the store has no type yet) or is
//!    checked against the store's declared type.
//! 3. **Recursive completion**: declared types fill defaults and validate
//!    values, undeclared values get an inferred type, containers recurse
//!    with schema keys first and state-only keys after.
//!
//! Shape mismatches do not stop the walk. They are collected and returned
//! together as [`Error::SchemaMismatch`]. Unknown types and wires that
//! escape the root are fatal immediately.
//!
//! Completing an already completed pair returns it unchanged.

use indexmap::IndexSet;
use tracing::{debug, trace};

use crate::edge::{self, edge_kind, keys, Direction, EdgeKind};
use crate::error::{Error, Mismatch, Mismatches, Result};
use crate::path::{self, resolve_relative, Path};
use crate::tree::{Mapping, Scalar, Tree};
use crate::types::{is_declaration, reserved, ResolvedType, Shape, TypeRegistry};

impl TypeRegistry {
    /// Complete `schema` against `state`.
    ///
    /// ```
    /// # use bigraph_schema::{Tree, TypeRegistry};
    /// # use serde_json::json;
    /// let registry = TypeRegistry::new();
    /// let (schema, state) = registry
    ///     .complete(&Tree::from(json!({"mass": "float"})), &Tree::from(json!({"count": 3})))
    ///     .unwrap();
    /// assert_eq!(schema, Tree::from(json!({"mass": "float", "count": "integer"})));
    /// assert_eq!(state, Tree::from(json!({"count": 3, "mass": 0.0})));
    /// ```
    pub fn complete(&self, schema: &Tree, state: &Tree) -> Result<(Tree, Tree)> {
        let mut schema = schema.clone();
        if let (Some(schema_map), Some(state_map)) = (schema.as_mapping_mut(), state.as_mapping()) {
            discover_edges(schema_map, state_map);
        }

        let mut pass = Completion {
            registry: self,
            mismatches: Vec::new(),
        };
        pass.project_wires(&mut schema, state)?;
        let (schema, state) = pass.value(Some(&schema), Some(state), &Path::root())?;

        if !pass.mismatches.is_empty() {
            debug!(count = pass.mismatches.len(), "completion found mismatches");
            return Err(Error::SchemaMismatch(Mismatches(pass.mismatches)));
        }
        Ok((schema.unwrap_or_default(), state.unwrap_or_default()))
    }
}

fn discover_edges(schema: &mut Mapping, state: &Mapping) {
    for (key, value) in state {
        if reserved::is_reserved(key) {
            continue;
        }
        if let Some(kind) = edge_kind(value) {
            if !schema.contains_key(key) {
                trace!(key = %key, kind = %kind, "discovered edge");
                let declared: Tree = [(reserved::TYPE, Tree::from(kind.as_str()))].into_iter().collect();
                schema.insert(key.clone(), declared);
            }
            continue;
        }
        let Some(child_state) = value.as_mapping() else {
            continue;
        };
        match schema.get_mut(key) {
            Some(child) => {
                if let Some(container) = child.as_mapping_mut().filter(|m| !m.contains_key(reserved::TYPE)) {
                    discover_edges(container, child_state);
                }
            }
            None => {
                let mut container = Mapping::new();
                discover_edges(&mut container, child_state);
                if !container.is_empty() {
                    schema.insert(key.clone(), Tree::Mapping(container));
                }
            }
        }
    }
}

/// Whether `value` fits `resolved` without looking deeper than needed to
/// pick a union branch.
fn matches(resolved: &ResolvedType, value: &Tree) -> bool {
    match (&resolved.shape, value) {
        (Shape::Any, _) => true,
        (Shape::Boolean, Tree::Scalar(Scalar::Bool(_))) => true,
        (Shape::Integer, Tree::Scalar(Scalar::Int(_))) => true,
        (Shape::Float | Shape::Number, Tree::Scalar(Scalar::Int(_) | Scalar::Float(_))) => true,
        (Shape::String, Tree::Scalar(Scalar::Str(_))) => true,
        (Shape::Path, _) => Path::from_tree(value).is_some(),
        (Shape::Edge(expected), _) => match edge_kind(value) {
            Some(found) => expected.map_or(true, |kind| kind == found),
            None => false,
        },
        (Shape::Record(_) | Shape::Tree(_), Tree::Mapping(_)) => true,
        (Shape::Maybe(inner), _) => value.is_null() || matches(inner, value),
        (Shape::List(inner), Tree::Sequence(items)) => items.iter().all(|item| matches(inner, item)),
        (Shape::Map(inner), Tree::Mapping(map)) => map.values().all(|item| matches(inner, item)),
        (Shape::Union(options), _) => options.iter().any(|option| matches(option, value)),
        _ => false,
    }
}

struct Completion<'r> {
    registry: &'r TypeRegistry,
    mismatches: Vec<Mismatch>,
}

impl Completion<'_> {
    fn mismatch(&mut self, at: &Path, expected: impl Into<String>, found: impl Into<String>) {
        let mismatch = Mismatch {
            path: at.clone(),
            expected: expected.into(),
            found: found.into(),
        };
        debug!(path = %mismatch.path, expected = %mismatch.expected, found = %mismatch.found, "schema mismatch");
        self.mismatches.push(mismatch);
    }

    fn project_wires(&mut self, schema: &mut Tree, state: &Tree) -> Result<()> {
        for (edge_path, record) in edge::collect_edges(state) {
            let Some(declared) = path::get(schema, &edge_path) else {
                continue;
            };
            let Ok(Some(resolved)) = self.registry.resolve_schema(declared) else {
                continue;
            };
            for direction in Direction::BOTH {
                let (Some(ports), Some(wires)) = (resolved.ports(direction), edge::wires(record, direction)) else {
                    continue;
                };
                for (port, wire) in wires {
                    let (Some(port_schema), Some(wire)) = (ports.get(port), Path::from_tree(wire)) else {
                        continue;
                    };
                    let target = resolve_relative(&edge_path.parent(), &wire)?;
                    trace!(edge = %edge_path, port = %port, target = %target, "projecting port type");
                    self.project(schema, &target, port_schema)?;
                }
            }
        }
        Ok(())
    }

    fn project(&mut self, schema: &mut Tree, target: &Path, port_schema: &Tree) -> Result<()> {
        for len in 0..=target.len() {
            let prefix = target.prefix(len);
            match path::get(schema, &prefix) {
                Some(fragment) if is_declaration(fragment) => {
                    // Stores inside a typed value are checked by that type.
                    if len == target.len() {
                        self.check_projection(fragment, port_schema, target)?;
                    }
                    return Ok(());
                }
                Some(Tree::Mapping(_)) => {}
                Some(_) => return Ok(()),
                None => break,
            }
        }

        let Some(existing) = path::get(schema, target).and_then(Tree::as_mapping).cloned() else {
            return path::set(schema, target, port_schema.clone());
        };
        if let Some(port_fields) = port_schema.as_mapping().filter(|m| !m.contains_key(reserved::TYPE)) {
            let mut merged = existing;
            for (key, field) in port_fields {
                merged.entry(key.clone()).or_insert_with(|| field.clone());
            }
            return path::set(schema, target, Tree::Mapping(merged));
        }
        if existing.is_empty() {
            return path::set(schema, target, port_schema.clone());
        }
        let Some(port_type) = self.registry.resolve_schema(port_schema)? else {
            return Ok(());
        };
        if !matches!(port_type.shape, Shape::Any | Shape::Record(_) | Shape::Map(_) | Shape::Tree(_)) {
            self.mismatch(target, port_type.name, "a container of stores");
        }
        Ok(())
    }

    fn check_projection(&mut self, declared: &Tree, port_schema: &Tree, target: &Path) -> Result<()> {
        let (Ok(Some(existing)), Some(port_type)) = (
            self.registry.resolve_schema(declared),
            self.registry.resolve_schema(port_schema)?,
        ) else {
            return Ok(());
        };
        if !port_type.compatible_with(&existing) {
            self.mismatch(target, port_type.name, format!("store declared as {}", existing.name));
        }
        Ok(())
    }

    fn value(&mut self, schema: Option<&Tree>, state: Option<&Tree>, at: &Path) -> Result<(Option<Tree>, Option<Tree>)> {
        let Some(schema) = schema else {
            let Some(value) = state else {
                return Ok((None, None));
            };
            let inferred = self.registry.infer(value);
            trace!(path = %at, schema = %inferred, "inferred schema");
            return self.value(Some(&inferred), state, at);
        };

        if let Tree::Mapping(container) = schema {
            if !container.contains_key(reserved::TYPE) {
                return self.container(container, state, at);
            }
        }

        match self.registry.resolve_schema(schema) {
            Ok(Some(resolved)) => {
                let state = match state {
                    Some(value) => Some(self.check(&resolved, value, at)?),
                    None => self.fill(&resolved, at)?,
                };
                Ok((Some(schema.clone()), state))
            }
            Ok(None) => Ok((Some(schema.clone()), state.cloned())),
            Err(Error::InvalidDescriptor { reason, .. }) => {
                self.mismatch(at, "a type declaration", format!("{} ({})", schema.describe(), reason));
                Ok((Some(schema.clone()), state.cloned()))
            }
            Err(err) => Err(err),
        }
    }

    fn container(&mut self, schema: &Mapping, state: Option<&Tree>, at: &Path) -> Result<(Option<Tree>, Option<Tree>)> {
        let state_map = match state {
            None => None,
            Some(Tree::Mapping(map)) => Some(map),
            Some(other) => {
                self.mismatch(at, "a mapping", other.describe());
                return Ok((Some(Tree::Mapping(schema.clone())), Some(other.clone())));
            }
        };

        let keys: IndexSet<&String> = schema
            .keys()
            .chain(state_map.into_iter().flat_map(|map| map.keys()))
            .filter(|key| !reserved::is_reserved(key))
            .collect();

        let mut schema_out = schema.clone();
        let mut state_out = state_map.cloned().unwrap_or_default();
        for key in keys {
            let child_at = at.child(key.as_str());
            let child_state = state_map.and_then(|map| map.get(key));
            let (child_schema, child_state) = self.value(schema.get(key), child_state, &child_at)?;
            if let Some(child_schema) = child_schema {
                schema_out.insert(key.clone(), child_schema);
            }
            if let Some(child_state) = child_state {
                state_out.insert(key.clone(), child_state);
            }
        }

        let state_out = (state_map.is_some() || !state_out.is_empty()).then_some(Tree::Mapping(state_out));
        Ok((Some(Tree::Mapping(schema_out)), state_out))
    }

    /// State for a declared type with no value.
    fn fill(&mut self, resolved: &ResolvedType, at: &Path) -> Result<Option<Tree>> {
        match (&resolved.default, &resolved.shape) {
            (Some(default), _) => self.check(resolved, default, at).map(Some),
            (None, Shape::Record(fields)) => Ok(self.container(fields, None, at)?.1),
            (None, _) => Ok(None),
        }
    }

    fn check(&mut self, resolved: &ResolvedType, value: &Tree, at: &Path) -> Result<Tree> {
        let checked = match (&resolved.shape, value) {
            (Shape::Any, _)
            | (Shape::Boolean, Tree::Scalar(Scalar::Bool(_)))
            | (Shape::Integer, Tree::Scalar(Scalar::Int(_)))
            | (Shape::Float, Tree::Scalar(Scalar::Float(_)))
            | (Shape::Number, Tree::Scalar(Scalar::Int(_) | Scalar::Float(_)))
            | (Shape::String, Tree::Scalar(Scalar::Str(_)))
            | (Shape::Maybe(_), Tree::Scalar(Scalar::Null)) => Some(value.clone()),
            (Shape::Float, Tree::Scalar(Scalar::Int(int))) => Some(Tree::from(*int as f64)),
            (Shape::Path, _) => Path::from_tree(value).map(|_| value.clone()),
            (Shape::Edge(expected), _) => return self.check_edge(resolved, *expected, value, at),
            (Shape::Record(fields), Tree::Mapping(_)) => self.container(fields, Some(value), at)?.1,
            (Shape::Maybe(inner), _) => return self.check(inner, value, at),
            (Shape::List(inner), Tree::Sequence(items)) => {
                let mut checked = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    checked.push(self.check(inner, item, &at.child(index))?);
                }
                Some(Tree::Sequence(checked))
            }
            (Shape::Map(inner), Tree::Mapping(map)) => {
                let mut checked = Mapping::new();
                for (key, item) in map {
                    checked.insert(key.clone(), self.check(inner, item, &at.child(key.as_str()))?);
                }
                Some(Tree::Mapping(checked))
            }
            (Shape::Tree(inner), Tree::Mapping(map)) => {
                let mut checked = Mapping::new();
                for (key, item) in map {
                    let item_at = at.child(key.as_str());
                    let item = if matches(inner, item) {
                        self.check(inner, item, &item_at)?
                    } else if item.is_mapping() {
                        self.check(resolved, item, &item_at)?
                    } else {
                        self.mismatch(&item_at, inner.name.as_str(), item.describe());
                        item.clone()
                    };
                    checked.insert(key.clone(), item);
                }
                Some(Tree::Mapping(checked))
            }
            (Shape::Union(options), _) => match options.iter().find(|option| matches(option, value)) {
                Some(option) => return self.check(option, value, at),
                None => None,
            },
            _ => None,
        };

        match checked {
            Some(checked) => Ok(checked),
            None => {
                self.mismatch(at, resolved.name.as_str(), value.describe());
                Ok(value.clone())
            }
        }
    }

    fn check_edge(
        &mut self,
        resolved: &ResolvedType,
        expected: Option<EdgeKind>,
        value: &Tree,
        at: &Path,
    ) -> Result<Tree> {
        let (Some(found), Some(record)) = (edge_kind(value), value.as_mapping()) else {
            self.mismatch(at, resolved.name.as_str(), value.describe());
            return Ok(value.clone());
        };
        if expected.is_some_and(|kind| kind != found) {
            self.mismatch(at, resolved.name.as_str(), format!("{} edge", found));
            return Ok(value.clone());
        }
        let mut record = record.clone();

        match record.get(keys::ADDRESS) {
            Some(Tree::Scalar(Scalar::Str(_))) => {}
            Some(other) => self.mismatch(&at.child(keys::ADDRESS), "string", other.describe()),
            None => self.mismatch(&at.child(keys::ADDRESS), "string", "nothing"),
        }

        for key in [keys::CONFIG, keys::INPUTS, keys::OUTPUTS] {
            match record.get(key) {
                None => {
                    record.insert(key.to_string(), Tree::map());
                }
                Some(Tree::Mapping(_)) => {}
                Some(other) => self.mismatch(&at.child(key), "a mapping", other.describe()),
            }
        }

        for direction in Direction::BOTH {
            let Some(wires) = record.get(direction.state_key()).and_then(Tree::as_mapping) else {
                continue;
            };
            let declared = resolved.ports(direction);
            for (port, wire) in wires {
                let wire_at = at.child(direction.state_key()).child(port.as_str());
                if Path::from_tree(wire).is_none() {
                    self.mismatch(&wire_at, "path", wire.describe());
                }
                if let Some(ports) = declared.filter(|ports| !ports.contains_key(port)) {
                    let names: Vec<&str> = ports.keys().map(String::as_str).collect();
                    self.mismatch(&wire_at, format!("a declared port ({})", names.join(", ")), "undeclared port");
                }
            }
        }

        if found == EdgeKind::Process {
            match record.get(keys::INTERVAL).cloned() {
                None => {
                    let interval = self
                        .registry
                        .lookup("interval")
                        .ok()
                        .and_then(|interval| interval.default)
                        .unwrap_or_else(|| Tree::from(1.0));
                    record.insert(keys::INTERVAL.to_string(), interval);
                }
                Some(Tree::Scalar(Scalar::Int(int))) => {
                    record.insert(keys::INTERVAL.to_string(), Tree::from(int as f64));
                }
                Some(Tree::Scalar(Scalar::Float(_))) => {}
                Some(other) => self.mismatch(&at.child(keys::INTERVAL), "interval", other.describe()),
            }
        }

        Ok(Tree::Mapping(record))
    }
}
