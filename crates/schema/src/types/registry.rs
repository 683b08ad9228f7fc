//! The type registry.
//!
//! A [`TypeRegistry`] maps type names to [`TypeDescriptor`]s and resolves
//! names (plain or parametric) to [`ResolvedType`]s. It is an explicit value:
//! callers construct one, register their types, and share it (typically
//! behind an `Arc`) with whatever needs to complete trees.
//!
//! # Built-in types
//!
//! | Name | Shape | Default |
//! |------|-------|---------|
//! | `any` | anything | none |
//! | `boolean` | bool | `false` |
//! | `integer` | integer | `0` |
//! | `float` | float (integers are widened) | `0.0` |
//! | `number` | integer or float | `0.0` |
//! | `string` | string | `""` |
//! | `path` | wire | none |
//! | `interval` | inherits `float` | `1.0` |
//! | `edge`, `process`, `step` | edge record | none |
//!
//! # Inference
//!
//! Undeclared values are typed by a ranked list of [`ShapeMatcher`]s. The
//! default ranking types a mapping as a container of separately inferred
//! children, so `{"a": 1.0, "b": 2.0}` becomes `{"a": "float", "b": "float"}`.
//! Prepend [`HomogeneousMapMatcher`](super::HomogeneousMapMatcher) with
//! [`TypeRegistry::prepend_matcher`] to infer `map[float]` instead.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::descriptor::{Kind, ResolvedType, Shape, TypeDescriptor};
use super::expr::TypeExpr;
use super::infer::{ContainerMatcher, EdgeMatcher, ScalarMatcher, SequenceMatcher, ShapeMatcher};
use super::reserved;
use crate::edge::EdgeKind;
use crate::error::{suggest, Error, Result};
use crate::tree::{Scalar, Tree};

/// Whether a schema fragment declares a type, as opposed to being a
/// container of named children.
pub fn is_declaration(schema: &Tree) -> bool {
    match schema {
        Tree::Scalar(Scalar::Str(_)) => true,
        Tree::Mapping(map) => map.contains_key(reserved::TYPE),
        _ => false,
    }
}

/// Registry of named types plus the inference ranking.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: IndexMap<String, TypeDescriptor>,
    matchers: Vec<Arc<dyn ShapeMatcher>>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// A registry holding the built-in types and the default inference
    /// ranking.
    pub fn new() -> Self {
        let mut registry = Self {
            types: IndexMap::new(),
            matchers: vec![
                Arc::new(EdgeMatcher),
                Arc::new(ScalarMatcher),
                Arc::new(SequenceMatcher),
                Arc::new(ContainerMatcher),
            ],
        };
        registry.register("any", TypeDescriptor::primitive(Kind::Any));
        registry.register("boolean", TypeDescriptor::primitive(Kind::Boolean).with_default(false));
        registry.register("integer", TypeDescriptor::primitive(Kind::Integer).with_default(0));
        registry.register("float", TypeDescriptor::primitive(Kind::Float).with_default(0.0));
        registry.register("number", TypeDescriptor::primitive(Kind::Number).with_default(0.0));
        registry.register("string", TypeDescriptor::primitive(Kind::String).with_default(""));
        registry.register("path", TypeDescriptor::primitive(Kind::Path));
        registry.register("interval", TypeDescriptor::inheriting("float").with_default(1.0));
        registry.register("edge", TypeDescriptor::primitive(Kind::Edge(None)));
        registry.register("process", TypeDescriptor::primitive(Kind::Edge(Some(EdgeKind::Process))));
        registry.register("step", TypeDescriptor::primitive(Kind::Edge(Some(EdgeKind::Step))));
        registry
    }

    /// Add or replace a named type.
    pub fn register(&mut self, name: impl Into<String>, descriptor: TypeDescriptor) {
        let name = name.into();
        debug!(name = %name, "registering type");
        self.types.insert(name, descriptor);
    }

    /// Register a type from its tree form (see [`TypeDescriptor::from_tree`]).
    pub fn register_tree(&mut self, name: impl Into<String>, tree: &Tree) -> Result<()> {
        let name = name.into();
        let descriptor = TypeDescriptor::from_tree(&name, tree)?;
        self.register(name, descriptor);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn descriptor(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Resolve a type name, following `_inherit` chains and expanding
    /// combinators.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownType`] if the name (or any name it refers to) is not
    ///   registered or does not parse.
    /// - [`Error::RecursiveType`] if an inheritance chain loops.
    pub fn lookup(&self, name: &str) -> Result<ResolvedType> {
        let expr = TypeExpr::parse(name).ok_or_else(|| self.unknown(name))?;
        self.resolve_expr(&expr, &mut Vec::new())
    }

    fn resolve_expr(&self, expr: &TypeExpr, chain: &mut Vec<String>) -> Result<ResolvedType> {
        let (shape, default) = match expr {
            TypeExpr::Named(name) => return self.resolve_named(name, chain),
            TypeExpr::Maybe(inner) => (Shape::Maybe(Box::new(self.resolve_expr(inner, chain)?)), Some(Tree::null())),
            TypeExpr::List(inner) => (
                Shape::List(Box::new(self.resolve_expr(inner, chain)?)),
                Some(Tree::Sequence(Vec::new())),
            ),
            TypeExpr::Map(inner) => (Shape::Map(Box::new(self.resolve_expr(inner, chain)?)), Some(Tree::map())),
            TypeExpr::Tree(inner) => (Shape::Tree(Box::new(self.resolve_expr(inner, chain)?)), Some(Tree::map())),
            TypeExpr::Union(options) => {
                let options = options
                    .iter()
                    .map(|option| self.resolve_expr(option, chain))
                    .collect::<Result<Vec<_>>>()?;
                (Shape::Union(options), None)
            }
        };
        let mut resolved = ResolvedType::new(expr.to_string(), shape);
        resolved.default = default;
        Ok(resolved)
    }

    fn resolve_named(&self, name: &str, chain: &mut Vec<String>) -> Result<ResolvedType> {
        if chain.iter().any(|seen| seen == name) {
            let mut cycle = chain.clone();
            cycle.push(name.to_string());
            return Err(Error::RecursiveType { chain: cycle });
        }
        let descriptor = self.types.get(name).ok_or_else(|| self.unknown(name))?;

        chain.push(name.to_string());
        let parent = match &descriptor.inherit {
            Some(parent) => {
                let expr = TypeExpr::parse(parent).ok_or_else(|| self.unknown(parent))?;
                Some(self.resolve_expr(&expr, chain)?)
            }
            None => None,
        };
        chain.pop();

        Ok(flatten(name, descriptor, parent))
    }

    /// Resolve a schema fragment.
    ///
    /// Returns `None` for containers (mappings without `_type`). For a
    /// mapping with `_type`, the remaining reserved keys override the
    /// registered type and plain keys extend a record's fields.
    pub fn resolve_schema(&self, schema: &Tree) -> Result<Option<ResolvedType>> {
        match schema {
            Tree::Scalar(Scalar::Str(name)) => self.lookup(name).map(Some),
            Tree::Mapping(map) => {
                let Some(declared) = map.get(reserved::TYPE) else {
                    return Ok(None);
                };
                let name = declared.as_str().ok_or_else(|| Error::InvalidDescriptor {
                    name: declared.to_string(),
                    reason: "_type must be a type name".to_string(),
                })?;
                let mut resolved = self.lookup(name)?;
                for (key, value) in map {
                    match key.as_str() {
                        reserved::DEFAULT => resolved.default = Some(value.clone()),
                        reserved::APPLY => resolved.apply = value.as_str().map(String::from),
                        reserved::INPUTS => resolved.inputs = Some(value.clone()),
                        reserved::OUTPUTS => resolved.outputs = Some(value.clone()),
                        other if reserved::is_reserved(other) => {}
                        field => {
                            if let Shape::Record(fields) = &mut resolved.shape {
                                fields.insert(field.to_string(), value.clone());
                            } else {
                                trace!(field, type_name = %resolved.name, "ignoring field on non-record type");
                            }
                        }
                    }
                }
                Ok(Some(resolved))
            }
            other => Err(Error::InvalidDescriptor {
                name: other.to_string(),
                reason: "expected a type name or a mapping".to_string(),
            }),
        }
    }

    /// Infer a schema for a value with no declared type. Falls back to `any`
    /// when no matcher recognizes the value.
    pub fn infer(&self, value: &Tree) -> Tree {
        for matcher in &self.matchers {
            if let Some(schema) = matcher.infer(value) {
                trace!(matcher = matcher.name(), schema = %schema, "inferred type");
                return schema;
            }
        }
        Tree::from("any")
    }

    /// Install a matcher ahead of the existing ranking.
    pub fn prepend_matcher(&mut self, matcher: impl ShapeMatcher + 'static) {
        self.matchers.insert(0, Arc::new(matcher));
    }

    /// Replace the whole inference ranking.
    pub fn set_matchers(&mut self, matchers: Vec<Arc<dyn ShapeMatcher>>) {
        self.matchers = matchers;
    }

    fn unknown(&self, name: &str) -> Error {
        Error::UnknownType {
            name: name.to_string(),
            suggestions: suggest(name, self.names()),
        }
    }
}

fn flatten(name: &str, descriptor: &TypeDescriptor, parent: Option<ResolvedType>) -> ResolvedType {
    let mut resolved = match parent {
        Some(mut parent) => {
            parent.name = name.to_string();
            parent.lineage.insert(0, name.to_string());
            parent
        }
        None => ResolvedType::new(name, Shape::Any),
    };

    if let Some(kind) = descriptor.kind {
        let keeps_fields = kind == Kind::Record && matches!(resolved.shape, Shape::Record(_));
        if !keeps_fields {
            resolved.shape = Shape::from_kind(kind);
        }
    }
    if !descriptor.fields.is_empty() {
        match &mut resolved.shape {
            Shape::Record(fields) => fields.extend(descriptor.fields.clone()),
            shape => *shape = Shape::Record(descriptor.fields.clone()),
        }
    }
    if descriptor.default.is_some() {
        resolved.default = descriptor.default.clone();
    }
    if descriptor.apply.is_some() {
        resolved.apply = descriptor.apply.clone();
    }
    if descriptor.inputs.is_some() {
        resolved.inputs = descriptor.inputs.clone();
    }
    if descriptor.outputs.is_some() {
        resolved.outputs = descriptor.outputs.clone();
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::infer::HomogeneousMapMatcher;
    use serde_json::json;

    #[test]
    fn test_builtin_defaults() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.lookup("float").unwrap().default, Some(Tree::from(0.0)));
        assert_eq!(registry.lookup("boolean").unwrap().default, Some(Tree::from(false)));
        assert_eq!(registry.lookup("any").unwrap().default, None);
    }

    #[test]
    fn test_interval_inherits_float() {
        let interval = TypeRegistry::new().lookup("interval").unwrap();
        assert_eq!(interval.shape, Shape::Float);
        assert_eq!(interval.default, Some(Tree::from(1.0)));
        assert_eq!(interval.lineage, vec!["interval", "float"]);
    }

    #[test]
    fn test_combinators_resolve_lazily() {
        let registry = TypeRegistry::new();
        let resolved = registry.lookup("map[list[float]]").unwrap();
        assert_eq!(resolved.name, "map[list[float]]");
        assert_eq!(resolved.default, Some(Tree::map()));
        match resolved.shape {
            Shape::Map(inner) => assert!(matches!(inner.shape, Shape::List(_))),
            other => panic!("unexpected shape: {other:?}"),
        }
        assert_eq!(registry.lookup("maybe[string]").unwrap().default, Some(Tree::null()));
    }

    #[test]
    fn test_unknown_type_suggests_alternatives() {
        let err = TypeRegistry::new().lookup("flaot").unwrap_err();
        match err {
            Error::UnknownType { name, suggestions } => {
                assert_eq!(name, "flaot");
                assert_eq!(suggestions, vec!["float"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(TypeRegistry::new().lookup("list[flaot]"), Err(Error::UnknownType { .. })));
        assert!(matches!(TypeRegistry::new().lookup("list[float"), Err(Error::UnknownType { .. })));
    }

    #[test]
    fn test_deeply_nested_name_is_unknown() {
        let name = format!("{}float{}", "maybe[".repeat(200_000), "]".repeat(200_000));
        let schema: Tree = [("a", Tree::from(name))].into_iter().collect();
        let err = TypeRegistry::new().complete(&schema, &Tree::map()).unwrap_err();
        assert!(matches!(err, Error::UnknownType { .. }), "{err}");
    }

    #[test]
    fn test_recursive_inheritance_is_rejected() {
        let mut registry = TypeRegistry::new();
        registry.register("a", TypeDescriptor::inheriting("b"));
        registry.register("b", TypeDescriptor::inheriting("a"));
        match registry.lookup("a").unwrap_err() {
            Error::RecursiveType { chain } => assert_eq!(chain, vec!["a", "b", "a"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_record_fields_inherit_and_extend() {
        let mut registry = TypeRegistry::new();
        registry
            .register_tree("point", &Tree::from(json!({"x": "float", "y": "float"})))
            .unwrap();
        registry
            .register_tree("point3", &Tree::from(json!({"_inherit": "point", "z": "float"})))
            .unwrap();
        let resolved = registry.lookup("point3").unwrap();
        match &resolved.shape {
            Shape::Record(fields) => assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["x", "y", "z"]),
            other => panic!("unexpected shape: {other:?}"),
        }
        assert!(resolved.descends_from("point"));
    }

    #[test]
    fn test_resolve_schema_applies_overrides() {
        let registry = TypeRegistry::new();
        let schema = Tree::from(json!({
            "_type": "process",
            "_inputs": {"level": "float"},
            "_outputs": {"level": "float"}
        }));
        let resolved = registry.resolve_schema(&schema).unwrap().unwrap();
        assert!(resolved.is_edge());
        assert_eq!(resolved.inputs, Some(Tree::from(json!({"level": "float"}))));

        let overridden = registry
            .resolve_schema(&Tree::from(json!({"_type": "float", "_default": 3.0})))
            .unwrap()
            .unwrap();
        assert_eq!(overridden.default, Some(Tree::from(3.0)));

        assert!(registry.resolve_schema(&Tree::from(json!({"a": "float"}))).unwrap().is_none());
    }

    #[test]
    fn test_inference_ranking_is_pluggable() {
        let mut registry = TypeRegistry::new();
        let value = Tree::from(json!({"a": 1.0, "b": 2.0}));
        assert_eq!(registry.infer(&value), Tree::map());
        registry.prepend_matcher(HomogeneousMapMatcher);
        assert_eq!(registry.infer(&value), Tree::from("map[float]"));
    }

    #[test]
    fn test_is_declaration() {
        assert!(is_declaration(&Tree::from("float")));
        assert!(is_declaration(&Tree::from(json!({"_type": "float"}))));
        assert!(!is_declaration(&Tree::from(json!({"a": "float"}))));
    }
}
