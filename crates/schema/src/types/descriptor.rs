//! Type descriptors.
//!
//! A [`TypeDescriptor`] is what gets registered under a name. It is partial:
//! it may inherit from another name and only override some aspects. Lookup
//! flattens the inheritance chain into a [`ResolvedType`], which is what
//! completion works with.

use indexmap::IndexMap;

use super::reserved;
use crate::edge::{Direction, EdgeKind};
use crate::error::{Error, Result};
use crate::tree::{Mapping, Tree};

/// Primitive shape tag of a registered type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Any,
    Boolean,
    Integer,
    Float,
    /// Integer or float.
    Number,
    String,
    /// A wire value.
    Path,
    /// A mapping with named fields.
    Record,
    /// An edge record. `None` accepts either kind.
    Edge(Option<EdgeKind>),
}

/// A registered type, possibly partial.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeDescriptor {
    pub kind: Option<Kind>,
    pub inherit: Option<String>,
    pub default: Option<Tree>,
    pub apply: Option<String>,
    pub fields: IndexMap<String, Tree>,
    pub inputs: Option<Tree>,
    pub outputs: Option<Tree>,
}

impl TypeDescriptor {
    pub fn primitive(kind: Kind) -> Self {
        Self { kind: Some(kind), ..Self::default() }
    }

    /// A record type; add fields with [`with_field`](Self::with_field).
    pub fn record() -> Self {
        Self::primitive(Kind::Record)
    }

    /// A type that takes everything from `parent` unless overridden.
    pub fn inheriting(parent: impl Into<String>) -> Self {
        Self { inherit: Some(parent.into()), ..Self::default() }
    }

    pub fn with_default(mut self, value: impl Into<Tree>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_apply(mut self, apply: impl Into<String>) -> Self {
        self.apply = Some(apply.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, schema: impl Into<Tree>) -> Self {
        self.fields.insert(key.into(), schema.into());
        self
    }

    pub fn with_inputs(mut self, inputs: Tree) -> Self {
        self.inputs = Some(inputs);
        self
    }

    pub fn with_outputs(mut self, outputs: Tree) -> Self {
        self.outputs = Some(outputs);
        self
    }

    /// Read a descriptor from its tree form.
    ///
    /// A string is an alias for the named type. A mapping uses the reserved
    /// keys (`_inherit` or `_type`, `_default`, `_apply`, `_inputs`,
    /// `_outputs`) and treats every other key as a record field.
    pub fn from_tree(name: &str, tree: &Tree) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidDescriptor {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if let Some(alias) = tree.as_str() {
            return Ok(Self::inheriting(alias));
        }
        let map = tree.as_mapping().ok_or_else(|| invalid("expected a type name or a mapping"))?;

        let mut descriptor = Self::default();
        for (key, value) in map {
            match key.as_str() {
                reserved::INHERIT | reserved::TYPE => {
                    let parent = value.as_str().ok_or_else(|| invalid("parent type must be a string"))?;
                    descriptor.inherit = Some(parent.to_string());
                }
                reserved::DEFAULT => descriptor.default = Some(value.clone()),
                reserved::APPLY => {
                    let apply = value.as_str().ok_or_else(|| invalid("_apply must name a function"))?;
                    descriptor.apply = Some(apply.to_string());
                }
                reserved::INPUTS => descriptor.inputs = Some(value.clone()),
                reserved::OUTPUTS => descriptor.outputs = Some(value.clone()),
                other if reserved::is_reserved(other) => {
                    return Err(invalid(&format!("unsupported reserved key '{}'", other)));
                }
                field => {
                    descriptor.fields.insert(field.to_string(), value.clone());
                }
            }
        }
        if descriptor.inherit.is_none() {
            descriptor.kind = Some(Kind::Record);
        }
        Ok(descriptor)
    }
}

/// Structure a resolved type imposes on values.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Any,
    Boolean,
    Integer,
    Float,
    Number,
    String,
    Path,
    Edge(Option<EdgeKind>),
    /// Field name to field schema.
    Record(IndexMap<String, Tree>),
    Maybe(Box<ResolvedType>),
    List(Box<ResolvedType>),
    Map(Box<ResolvedType>),
    /// Nested mappings whose leaves have the inner type.
    Tree(Box<ResolvedType>),
    Union(Vec<ResolvedType>),
}

impl Shape {
    pub(crate) fn from_kind(kind: Kind) -> Self {
        match kind {
            Kind::Any => Shape::Any,
            Kind::Boolean => Shape::Boolean,
            Kind::Integer => Shape::Integer,
            Kind::Float => Shape::Float,
            Kind::Number => Shape::Number,
            Kind::String => Shape::String,
            Kind::Path => Shape::Path,
            Kind::Record => Shape::Record(IndexMap::new()),
            Kind::Edge(kind) => Shape::Edge(kind),
        }
    }
}

/// A type with its inheritance chain flattened.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedType {
    /// Canonical name, as looked up.
    pub name: String,
    pub shape: Shape,
    pub default: Option<Tree>,
    pub apply: Option<String>,
    pub inputs: Option<Tree>,
    pub outputs: Option<Tree>,
    /// This type followed by every ancestor, nearest first.
    pub lineage: Vec<String>,
}

impl ResolvedType {
    pub(crate) fn new(name: impl Into<String>, shape: Shape) -> Self {
        let name = name.into();
        Self {
            lineage: vec![name.clone()],
            name,
            shape,
            default: None,
            apply: None,
            inputs: None,
            outputs: None,
        }
    }

    pub fn is_edge(&self) -> bool {
        matches!(self.shape, Shape::Edge(_))
    }

    /// Declared port schema of one side of an edge type.
    pub fn ports(&self, direction: Direction) -> Option<&Mapping> {
        match direction {
            Direction::Inputs => self.inputs.as_ref(),
            Direction::Outputs => self.outputs.as_ref(),
        }
        .and_then(Tree::as_mapping)
    }

    /// Whether this type is `name` or descends from it.
    pub fn descends_from(&self, name: &str) -> bool {
        self.lineage.iter().any(|ancestor| ancestor == name)
    }

    /// Whether a value of this type may be stored where `other` is declared,
    /// or the other way round.
    pub fn compatible_with(&self, other: &ResolvedType) -> bool {
        if self.name == other.name || self.descends_from(&other.name) || other.descends_from(&self.name) {
            return true;
        }
        match (&self.shape, &other.shape) {
            (Shape::Any, _) | (_, Shape::Any) => true,
            (Shape::Number, Shape::Integer | Shape::Float | Shape::Number)
            | (Shape::Integer | Shape::Float, Shape::Number) => true,
            (Shape::Edge(None), Shape::Edge(_)) | (Shape::Edge(_), Shape::Edge(None)) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_from_alias() {
        let descriptor = TypeDescriptor::from_tree("concentration", &Tree::from("float")).unwrap();
        assert_eq!(descriptor, TypeDescriptor::inheriting("float"));
    }

    #[test]
    fn test_descriptor_from_mapping() {
        let tree = Tree::from(json!({
            "_inherit": "float",
            "_default": 2.5,
            "_apply": "accumulate"
        }));
        let descriptor = TypeDescriptor::from_tree("mass", &tree).unwrap();
        assert_eq!(descriptor.inherit.as_deref(), Some("float"));
        assert_eq!(descriptor.default, Some(Tree::from(2.5)));
        assert_eq!(descriptor.apply.as_deref(), Some("accumulate"));
        assert!(descriptor.kind.is_none());
    }

    #[test]
    fn test_descriptor_fields_make_a_record() {
        let tree = Tree::from(json!({"x": "float", "y": "float"}));
        let descriptor = TypeDescriptor::from_tree("point", &tree).unwrap();
        assert_eq!(descriptor.kind, Some(Kind::Record));
        assert_eq!(descriptor.fields.keys().collect::<Vec<_>>(), vec!["x", "y"]);
    }

    #[test]
    fn test_descriptor_rejects_unknown_reserved_key() {
        let tree = Tree::from(json!({"_bogus": 1}));
        assert!(matches!(
            TypeDescriptor::from_tree("t", &tree),
            Err(Error::InvalidDescriptor { .. })
        ));
    }

    #[test]
    fn test_compatibility() {
        let float = ResolvedType::new("float", Shape::Float);
        let number = ResolvedType::new("number", Shape::Number);
        let string = ResolvedType::new("string", Shape::String);
        let mut interval = ResolvedType::new("interval", Shape::Float);
        interval.lineage.push("float".into());

        assert!(float.compatible_with(&number));
        assert!(interval.compatible_with(&float));
        assert!(float.compatible_with(&interval));
        assert!(!float.compatible_with(&string));
    }
}
