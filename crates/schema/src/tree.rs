//! Nested tree values.
//!
//! Both the schema tree and the state tree are [`Tree`] values: a scalar, an
//! ordered sequence, or an ordered mapping from string keys to subtrees.
//! Mappings preserve insertion order so documents round-trip with stable key
//! order.
//!
//! Trees serialize to plain JSON/YAML shape (no tagging), and convert to and
//! from [`serde_json::Value`].

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered mapping used for every mapping node.
pub type Mapping = IndexMap<String, Tree>;

/// A primitive leaf value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// A node in a schema or state tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tree {
    Scalar(Scalar),
    Sequence(Vec<Tree>),
    Mapping(Mapping),
}

impl Tree {
    /// An empty mapping.
    pub fn map() -> Self {
        Tree::Mapping(Mapping::new())
    }

    /// The null scalar.
    pub fn null() -> Self {
        Tree::Scalar(Scalar::Null)
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, Tree::Mapping(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Tree::Scalar(Scalar::Null))
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Tree::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Tree::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Tree]> {
        match self {
            Tree::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tree::Scalar(Scalar::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Tree::Scalar(Scalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Tree::Scalar(Scalar::Int(i)) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view: floats as-is, integers widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Tree::Scalar(Scalar::Float(f)) => Some(*f),
            Tree::Scalar(Scalar::Int(i)) => Some(*i as f64),
            _ => None,
        }
    }

    /// Look up a direct child of a mapping.
    pub fn get_key(&self, key: &str) -> Option<&Tree> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Short description of the value's shape, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Tree::Scalar(Scalar::Null) => "null",
            Tree::Scalar(Scalar::Bool(_)) => "boolean",
            Tree::Scalar(Scalar::Int(_)) => "integer",
            Tree::Scalar(Scalar::Float(_)) => "float",
            Tree::Scalar(Scalar::Str(_)) => "string",
            Tree::Sequence(_) => "sequence",
            Tree::Mapping(_) => "mapping",
        }
    }

    /// Describe the value for an error message: the shape, plus the value
    /// itself when it is a scalar.
    pub fn describe(&self) -> String {
        match self {
            Tree::Scalar(Scalar::Null) => "null".to_string(),
            Tree::Scalar(_) => format!("{} {}", self.kind_name(), self),
            other => other.kind_name().to_string(),
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Tree::map()
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::Value::from(self.clone());
        write!(f, "{}", json)
    }
}

impl From<bool> for Tree {
    fn from(value: bool) -> Self {
        Tree::Scalar(Scalar::Bool(value))
    }
}

impl From<i64> for Tree {
    fn from(value: i64) -> Self {
        Tree::Scalar(Scalar::Int(value))
    }
}

impl From<i32> for Tree {
    fn from(value: i32) -> Self {
        Tree::Scalar(Scalar::Int(i64::from(value)))
    }
}

impl From<f64> for Tree {
    fn from(value: f64) -> Self {
        Tree::Scalar(Scalar::Float(value))
    }
}

impl From<&str> for Tree {
    fn from(value: &str) -> Self {
        Tree::Scalar(Scalar::Str(value.to_string()))
    }
}

impl From<String> for Tree {
    fn from(value: String) -> Self {
        Tree::Scalar(Scalar::Str(value))
    }
}

impl From<Scalar> for Tree {
    fn from(value: Scalar) -> Self {
        Tree::Scalar(value)
    }
}

impl From<Vec<Tree>> for Tree {
    fn from(items: Vec<Tree>) -> Self {
        Tree::Sequence(items)
    }
}

impl From<Mapping> for Tree {
    fn from(map: Mapping) -> Self {
        Tree::Mapping(map)
    }
}

impl<K: Into<String>> FromIterator<(K, Tree)> for Tree {
    fn from_iter<I: IntoIterator<Item = (K, Tree)>>(iter: I) -> Self {
        Tree::Mapping(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<serde_json::Value> for Tree {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Tree::null(),
            Value::Bool(b) => Tree::from(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Tree::from(i),
                None => Tree::from(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Tree::from(s),
            Value::Array(items) => Tree::Sequence(items.into_iter().map(Tree::from).collect()),
            Value::Object(map) => Tree::Mapping(map.into_iter().map(|(k, v)| (k, Tree::from(v))).collect()),
        }
    }
}

impl From<Tree> for serde_json::Value {
    fn from(tree: Tree) -> Self {
        use serde_json::Value;
        match tree {
            Tree::Scalar(Scalar::Null) => Value::Null,
            Tree::Scalar(Scalar::Bool(b)) => Value::Bool(b),
            Tree::Scalar(Scalar::Int(i)) => Value::from(i),
            // Non-finite floats have no JSON form.
            Tree::Scalar(Scalar::Float(f)) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Tree::Scalar(Scalar::Str(s)) => Value::String(s),
            Tree::Sequence(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Tree::Mapping(map) => Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
        }
    }
}
