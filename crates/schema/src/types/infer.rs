//! Shape inference for values without a declared type.
//!
//! Inference is a ranked list of [`ShapeMatcher`]s; the first one that
//! recognizes a value decides its schema. The default ranking is
//!
//! 1. [`EdgeMatcher`]: edge records become their kind (`process`/`step`)
//! 2. [`ScalarMatcher`]: null is `any`, then `boolean`, `integer`, `float`, `string`
//! 3. [`SequenceMatcher`]: `list[T]` when every element is the same scalar
//!    type, else `list[any]`
//! 4. [`ContainerMatcher`]: mappings become a nested schema mapping that
//!    completion fills in key by key
//!
//! [`HomogeneousMapMatcher`] is not in the default ranking. Installing it
//! ahead of the container matcher makes non-empty mappings of same-typed
//! scalars infer as `map[T]` instead of a record-like container.

use std::fmt;

use crate::edge::edge_kind;
use crate::tree::{Scalar, Tree};
use crate::types::reserved;

/// One rule of the inference ranking.
pub trait ShapeMatcher: fmt::Debug + Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Schema for `value`, or `None` to defer to the next matcher.
    fn infer(&self, value: &Tree) -> Option<Tree>;
}

fn scalar_type(value: &Tree) -> Option<&'static str> {
    match value {
        Tree::Scalar(Scalar::Null) => Some("any"),
        Tree::Scalar(Scalar::Bool(_)) => Some("boolean"),
        Tree::Scalar(Scalar::Int(_)) => Some("integer"),
        Tree::Scalar(Scalar::Float(_)) => Some("float"),
        Tree::Scalar(Scalar::Str(_)) => Some("string"),
        _ => None,
    }
}

/// The scalar type shared by every item. `None` for empty input.
fn common_scalar_type<'a>(mut items: impl Iterator<Item = &'a Tree>) -> Option<&'static str> {
    let first = scalar_type(items.next()?)?;
    items.all(|item| scalar_type(item) == Some(first)).then_some(first)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EdgeMatcher;

impl ShapeMatcher for EdgeMatcher {
    fn name(&self) -> &str {
        "edge"
    }

    fn infer(&self, value: &Tree) -> Option<Tree> {
        edge_kind(value).map(|kind| Tree::from(kind.as_str()))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ScalarMatcher;

impl ShapeMatcher for ScalarMatcher {
    fn name(&self) -> &str {
        "scalar"
    }

    fn infer(&self, value: &Tree) -> Option<Tree> {
        scalar_type(value).map(Tree::from)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SequenceMatcher;

impl ShapeMatcher for SequenceMatcher {
    fn name(&self) -> &str {
        "sequence"
    }

    fn infer(&self, value: &Tree) -> Option<Tree> {
        let items = value.as_sequence()?;
        let element = match common_scalar_type(items.iter()) {
            Some("any") | None => "any",
            Some(element) => element,
        };
        Some(Tree::from(format!("list[{}]", element)))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ContainerMatcher;

impl ShapeMatcher for ContainerMatcher {
    fn name(&self) -> &str {
        "container"
    }

    fn infer(&self, value: &Tree) -> Option<Tree> {
        value.is_mapping().then(Tree::map)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HomogeneousMapMatcher;

impl ShapeMatcher for HomogeneousMapMatcher {
    fn name(&self) -> &str {
        "homogeneous-map"
    }

    fn infer(&self, value: &Tree) -> Option<Tree> {
        let map = value.as_mapping()?;
        if map.keys().any(|key| reserved::is_reserved(key)) {
            return None;
        }
        match common_scalar_type(map.values())? {
            "any" => None,
            element => Some(Tree::from(format!("map[{}]", element))),
        }
    }
}
