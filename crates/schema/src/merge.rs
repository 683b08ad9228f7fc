//! Deep merging of nested trees.
//!
//! Mappings merge key by key, recursively. Everything else is a leaf, and
//! what happens when two leaves meet depends on the [`MergeStrategy`]:
//!
//! - [`MergeStrategy::Strict`] accepts equal leaves and rejects different
//!   ones with [`Error::MergeConflict`]. Construction-time documents are
//!   merged this way so that two sources never silently disagree.
//! - [`MergeStrategy::Override`] lets the incoming leaf win. This is what an
//!   explicit update asks for.

use crate::error::{Error, Result};
use crate::path::Path;
use crate::tree::Tree;

/// How colliding leaves are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    #[default]
    Strict,
    Override,
}

/// Strictly merge `incoming` over `base`.
///
/// ```
/// # use bigraph_schema::{merge::deep_merge, Tree};
/// # use serde_json::json;
/// let merged = deep_merge(
///     &Tree::from(json!({"a": {"b": 1}})),
///     &Tree::from(json!({"a": {"c": 2}})),
/// ).unwrap();
/// assert_eq!(merged, Tree::from(json!({"a": {"b": 1, "c": 2}})));
///
/// assert!(deep_merge(&Tree::from(json!({"a": 1})), &Tree::from(json!({"a": 2}))).is_err());
/// ```
pub fn deep_merge(base: &Tree, incoming: &Tree) -> Result<Tree> {
    deep_merge_with(base, incoming, MergeStrategy::Strict)
}

/// Merge `incoming` over `base` with an explicit strategy.
pub fn deep_merge_with(base: &Tree, incoming: &Tree, strategy: MergeStrategy) -> Result<Tree> {
    let mut merged = base.clone();
    merge_into(&mut merged, incoming.clone(), strategy, &Path::root())?;
    Ok(merged)
}

/// Merge `incoming` into `target` in place. `at` is the location of `target`
/// and only used for conflict reports.
pub fn merge_into(target: &mut Tree, incoming: Tree, strategy: MergeStrategy, at: &Path) -> Result<()> {
    match (target, incoming) {
        (Tree::Mapping(left), Tree::Mapping(right)) => {
            for (key, value) in right {
                let here = at.child(key.as_str());
                match left.get_mut(&key) {
                    Some(existing) => merge_into(existing, value, strategy, &here)?,
                    None => {
                        left.insert(key, value);
                    }
                }
            }
            Ok(())
        }
        (target, incoming) => {
            if *target == incoming {
                return Ok(());
            }
            match strategy {
                MergeStrategy::Override => {
                    *target = incoming;
                    Ok(())
                }
                MergeStrategy::Strict => Err(Error::MergeConflict {
                    path: at.clone(),
                    left: target.clone(),
                    right: incoming,
                }),
            }
        }
    }
}
