//! Bigraph Schema
//!
//! Typed nested trees for composite models. A model is a pair of parallel
//! trees: a **schema tree** declaring types and a **state tree** holding
//! values. Some state subtrees are **edges** (processes and steps) whose
//! ports are wired to other locations in the state tree.
//!
//! # Modules
//!
//! - [`tree`]: the [`Tree`] value type shared by schema and state
//! - [`path`]: [`Path`] addressing with get/set/remove and relative resolution
//! - [`merge`]: strict and overriding deep merges
//! - [`edge`]: the edge record vocabulary
//! - [`types`]: the [`TypeRegistry`], type-name syntax and inference
//! - [`complete`]: schema completion over a schema/state pair
//!
//! # Example
//!
//! ```
//! use bigraph_schema::{Path, Tree, TypeRegistry};
//! use serde_json::json;
//!
//! let registry = TypeRegistry::new();
//! let schema = Tree::from(json!({"cell": {"mass": "float"}}));
//! let state = Tree::from(json!({"cell": {"label": "a"}}));
//!
//! let (schema, state) = registry.complete(&schema, &state).unwrap();
//! assert_eq!(bigraph_schema::path::get(&state, &Path::from("cell.mass")), Some(&Tree::from(0.0)));
//! assert_eq!(bigraph_schema::path::get(&schema, &Path::from("cell.label")), Some(&Tree::from("string")));
//! ```

pub mod complete;
pub mod edge;
pub mod error;
pub mod merge;
pub mod path;
pub mod tree;
pub mod types;

pub use edge::{Direction, EdgeKind, EdgeRecord};
pub use error::{Error, Mismatch, Mismatches, Result};
pub use merge::MergeStrategy;
pub use path::{Path, Segment};
pub use tree::{Mapping, Scalar, Tree};
pub use types::{ResolvedType, TypeDescriptor, TypeRegistry};
