//! Type system for schema trees.
//!
//! - [`expr`]: the type-name syntax (`map[list[float]]`)
//! - [`descriptor`]: registered descriptors and their resolved form
//! - [`registry`]: the [`TypeRegistry`] with built-in types and lookup
//! - [`infer`]: ranked shape matchers used when a value has no declared type
//!
//! Completion itself lives in [`crate::complete`].

pub mod descriptor;
pub mod expr;
pub mod infer;
pub mod registry;

pub use descriptor::{Kind, ResolvedType, Shape, TypeDescriptor};
pub use expr::TypeExpr;
pub use infer::{ContainerMatcher, EdgeMatcher, HomogeneousMapMatcher, ScalarMatcher, SequenceMatcher, ShapeMatcher};
pub use registry::{is_declaration, TypeRegistry};

/// Reserved schema keys.
///
/// Any key starting with `_` is reserved: it describes the type at that
/// location instead of naming a child.
pub mod reserved {
    pub const TYPE: &str = "_type";
    pub const DEFAULT: &str = "_default";
    pub const APPLY: &str = "_apply";
    pub const INHERIT: &str = "_inherit";
    pub const INPUTS: &str = "_inputs";
    pub const OUTPUTS: &str = "_outputs";
    /// Only meaningful in node writes, where it carries the state value.
    pub const VALUE: &str = "_value";

    pub fn is_reserved(key: &str) -> bool {
        key.starts_with('_')
    }
}
