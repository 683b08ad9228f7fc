//! Errors raised by the builder API.

use std::path::PathBuf;

use bigraph_schema::Path;
use thiserror::Error;

/// Result alias for builder operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building, wiring, or (de)serializing a composite.
///
/// All of these are caller-correctable; nothing here is retried. A failed
/// mutation leaves the builder's trees exactly as they were before the call.
#[derive(Debug, Error)]
pub enum Error {
    /// Path, type, merge or completion failure from the schema layer.
    #[error(transparent)]
    Schema(#[from] bigraph_schema::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown implementation '{address}'{}", hint(.suggestions))]
    UnknownImplementation { address: String, suggestions: Vec<String> },

    #[error("unknown port '{port}' on {edge} (available: {})", .available.join(", "))]
    UnknownPort { port: String, edge: Path, available: Vec<String> },

    #[error("{path} is not an edge")]
    NotAnEdge { path: Path },

    #[error("port '{port}' of {edge} has no wire")]
    UnwiredPort { edge: Path, port: String },

    #[error("emit key '{key}' would route both {first} and {second}")]
    EmitKeyConflict { key: String, first: Path, second: Path },

    /// The trees were already borrowed, e.g. by a composer calling back into
    /// the builder while [`crate::Builder::generate`] runs.
    #[error("builder is busy")]
    Busy,

    /// A node handle was used after its builder was dropped.
    #[error("node handle outlived its builder")]
    Detached,

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// The composite-execution collaborator rejected the model.
    #[error("composition failed: {0}")]
    Compose(#[source] Box<dyn std::error::Error + Send + Sync>),
}

fn hint(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (available: {})", suggestions.join(", "))
    }
}
