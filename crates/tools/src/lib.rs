//! Bigraph Tools
//!
//! CLI tools for working with bigraph documents.

use std::path::Path;

use bigraph_builder::{Builder, BuilderConfig, BuilderOptions};
use bigraph_schema::edge::is_edge;
use bigraph_schema::types::reserved;
use bigraph_schema::{EdgeKind, Tree};
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging with a default filter.
///
/// Use `RUST_LOG` environment variable to override the default filter.
/// Default is `info` for bigraph crates and `warn` for others.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,bigraph_tools=info,bigraph_builder=info,bigraph_schema=warn"));

    fmt().with_env_filter(filter).with_target(false).init();
}

/// Counts reported by `bigraph-check`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub processes: usize,
    pub steps: usize,
    pub stores: usize,
}

impl Summary {
    pub fn of(builder: &Builder) -> Self {
        let mut summary = Self {
            stores: count_stores(&builder.state()),
            ..Self::default()
        };
        for edge in builder.edges() {
            match edge.kind {
                EdgeKind::Process => summary.processes += 1,
                EdgeKind::Step => summary.steps += 1,
            }
        }
        summary
    }
}

/// Leaf values outside edges.
fn count_stores(state: &Tree) -> usize {
    match state {
        _ if is_edge(state) => 0,
        Tree::Mapping(map) => map
            .iter()
            .filter(|(key, _)| !reserved::is_reserved(key))
            .map(|(_, child)| count_stores(child))
            .sum(),
        _ => 1,
    }
}

/// Load and complete a document, optionally with a YAML builder config.
pub fn check(document: &Path, config: Option<&Path>) -> bigraph_builder::Result<Builder> {
    let config = match config {
        Some(path) => BuilderConfig::load(path)?,
        None => BuilderConfig::default(),
    };
    Builder::load_with(document, BuilderOptions::new().config(config))
}
