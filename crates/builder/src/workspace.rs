//! The trees a builder owns, and the transaction wrapper every mutation
//! goes through.

use std::sync::Arc;

use bigraph_schema::edge::{edge_schema, EdgeRecord};
use bigraph_schema::tree::Mapping;
use bigraph_schema::{path, Direction, EdgeKind, Path, Tree, TypeRegistry};
use tracing::debug;

use crate::config::BuilderConfig;
use crate::error::Result;
use crate::implementation::ImplementationRegistry;

#[derive(Debug)]
pub(crate) struct Workspace {
    pub schema: Tree,
    pub state: Tree,
    pub types: Arc<TypeRegistry>,
    pub implementations: Arc<ImplementationRegistry>,
    pub config: BuilderConfig,
}

impl Workspace {
    /// Complete both trees in place.
    pub fn complete(&mut self) -> Result<()> {
        let (schema, state) = self.types.complete(&self.schema, &self.state)?;
        self.schema = schema;
        self.state = state;
        Ok(())
    }

    /// Apply `op` and re-complete. On any failure both trees are restored
    /// to their contents before the call.
    pub fn transact<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let schema = self.schema.clone();
        let state = self.state.clone();
        let result = op(self).and_then(|value| {
            self.complete()?;
            Ok(value)
        });
        if let Err(err) = &result {
            debug!(error = %err, "rolling back mutation");
            self.schema = schema;
            self.state = state;
        }
        result
    }

    pub fn emitter_path(&self) -> Path {
        Path::root().child(self.config.emitter_key.as_str())
    }

    /// Declared ports of one side of the edge at `at`, from its resolved
    /// schema. An edge without a declaration has no ports.
    pub fn ports(&self, at: &Path, direction: Direction) -> Result<Mapping> {
        let Some(schema) = path::get(&self.schema, at) else {
            return Ok(Mapping::new());
        };
        let resolved = self.types.resolve_schema(schema)?;
        Ok(resolved
            .and_then(|resolved| resolved.ports(direction).cloned())
            .unwrap_or_default())
    }

    /// Add the emitter edge unless something already occupies its key.
    pub fn attach_emitter(&mut self) -> Result<()> {
        let at = self.emitter_path();
        if path::get(&self.state, &at).is_some() {
            return Ok(());
        }
        debug!(path = %at, address = %self.config.emitter_address, "attaching emitter");

        let mut record = EdgeRecord::new(EdgeKind::Step, self.config.emitter_address.as_str());
        record.config = [("emit", Tree::map())].into_iter().collect();
        path::set(&mut self.schema, &at, edge_schema(EdgeKind::Step, Tree::map(), Tree::map()))?;
        path::set(&mut self.state, &at, record.to_tree())?;
        self.complete()
    }
}
