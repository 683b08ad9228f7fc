//! Composite-execution seam.
//!
//! The builder never runs a model. [`Builder::generate`](crate::Builder::generate)
//! hands the completed trees to a [`Composer`], whatever executes them, and
//! returns its output. The only thing asked of that output is that the
//! current trees can be read back ([`Composite`]), so a builder can resume
//! from it with [`Builder::from_composite`](crate::Builder::from_composite).
//!
//! # Implementations
//!
//! - [`SnapshotComposer`] - freezes the trees without executing anything

use std::convert::Infallible;

use bigraph_schema::Tree;

use crate::implementation::ImplementationRegistry;

/// Something holding a schema tree and a state tree.
pub trait Composite {
    fn schema(&self) -> &Tree;
    fn state(&self) -> &Tree;
}

/// Turns completed trees into a runnable unit.
pub trait Composer {
    type Output: Composite;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Build the runnable unit. `implementations` resolves every edge
    /// address found in `state`.
    fn compose(
        &self,
        schema: &Tree,
        state: &Tree,
        implementations: &ImplementationRegistry,
    ) -> std::result::Result<Self::Output, Self::Error>;
}

/// A frozen copy of a builder's trees.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub schema: Tree,
    pub state: Tree,
}

impl Composite for Snapshot {
    fn schema(&self) -> &Tree {
        &self.schema
    }

    fn state(&self) -> &Tree {
        &self.state
    }
}

/// Composer that only takes a [`Snapshot`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotComposer;

impl Composer for SnapshotComposer {
    type Output = Snapshot;
    type Error = Infallible;

    fn compose(
        &self,
        schema: &Tree,
        state: &Tree,
        _implementations: &ImplementationRegistry,
    ) -> std::result::Result<Snapshot, Infallible> {
        Ok(Snapshot {
            schema: schema.clone(),
            state: state.clone(),
        })
    }
}
