//! Builder API for composite process graphs.
//!
//! A [`Builder`] owns a schema tree and a state tree and keeps them
//! completed against a [`TypeRegistry`](bigraph_schema::TypeRegistry) after
//! every change. Models are assembled through [`Node`] handles:
//!
//! - [`Node::set`] / [`Node::update`] write data and type declarations
//! - [`Node::add_process`] declares an edge backed by a registered
//!   [`Implementation`]
//! - [`Node::connect`] / [`Node::connect_all`] wire edge ports to stores
//! - [`Node::emit`] routes port data to the emitter edge
//!
//! Every mutation is one transaction. If the write or the completion that
//! follows it fails, the trees are left as they were.
//!
//! ```
//! use bigraph_builder::Builder;
//!
//! let builder = Builder::new()?;
//! builder.root().set("volume", 1.5)?;
//! builder.at("volume").emit(None)?;
//! assert_eq!(
//!     builder.at("emitter.config.emit.volume").value()?,
//!     Some("float".into())
//! );
//! # Ok::<(), bigraph_builder::Error>(())
//! ```

mod builder;
pub mod compose;
pub mod config;
pub mod document;
mod emit;
pub mod error;
pub mod implementation;
mod node;
mod process;
mod wiring;
mod workspace;

pub use builder::{Builder, BuilderOptions, EdgeSummary};
pub use compose::{Composer, Composite, Snapshot, SnapshotComposer};
pub use config::BuilderConfig;
pub use document::{Document, Format};
pub use error::{Error, Result};
pub use implementation::{Implementation, ImplementationRegistry, RamEmitter};
pub use node::Node;
pub use process::ProcessSpec;
