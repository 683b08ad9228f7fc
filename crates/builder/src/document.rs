//! Serialized documents.
//!
//! A document is one nested mapping with two sections:
//!
//! ```json
//! {"schema": {...}, "state": {...}}
//! ```
//!
//! Files ending in `.yaml`/`.yml` are YAML, everything else is JSON.

use std::fs;
use std::path::Path;

use bigraph_schema::Tree;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

/// On-disk encoding of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Format::Yaml,
            _ => Format::Json,
        }
    }
}

/// A schema tree and a state tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub schema: Tree,
    #[serde(default)]
    pub state: Tree,
}

impl Document {
    pub fn new(schema: Tree, state: Tree) -> Self {
        Self { schema, state }
    }

    /// Read a document from disk.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = Self::parse(&content, Format::from_path(path))?;
        info!(path = %path.display(), "loaded document");
        Ok(document)
    }

    /// Write the document to disk, replacing any existing file.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = self.render(Format::from_path(path))?;
        fs::write(path, content).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "wrote document");
        Ok(())
    }

    pub fn parse(content: &str, format: Format) -> Result<Self> {
        Ok(match format {
            Format::Json => serde_json::from_str(content)?,
            Format::Yaml => serde_yaml::from_str(content)?,
        })
    }

    pub fn render(&self, format: Format) -> Result<String> {
        Ok(match format {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Yaml => serde_yaml::to_string(self)?,
        })
    }
}
