//! Builder configuration.
//!
//! ```yaml
//! apiVersion: bigraph/v1
//! kind: BuilderConfig
//! emitterKey: emitter
//! emitterAddress: local:ram-emitter
//! wireSuffix: _store
//! defaultInterval: 1.0
//! types:
//!   concentration: float
//!   point: {x: float, y: float}
//! ```
//!
//! Every field is optional.

use std::path::Path;

use bigraph_schema::{Tree, TypeRegistry};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const API_VERSION: &str = "bigraph/v1";
pub const KIND: &str = "BuilderConfig";

/// Conventions the builder applies when it has to make up names or values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderConfig {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_kind")]
    pub kind: String,

    /// Key of the emitter edge under the root.
    #[serde(default = "default_emitter_key")]
    pub emitter_key: String,

    /// Implementation address of the emitter.
    #[serde(default = "default_emitter_address")]
    pub emitter_address: String,

    /// Appended to a port name to name its default store.
    #[serde(default = "default_wire_suffix")]
    pub wire_suffix: String,

    /// Interval given to processes added without one.
    #[serde(default = "default_interval")]
    pub default_interval: f64,

    /// Extra type registrations, in descriptor tree form.
    #[serde(default)]
    pub types: IndexMap<String, Tree>,
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_kind() -> String {
    KIND.to_string()
}

fn default_emitter_key() -> String {
    "emitter".to_string()
}

fn default_emitter_address() -> String {
    "local:ram-emitter".to_string()
}

fn default_wire_suffix() -> String {
    "_store".to_string()
}

fn default_interval() -> f64 {
    1.0
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            emitter_key: default_emitter_key(),
            emitter_address: default_emitter_address(),
            wire_suffix: default_wire_suffix(),
            default_interval: default_interval(),
            types: IndexMap::new(),
        }
    }
}

impl BuilderConfig {
    /// Load a configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a configuration.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: BuilderConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_version != API_VERSION {
            return Err(Error::Config(format!(
                "invalid apiVersion: expected '{}', got '{}'",
                API_VERSION, self.api_version
            )));
        }
        if self.kind != KIND {
            return Err(Error::Config(format!("invalid kind: expected '{}', got '{}'", KIND, self.kind)));
        }
        if self.emitter_key.is_empty() || self.emitter_key.starts_with('_') {
            return Err(Error::Config(format!("invalid emitterKey '{}'", self.emitter_key)));
        }
        if !(self.default_interval.is_finite() && self.default_interval > 0.0) {
            return Err(Error::Config(format!(
                "defaultInterval must be positive, got {}",
                self.default_interval
            )));
        }
        Ok(())
    }

    /// Register the configured types.
    pub fn register_types(&self, registry: &mut TypeRegistry) -> Result<()> {
        for (name, descriptor) in &self.types {
            registry.register_tree(name.as_str(), descriptor)?;
        }
        Ok(())
    }
}
