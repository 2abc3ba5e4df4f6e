//! # Checker Configuration
//!
//! Where schemas and extension documents live, which domain to validate,
//! and which protocol version's extensions apply by default.
//!
//! ```yaml
//! domain: TRV
//! schema_dir: schemas
//! extension_dir: extensions
//! protocol_version: 2.0.1
//! ```
//!
//! Every key is optional. Relative directories resolve against the
//! directory holding the configuration file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use mobcheck_core::ProtocolVersion;

/// Checker settings, loaded from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckerConfig {
    /// Domain directory under `schema_dir`.
    pub domain: String,
    /// Root of `<domain>/<action>.schema.json` documents.
    pub schema_dir: PathBuf,
    /// Root of `<version>/<action>.schema.json` extension documents.
    pub extension_dir: PathBuf,
    /// Version used when a check does not name one.
    pub protocol_version: String,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            domain: "TRV".to_string(),
            schema_dir: PathBuf::from("schemas"),
            extension_dir: PathBuf::from("extensions"),
            protocol_version: "2.0.1".to_string(),
        }
    }
}

impl CheckerConfig {
    /// Load `path`, or fall back to defaults rooted at `base` when no
    /// file is given.
    pub fn resolve(path: Option<&Path>, base: &Path) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default().rooted_at(base)),
        }
    }

    /// Load a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config YAML: {}", path.display()))?;
        config
            .protocol_version()
            .with_context(|| format!("invalid protocol_version in {}", path.display()))?;

        let base = path.parent().unwrap_or(Path::new("."));
        tracing::debug!(config = %path.display(), "loaded checker configuration");
        Ok(config.rooted_at(base))
    }

    /// The configured default version, validated.
    pub fn protocol_version(&self) -> Result<ProtocolVersion> {
        Ok(ProtocolVersion::new(&self.protocol_version)?)
    }

    fn rooted_at(mut self, base: &Path) -> Self {
        if self.schema_dir.is_relative() {
            self.schema_dir = base.join(&self.schema_dir);
        }
        if self.extension_dir.is_relative() {
            self.extension_dir = base.join(&self.extension_dir);
        }
        self
    }
}
