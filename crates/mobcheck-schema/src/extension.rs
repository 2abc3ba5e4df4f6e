//! # Version-Keyed Extension Documents
//!
//! Some protocol versions require attributes beyond the base structural
//! schema (e.g. `2.0.1` requires `context.location` and descriptor names
//! on `on_select`). Those constraints are configuration: one JSON Schema
//! document per `(version, action)` under `extensions/<version>/`.
//!
//! A step validator asks the registry for its `(version, action)` entry and
//! applies it when present. Versions with no directory get no extension
//! checks.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use jsonschema::Validator;
use mobcheck_core::{Action, ErrorReport, ProtocolVersion};
use serde_json::Value;

use crate::validate::{collect_violations, compile, read_action_documents, violations_to_report};
use crate::SchemaValidationError;

/// Lookup table of compiled extension documents.
#[derive(Default)]
pub struct ExtensionRegistry {
    documents: BTreeMap<(ProtocolVersion, Action), Validator>,
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("documents", &self.documents.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ExtensionRegistry {
    /// A registry with no documents; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load `<dir>/<version>/<action>.schema.json` for every version
    /// directory under `dir`. Directories that are not a version are skipped.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, SchemaValidationError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| SchemaValidationError::SchemaLoadError {
            schema_name: dir.display().to_string(),
            reason: format!("cannot read extension directory: {e}"),
        })?;

        let mut registry = Self::empty();
        for entry in entries {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let version = match path
                .file_name()
                .and_then(|n| n.to_str())
                .map(ProtocolVersion::new)
            {
                Some(Ok(version)) => version,
                _ => {
                    tracing::warn!(
                        dir = %path.display(),
                        "extension directory is not a protocol version; skipping"
                    );
                    continue;
                }
            };
            for (action, schema_name, value) in read_action_documents(&path)? {
                let validator = compile(&schema_name, &value)?;
                registry.documents.insert((version.clone(), action), validator);
            }
        }

        tracing::info!(
            extension_dir = %dir.display(),
            document_count = registry.documents.len(),
            "loaded extension documents"
        );
        Ok(registry)
    }

    /// Register a document directly, replacing any existing entry.
    pub fn register(
        &mut self,
        version: ProtocolVersion,
        action: Action,
        document: &Value,
    ) -> Result<(), SchemaValidationError> {
        let name = format!("{version}/{action}");
        let validator = compile(&name, document)?;
        self.documents.insert((version, action), validator);
        Ok(())
    }

    /// Whether a document is registered for `(version, action)`.
    pub fn contains(&self, version: &ProtocolVersion, action: Action) -> bool {
        self.documents.contains_key(&(version.clone(), action))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Apply the `(version, action)` document to `payload`.
    ///
    /// Returns `None` when the version defines no extension for this step.
    pub fn apply(
        &self,
        version: &ProtocolVersion,
        action: Action,
        payload: &Value,
    ) -> Option<ErrorReport> {
        let validator = self.documents.get(&(version.clone(), action))?;
        Some(violations_to_report(collect_violations(validator, payload)))
    }
}
