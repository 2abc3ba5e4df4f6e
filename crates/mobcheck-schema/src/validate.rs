//! # Structural Schema Validation
//!
//! Runtime validation of step payloads against the JSON Schema declared for
//! each `(domain, action)` pair.
//!
//! ## Layout
//!
//! ```text
//! schemas/
//!   TRV/
//!     on_select.schema.json
//! ```
//!
//! The directory name is the protocol domain, the file stem is the
//! [`Action`] wire name. Files whose stem is not an action are skipped with
//! a warning.
//!
//! Violations carry the instance path (converted from JSON Pointer to the
//! dotted report form), the schema path that fired, and the engine's
//! message.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use jsonschema::Validator;
use mobcheck_core::{pointer_to_path, Action, ErrorReport, MobcheckError, StructuralSchemaChecker};
use serde_json::Value;
use thiserror::Error;

const SCHEMA_SUFFIX: &str = ".schema.json";

/// Error loading or compiling schemas.
#[derive(Error, Debug)]
pub enum SchemaValidationError {
    /// The schema file could not be loaded.
    #[error("schema load error for '{schema_name}': {reason}")]
    SchemaLoadError {
        /// Schema filename or identifier.
        schema_name: String,
        /// Reason the schema could not be loaded.
        reason: String,
    },

    /// The compiled validator could not be built (e.g., invalid schema).
    #[error("validator build error for schema '{schema_name}': {reason}")]
    ValidatorBuildError {
        /// Schema filename or identifier.
        schema_name: String,
        /// Reason the validator could not be built.
        reason: String,
    },

    /// No schema is registered for the requested step.
    #[error("no schema registered for {domain}/{action}")]
    SchemaNotFound {
        /// Protocol domain.
        domain: String,
        /// Step name.
        action: Action,
    },

    /// IO error reading schema files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SchemaValidationError> for MobcheckError {
    fn from(err: SchemaValidationError) -> Self {
        match err {
            SchemaValidationError::SchemaNotFound { domain, action } => {
                MobcheckError::SchemaNotFound {
                    domain,
                    action: action.to_string(),
                }
            }
            SchemaValidationError::Io(e) => MobcheckError::Io(e),
            other => MobcheckError::Schema(other.to_string()),
        }
    }
}

/// A single validation violation with structured context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted path to the violating field in the payload.
    pub instance_path: String,
    /// JSON Pointer path within the schema that triggered the error.
    pub schema_path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.instance_path, self.message)
        }
    }
}

/// Compile one schema document as draft 2020-12.
pub(crate) fn compile(
    schema_name: &str,
    schema: &Value,
) -> Result<Validator, SchemaValidationError> {
    let mut opts = jsonschema::options();
    opts.with_draft(jsonschema::Draft::Draft202012);
    opts.build(schema)
        .map_err(|e| SchemaValidationError::ValidatorBuildError {
            schema_name: schema_name.to_string(),
            reason: e.to_string(),
        })
}

/// Run a compiled validator and collect every violation.
pub(crate) fn collect_violations(validator: &Validator, instance: &Value) -> Vec<Violation> {
    validator
        .iter_errors(instance)
        .map(|e| Violation {
            instance_path: pointer_to_path(&e.instance_path.to_string()),
            schema_path: e.schema_path.to_string(),
            message: e.to_string(),
        })
        .collect()
}

pub(crate) fn violations_to_report(violations: Vec<Violation>) -> ErrorReport {
    let mut report = ErrorReport::new();
    for v in violations {
        report.insert(v.instance_path, v.message);
    }
    report
}

/// Read every `*.schema.json` file directly under `dir`, keyed by the
/// action named by its file stem.
pub(crate) fn read_action_documents(
    dir: &Path,
) -> Result<Vec<(Action, String, Value)>, SchemaValidationError> {
    let mut documents = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(stem) = name.strip_suffix(SCHEMA_SUFFIX) else {
            continue;
        };
        let action: Action = match stem.parse() {
            Ok(action) => action,
            Err(_) => {
                tracing::warn!(
                    file = %path.display(),
                    "schema file does not name a protocol action; skipping"
                );
                continue;
            }
        };
        let content = std::fs::read_to_string(&path)?;
        let value: Value = serde_json::from_str(&content).map_err(|e| {
            SchemaValidationError::SchemaLoadError {
                schema_name: path.display().to_string(),
                reason: format!("invalid JSON: {e}"),
            }
        })?;
        documents.push((action, path.display().to_string(), value));
    }
    Ok(documents)
}

/// Structural schema validator backed by the `jsonschema` crate.
///
/// All schemas are compiled once at construction. `SchemaValidator` is
/// `Send + Sync` and can be shared across validation threads.
pub struct SchemaValidator {
    /// Root directory containing one sub-directory per domain.
    schema_dir: PathBuf,
    /// Compiled validators keyed by (domain, action).
    validators: HashMap<(String, Action), Validator>,
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("schema_dir", &self.schema_dir)
            .field("schema_count", &self.validators.len())
            .finish_non_exhaustive()
    }
}

impl SchemaValidator {
    /// Load and compile every schema under `schema_dir/<DOMAIN>/`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaLoadError` if the directory or a schema file cannot be
    /// read or parsed, and `ValidatorBuildError` if a schema does not
    /// compile.
    pub fn new(schema_dir: impl AsRef<Path>) -> Result<Self, SchemaValidationError> {
        let schema_dir = schema_dir.as_ref().to_path_buf();
        let entries = std::fs::read_dir(&schema_dir).map_err(|e| {
            SchemaValidationError::SchemaLoadError {
                schema_name: schema_dir.display().to_string(),
                reason: format!("cannot read schema directory: {e}"),
            }
        })?;

        let mut validators = HashMap::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let Some(domain) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            for (action, schema_name, value) in read_action_documents(&path)? {
                let validator = compile(&schema_name, &value)?;
                validators.insert((domain.to_string(), action), validator);
            }
        }

        tracing::info!(
            schema_dir = %schema_dir.display(),
            schema_count = validators.len(),
            "loaded structural schemas"
        );
        Ok(Self {
            schema_dir,
            validators,
        })
    }

    /// Returns the schema directory path.
    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Returns the number of compiled schemas.
    pub fn schema_count(&self) -> usize {
        self.validators.len()
    }

    /// Returns `(domain, action)` for every compiled schema, sorted.
    pub fn registered(&self) -> Vec<(&str, Action)> {
        let mut keys: Vec<(&str, Action)> = self
            .validators
            .keys()
            .map(|(domain, action)| (domain.as_str(), *action))
            .collect();
        keys.sort();
        keys
    }

    /// Validate `payload` against the schema for `(domain, action)`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaNotFound` if no schema is registered for the step.
    pub fn violations(
        &self,
        domain: &str,
        action: Action,
        payload: &Value,
    ) -> Result<Vec<Violation>, SchemaValidationError> {
        let validator = self
            .validators
            .get(&(domain.to_string(), action))
            .ok_or_else(|| SchemaValidationError::SchemaNotFound {
                domain: domain.to_string(),
                action,
            })?;
        Ok(collect_violations(validator, payload))
    }
}

impl StructuralSchemaChecker for SchemaValidator {
    fn check(
        &self,
        domain: &str,
        action: Action,
        payload: &Value,
    ) -> Result<ErrorReport, MobcheckError> {
        let violations = self.violations(domain, action, payload)?;
        Ok(violations_to_report(violations))
    }
}
