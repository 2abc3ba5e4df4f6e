//! # Structural Schema Checker Seam
//!
//! The step validators depend on this trait rather than on a concrete
//! schema engine. `mobcheck-schema` provides the JSON Schema backed
//! implementation.

use serde_json::Value;

use crate::action::Action;
use crate::error::MobcheckError;
use crate::report::ErrorReport;

/// Validates a raw step payload against the schema declared for that step.
///
/// Returns an empty report when the payload conforms. `Err` is reserved
/// for operational failures such as a missing schema.
pub trait StructuralSchemaChecker: Send + Sync {
    fn check(
        &self,
        domain: &str,
        action: Action,
        payload: &Value,
    ) -> Result<ErrorReport, MobcheckError>;
}
