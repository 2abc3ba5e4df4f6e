//! # Error Types — Structured Error Hierarchy
//!
//! Operational errors for the checker. These are distinct from validation
//! findings: a finding is an entry in an [`ErrorReport`](crate::ErrorReport),
//! an error here means the checker itself could not do its job (schema
//! missing, bad identifier, unreadable document).

use thiserror::Error;

/// Top-level error type for the conformance checker.
#[derive(Error, Debug)]
pub enum MobcheckError {
    /// An identifier failed its newtype constructor.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A step name that is not part of the protocol.
    #[error("unknown action: {0:?}")]
    UnknownAction(String),

    /// No schema is registered for the requested domain and action.
    #[error("no schema registered for {domain}/{action}")]
    SchemaNotFound {
        /// Protocol domain, e.g. `TRV`.
        domain: String,
        /// Step name.
        action: String,
    },

    /// Schema engine failure other than a missing schema.
    #[error("schema error: {0}")]
    Schema(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_not_found_display() {
        let err = MobcheckError::SchemaNotFound {
            domain: "TRV".into(),
            action: "on_select".into(),
        };
        assert_eq!(err.to_string(), "no schema registered for TRV/on_select");
    }

    #[test]
    fn test_serde_error_converts() {
        let raw = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: MobcheckError = raw.into();
        assert!(matches!(err, MobcheckError::Serialization(_)));
    }
}
