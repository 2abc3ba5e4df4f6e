//! # Identifier Newtypes
//!
//! Newtype wrappers for the identifiers that scope checker state.
//! A `TransactionId` cannot be passed where a `ProtocolVersion` is expected,
//! and neither can be empty.

use serde::{Deserialize, Serialize};

use crate::error::MobcheckError;

/// The `context.transaction_id` shared by every step of one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionId(String);

impl TransactionId {
    /// Create a transaction id, rejecting empty or whitespace-only input.
    pub fn new(id: impl Into<String>) -> Result<Self, MobcheckError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(MobcheckError::InvalidIdentifier(
                "transaction_id must not be empty".into(),
            ));
        }
        Ok(Self(id))
    }

    /// Access the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TransactionId {
    type Error = MobcheckError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TransactionId> for String {
    fn from(id: TransactionId) -> Self {
        id.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// Protocol version carried in `context.version`, e.g. `2.0.1`.
///
/// Only the shape `MAJOR.MINOR.PATCH` with numeric components is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProtocolVersion(String);

impl ProtocolVersion {
    /// Validate and wrap a `MAJOR.MINOR.PATCH` version string.
    pub fn new(version: impl Into<String>) -> Result<Self, MobcheckError> {
        let version = version.into();
        let parts: Vec<&str> = version.split('.').collect();
        let well_formed = parts.len() == 3
            && parts
                .iter()
                .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
        if !well_formed {
            return Err(MobcheckError::InvalidIdentifier(format!(
                "protocol version {version:?} is not MAJOR.MINOR.PATCH"
            )));
        }
        Ok(Self(version))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProtocolVersion {
    type Error = MobcheckError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProtocolVersion> for String {
    fn from(version: ProtocolVersion) -> Self {
        version.0
    }
}

impl std::str::FromStr for ProtocolVersion {
    type Err = MobcheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
