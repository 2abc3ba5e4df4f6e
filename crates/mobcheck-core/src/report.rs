//! # Error Reports and Validation Outcomes
//!
//! An [`ErrorReport`] maps a dotted/indexed field path
//! (`fulfillments[0].id`) to every message recorded against it. Paths are
//! kept in sorted order so two runs over the same input render identically.
//!
//! ## Collision Policy
//!
//! Recording a second message at an existing path appends to that path's
//! list. A later check can never erase an earlier finding.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Flat, multi-valued mapping from field path to diagnostic messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorReport {
    entries: BTreeMap<String, Vec<String>>,
}

impl ErrorReport {
    /// An empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for a report holding exactly one finding.
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        let mut report = Self::new();
        report.insert(path, message);
        report
    }

    /// Record `message` at `path`, keeping any messages already there.
    /// Identical messages at the same path are stored once.
    pub fn insert(&mut self, path: impl Into<String>, message: impl Into<String>) {
        let message = message.into();
        let messages = self.entries.entry(path.into()).or_default();
        if !messages.contains(&message) {
            messages.push(message);
        }
    }

    /// Append every finding of `other` into this report.
    pub fn merge(&mut self, other: ErrorReport) {
        for (path, messages) in other.entries {
            for message in messages {
                self.insert(path.clone(), message);
            }
        }
    }

    /// Append every finding of `other`, nesting its paths under `prefix`.
    ///
    /// Paths that start with an index (`[2].code`) are joined without a dot.
    pub fn merge_prefixed(&mut self, prefix: &str, other: ErrorReport) {
        for (path, messages) in other.entries {
            let nested = if path.is_empty() {
                prefix.to_string()
            } else if path.starts_with('[') {
                format!("{prefix}{path}")
            } else {
                format!("{prefix}.{path}")
            };
            for message in messages {
                self.insert(nested.clone(), message);
            }
        }
    }

    /// Returns true if no finding has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct paths with findings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Total number of messages across all paths.
    pub fn message_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Messages recorded at exactly `path`.
    pub fn get(&self, path: &str) -> Option<&[String]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    /// Whether any finding is recorded at exactly `path`.
    pub fn contains_path(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Paths with findings, in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Findings grouped by path, in sorted path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(path, messages)| (path.as_str(), messages.as_slice()))
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (path, messages) in &self.entries {
            for message in messages {
                if !first {
                    writeln!(f)?;
                }
                first = false;
                if path.is_empty() {
                    write!(f, "  (root): {message}")?;
                } else {
                    write!(f, "  {path}: {message}")?;
                }
            }
        }
        Ok(())
    }
}

/// Result of validating one step message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "errors", rename_all = "snake_case")]
pub enum ValidationOutcome {
    /// No finding was recorded.
    Pass,
    /// At least one finding; the report is never empty.
    Fail(ErrorReport),
}

impl ValidationOutcome {
    /// True for [`ValidationOutcome::Pass`].
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// The findings, if any.
    pub fn report(&self) -> Option<&ErrorReport> {
        match self {
            Self::Pass => None,
            Self::Fail(report) => Some(report),
        }
    }

    /// Consume the outcome, yielding an empty report for `Pass`.
    pub fn into_report(self) -> ErrorReport {
        match self {
            Self::Pass => ErrorReport::new(),
            Self::Fail(report) => report,
        }
    }
}

impl From<ErrorReport> for ValidationOutcome {
    fn from(report: ErrorReport) -> Self {
        if report.is_empty() {
            Self::Pass
        } else {
            Self::Fail(report)
        }
    }
}

/// Convert a JSON Pointer (`/message/order/items/0/id`) into the dotted
/// path form used in reports (`message.order.items[0].id`).
pub fn pointer_to_path(pointer: &str) -> String {
    let mut path = String::new();
    for raw in pointer.split('/').skip(1) {
        let segment = raw.replace("~1", "/").replace("~0", "~");
        if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
            path.push('[');
            path.push_str(&segment);
            path.push(']');
        } else {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(&segment);
        }
    }
    path
}
