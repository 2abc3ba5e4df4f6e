//! In-memory, transaction-scoped state store.
//!
//! The transaction map is a `DashMap` so lookups for unrelated transactions
//! do not contend. Each record sits behind its own `parking_lot::Mutex`;
//! the DashMap shard guard is released before that mutex is taken, so a
//! slow validator never blocks the shard.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use dashmap::DashMap;
use mobcheck_core::{Action, TransactionId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A set of protocol identifiers (item ids, location ids, ...).
pub type IdSet = BTreeSet<String>;

/// What a step records about itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    /// The `message` object of the step payload.
    Message,
    /// The full step payload.
    Payload,
    /// The `context` envelope of the step payload.
    Context,
    /// Catalogue item ids.
    ItemIds,
    /// Location ids.
    LocationIds,
    /// Fulfillment ids.
    FulfillmentIds,
    /// The provider id the step was answered by.
    ProviderId,
}

impl StateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Payload => "payload",
            Self::Context => "context",
            Self::ItemIds => "item_ids",
            Self::LocationIds => "location_ids",
            Self::FulfillmentIds => "fulfillment_ids",
            Self::ProviderId => "provider_id",
        }
    }
}

impl std::fmt::Display for StateField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error reading typed state.
#[derive(Error, Debug)]
pub enum StateError {
    /// A stored value does not have the shape its field requires.
    #[error("malformed {field} recorded by {action}: {reason}")]
    Malformed {
        /// Step that recorded the value.
        action: Action,
        /// Field that was read.
        field: StateField,
        /// Why the value could not be decoded.
        reason: String,
    },
}

/// Everything recorded for one transaction.
#[derive(Debug, Clone)]
pub struct TransactionRecord {
    transaction_id: TransactionId,
    /// Latest sequence number allocated per action.
    sequences: BTreeMap<Action, u32>,
    values: BTreeMap<(Action, u32, StateField), Value>,
}

impl TransactionRecord {
    /// An empty record for `transaction_id`.
    pub fn new(transaction_id: TransactionId) -> Self {
        Self {
            transaction_id,
            sequences: BTreeMap::new(),
            values: BTreeMap::new(),
        }
    }

    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    /// Allocate the next sequence number for `action`. Sequences start at 1.
    pub fn begin_step(&mut self, action: Action) -> u32 {
        let next = self.sequences.get(&action).copied().unwrap_or(0) + 1;
        self.sequences.insert(action, next);
        next
    }

    /// Latest sequence number allocated for `action`, if the step was seen.
    pub fn current_sequence(&self, action: Action) -> Option<u32> {
        self.sequences.get(&action).copied()
    }

    /// Read `field` as recorded by the latest occurrence of `action`.
    pub fn get(&self, action: Action, field: StateField) -> Option<&Value> {
        let sequence = self.current_sequence(action)?;
        self.get_at(action, sequence, field)
    }

    /// Read `field` as recorded by a specific occurrence of `action`.
    pub fn get_at(&self, action: Action, sequence: u32, field: StateField) -> Option<&Value> {
        self.values.get(&(action, sequence, field))
    }

    /// Record `field` under the latest occurrence of `action`, starting the
    /// first occurrence if the step has not begun yet.
    pub fn set(&mut self, action: Action, field: StateField, value: Value) {
        let sequence = match self.current_sequence(action) {
            Some(sequence) => sequence,
            None => self.begin_step(action),
        };
        tracing::debug!(
            transaction = %self.transaction_id,
            %action,
            sequence,
            %field,
            "recording step state"
        );
        self.values.insert((action, sequence, field), value);
    }

    /// Read an identifier set. `Ok(None)` means the step never recorded it.
    pub fn id_set(&self, action: Action, field: StateField) -> Result<Option<IdSet>, StateError> {
        let Some(value) = self.get(action, field) else {
            return Ok(None);
        };
        let malformed = |reason: String| StateError::Malformed {
            action,
            field,
            reason,
        };
        let items = value
            .as_array()
            .ok_or_else(|| malformed(format!("expected an array, found {value}")))?;
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| malformed(format!("expected string ids, found {item}")))
            })
            .collect::<Result<IdSet, StateError>>()
            .map(Some)
    }

    /// Record an identifier set as a sorted JSON array of strings.
    pub fn set_id_set(&mut self, action: Action, field: StateField, ids: &IdSet) {
        let value = Value::Array(ids.iter().cloned().map(Value::String).collect());
        self.set(action, field, value);
    }

    /// Read a single string value such as [`StateField::ProviderId`].
    pub fn string(&self, action: Action, field: StateField) -> Result<Option<String>, StateError> {
        match self.get(action, field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(StateError::Malformed {
                action,
                field,
                reason: format!("expected a string, found {other}"),
            }),
        }
    }
}

/// Thread-safe, cloneable store of transaction records.
///
/// All clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    transactions: Arc<DashMap<TransactionId, Arc<Mutex<TransactionRecord>>>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with exclusive access to the transaction's record, creating
    /// an empty record on first use.
    pub fn with_transaction<R>(
        &self,
        id: &TransactionId,
        f: impl FnOnce(&mut TransactionRecord) -> R,
    ) -> R {
        let slot = {
            let entry = self
                .transactions
                .entry(id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(TransactionRecord::new(id.clone()))));
            Arc::clone(entry.value())
        };
        let mut record = slot.lock();
        f(&mut record)
    }

    /// Clone of a transaction's record, if it exists.
    pub fn snapshot(&self, id: &TransactionId) -> Option<TransactionRecord> {
        let slot = self.transactions.get(id).map(|entry| Arc::clone(entry.value()))?;
        let record = slot.lock();
        Some(record.clone())
    }

    /// Number of transactions with recorded state.
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}
