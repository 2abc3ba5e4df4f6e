//! # mobcheck-state — Protocol State Store
//!
//! Holds what earlier steps of a transaction recorded (catalogue item ids,
//! location ids, fulfillment ids, the request envelope) so later steps can
//! check referential consistency against it.
//!
//! ## Keying
//!
//! Every value lives under `(TransactionId, Action, sequence, StateField)`.
//! Two transactions never see each other's state, and a repeated step
//! (a second `on_select` in the same transaction) gets its own sequence
//! number instead of clobbering the first.
//!
//! ## Exclusive Access
//!
//! [`StateStore::with_transaction`] holds that transaction's lock for the
//! whole closure. A validator that reads prior state and publishes new state
//! inside one closure cannot interleave with another validator working on
//! the same transaction. Different transactions proceed in parallel.

pub mod store;

pub use store::{IdSet, StateError, StateField, StateStore, TransactionRecord};
