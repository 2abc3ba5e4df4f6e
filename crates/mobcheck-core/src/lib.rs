//! # mobcheck-core — Foundational Types for the Conformance Checker
//!
//! Defines the primitives every other `mobcheck-*` crate builds on. It
//! depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **One `Action` enum.** Every protocol step name (`search`,
//!    `on_select`, ...) is a variant. State keys, envelope checks and schema
//!    lookups all use it, so a typo in a step name is a compile error.
//!
//! 2. **Newtype identifiers.** `TransactionId` and `ProtocolVersion` are
//!    validated newtypes. All persisted state is keyed by `TransactionId`,
//!    never by step name alone.
//!
//! 3. **Multi-valued `ErrorReport`.** Two distinct findings at the same
//!    field path are both kept. Nothing is silently overwritten.
//!
//! 4. **Tagged outcome.** [`ValidationOutcome`] is `Pass` or
//!    `Fail(ErrorReport)`; there is no falsy sentinel.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `mobcheck-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod action;
pub mod checker;
pub mod error;
pub mod identity;
pub mod report;

pub use action::Action;
pub use checker::StructuralSchemaChecker;
pub use error::MobcheckError;
pub use identity::{ProtocolVersion, TransactionId};
pub use report::{pointer_to_path, ErrorReport, ValidationOutcome};
