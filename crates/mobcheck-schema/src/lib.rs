//! # mobcheck-schema — Step Payload Schema Validation
//!
//! Two kinds of JSON Schema (draft 2020-12) documents are loaded from disk:
//!
//! ## Structural schemas (`validate`)
//!
//! `schemas/<DOMAIN>/<action>.schema.json`, e.g.
//! `schemas/TRV/on_select.schema.json`. [`SchemaValidator`] compiles every
//! one of them at construction time and implements
//! [`StructuralSchemaChecker`](mobcheck_core::StructuralSchemaChecker).
//!
//! ## Extension documents (`extension`)
//!
//! `extensions/<version>/<action>.schema.json`, e.g.
//! `extensions/2.0.1/on_select.schema.json`. These carry the additional
//! attribute constraints a protocol version layers on top of the base
//! schema. [`ExtensionRegistry`] is a lookup table keyed by
//! `(ProtocolVersion, Action)`; supporting a new version means dropping a
//! new directory of documents, not adding a code branch.
//!
//! ## Crate Policy
//!
//! - Depends only on `mobcheck-core` internally.
//! - Schema violations are findings, returned as an
//!   [`ErrorReport`](mobcheck_core::ErrorReport). Only load and compile
//!   failures are errors.

pub mod extension;
pub mod validate;

pub use extension::ExtensionRegistry;
pub use validate::{SchemaValidationError, SchemaValidator, Violation};
