//! # mobcheck-mobility — Mobility (TRV) Step Validation
//!
//! Business-rule validation for ride-hailing messages, and the
//! [`OnSelectValidator`] that composes them for the `on_select` step.
//!
//! ## Sub-validators
//!
//! - [`context`]: envelope keys, action, timestamp ordering, duplicate
//!   message ids.
//! - [`stops`]: `START`/`END` stops, gps, stop times, ride OTP.
//! - [`tags`]: `ROUTE_INFO`, `FARE_POLICY` and `INFO` tag groups.
//! - [`quote`]: totals, breakup lines, quote ttl.
//! - [`provider`]: provider identity across steps.
//! - [`refs`]: identifiers declared by earlier steps.
//!
//! Each returns findings keyed by the path of the offending field; none of
//! them touches transaction state.
//!
//! ## Crate Policy
//!
//! - Only [`on_select`] reads or writes the state store, and only through
//!   [`StateStore::with_transaction`](mobcheck_state::StateStore::with_transaction).
//! - Validation never panics on malformed input. Operational failures are
//!   logged and reported as findings.

pub mod check;
pub mod constants;
pub mod context;
pub mod on_select;
pub mod provider;
pub mod quote;
pub mod refs;
pub mod stops;
pub mod tags;

pub use check::{has_only_allowed_keys, CheckResult};
pub use context::validate_context;
pub use on_select::{OnSelectValidator, SectionError};
pub use provider::validate_provider_id;
pub use quote::{is_iso8601_duration, validate_quote};
pub use refs::{check_reference, validate_item_ref_ids, RefCheck};
pub use stops::{is_valid_gps, validate_stops};
pub use tags::{validate_items_tags, validate_route_info_tags};
