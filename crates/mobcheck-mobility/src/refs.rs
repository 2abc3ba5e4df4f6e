//! # Referential Integrity
//!
//! Identifiers referenced at a later step must have been declared at an
//! earlier one: an `on_select` item must be a catalogue item from
//! `on_search`, its `fulfillment_ids` must name fulfillments validated in
//! this same message, and its `location_ids` must be catalogue locations.
//!
//! [`check_reference`] is the single membership rule. Callers turn its
//! three outcomes into findings with distinct messages, so "missing" and
//! "not previously declared" are never conflated.

use mobcheck_core::{Action, ErrorReport};
use mobcheck_state::IdSet;
use serde_json::Value;

/// Result of checking one candidate id against a reference set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefCheck {
    /// Present and a member of the reference set.
    Declared,
    /// Absent, not a string, or empty.
    Missing,
    /// Present but not a member of the reference set.
    Undeclared,
}

/// Classify `candidate` against `refs`. A blank id counts as missing.
pub fn check_reference(candidate: Option<&str>, refs: &IdSet) -> RefCheck {
    match candidate {
        None => RefCheck::Missing,
        Some(id) if id.trim().is_empty() => RefCheck::Missing,
        Some(id) if refs.contains(id) => RefCheck::Declared,
        Some(_) => RefCheck::Undeclared,
    }
}

/// Check `item.fulfillment_ids`, `item.location_ids` and
/// `item.payment_ids` against the sets known at this step.
///
/// `fulfillment_ids` is required and must be non-empty. `location_ids` is
/// optional. `payment_ids` is only checked when `payment_ids` (the set) is
/// non-empty, since steps before `on_init` carry no payments.
pub fn validate_item_ref_ids(
    item: &Value,
    action: Action,
    index: usize,
    fulfillment_ids: &IdSet,
    location_ids: &IdSet,
    payment_ids: &IdSet,
) -> ErrorReport {
    let mut errors = ErrorReport::new();
    let key = format!("items[{index}]");

    match item.get("fulfillment_ids").and_then(Value::as_array) {
        Some(ids) if !ids.is_empty() => {
            let undeclared = |id: &str| {
                format!(
                    "fulfillment id {id} at items[{index}] in /{action} \
                     does not match any validated /fulfillments/id"
                )
            };
            let path = format!("{key}.fulfillment_ids");
            check_id_list(ids, fulfillment_ids, &path, undeclared, &mut errors);
        }
        _ => errors.insert(
            format!("{key}.fulfillment_ids"),
            format!("fulfillment_ids are missing or empty at items[{index}] in /{action}"),
        ),
    }

    if let Some(raw) = item.get("location_ids") {
        match raw.as_array() {
            Some(ids) => {
                let undeclared = |id: &str| {
                    format!(
                        "location id {id} at items[{index}] in /{action} \
                         was not declared in /on_search"
                    )
                };
                let path = format!("{key}.location_ids");
                check_id_list(ids, location_ids, &path, undeclared, &mut errors);
            }
            None => errors.insert(
                format!("{key}.location_ids"),
                format!("location_ids must be an array at items[{index}] in /{action}"),
            ),
        }
    }

    if !payment_ids.is_empty() {
        if let Some(ids) = item.get("payment_ids").and_then(Value::as_array) {
            let undeclared = |id: &str| {
                format!(
                    "payment id {id} at items[{index}] in /{action} \
                     does not match any /payments/id"
                )
            };
            let path = format!("{key}.payment_ids");
            check_id_list(ids, payment_ids, &path, undeclared, &mut errors);
        }
    }

    errors
}

fn check_id_list(
    ids: &[Value],
    refs: &IdSet,
    key: &str,
    undeclared: impl Fn(&str) -> String,
    errors: &mut ErrorReport,
) {
    for (j, raw) in ids.iter().enumerate() {
        let candidate = raw.as_str();
        match check_reference(candidate, refs) {
            RefCheck::Declared => {}
            RefCheck::Missing => {
                errors.insert(format!("{key}[{j}]"), "id must be a non-empty string")
            }
            RefCheck::Undeclared => {
                errors.insert(format!("{key}[{j}]"), undeclared(candidate.unwrap_or_default()))
            }
        }
    }
}
