//! # Envelope Validation
//!
//! Checks the `context` block of a step: required keys, the action name,
//! the timestamp, duplicate message ids, and consistency with the context
//! of the paired request recorded earlier in the transaction.
//!
//! A response echoes its request's `transaction_id`, `message_id`,
//! `bap_id` and `bpp_id`, and cannot be timestamped before it.

use chrono::{DateTime, FixedOffset};
use mobcheck_core::{Action, ErrorReport};
use mobcheck_state::IdSet;
use serde_json::Value;

use crate::check::{non_empty_str, CheckResult};
use crate::constants::{CONTEXT_ECHOED_KEYS, CONTEXT_REQUIRED_KEYS};

/// Validate `context` for step `current`, paired with step `previous`.
///
/// `seen_message_ids` holds message ids already consumed by earlier
/// responses; reusing one is reported as a duplicate. `previous_context`
/// is the envelope recorded by `previous`, when the checker saw it.
pub fn validate_context(
    context: &Value,
    seen_message_ids: &IdSet,
    previous_context: Option<&Value>,
    previous: Action,
    current: Action,
) -> CheckResult {
    let mut errors = ErrorReport::new();
    if !context.is_object() {
        errors.insert("context", format!("/context must be an object in /{current}"));
        return errors.into();
    }

    for key in CONTEXT_REQUIRED_KEYS {
        if non_empty_str(context, key).is_none() {
            errors.insert(
                format!("context.{key}"),
                format!("{key} is missing or empty in /context of /{current}"),
            );
        }
    }

    if let Some(action) = non_empty_str(context, "action") {
        if action != current.as_str() {
            errors.insert(
                "context.action",
                format!("action should be {current}, found {action}"),
            );
        }
    }

    let timestamp = non_empty_str(context, "timestamp").and_then(|raw| {
        let parsed = parse_timestamp(raw);
        if parsed.is_none() {
            errors.insert(
                "context.timestamp",
                format!("timestamp {raw} is not a valid RFC 3339 date-time"),
            );
        }
        parsed
    });

    if let Some(message_id) = non_empty_str(context, "message_id") {
        if seen_message_ids.contains(message_id) {
            errors.insert(
                "context.message_id",
                format!("message_id {message_id} was already used by an earlier response"),
            );
        }
    }

    if let Some(previous_context) = previous_context {
        for key in CONTEXT_ECHOED_KEYS {
            let ours = non_empty_str(context, key);
            let theirs = non_empty_str(previous_context, key);
            if let (Some(ours), Some(theirs)) = (ours, theirs) {
                if ours != theirs {
                    errors.insert(
                        format!("context.{key}"),
                        format!(
                            "{key} of /{current} should be {theirs} as in /{previous}, \
                             found {ours}"
                        ),
                    );
                }
            }
        }

        let previous_timestamp =
            non_empty_str(previous_context, "timestamp").and_then(parse_timestamp);
        if let (Some(ours), Some(theirs)) = (timestamp, previous_timestamp) {
            if ours < theirs {
                errors.insert(
                    "context.timestamp",
                    format!(
                        "timestamp of /{current} cannot be earlier than \
                         the timestamp of /{previous}"
                    ),
                );
            }
        }
    }

    errors.into()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw).ok()
}
