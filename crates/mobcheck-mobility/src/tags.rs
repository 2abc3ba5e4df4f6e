//! # Tag Groups
//!
//! Tag groups are loosely typed attribute blocks:
//!
//! ```json
//! {"descriptor": {"code": "FARE_POLICY"}, "display": true,
//!  "list": [{"descriptor": {"code": "MIN_FARE"}, "value": "30"}]}
//! ```
//!
//! Each group kind has a small grammar: which entry codes it may carry and
//! what their values must look like. Fulfillments carry `ROUTE_INFO`;
//! ride items carry `FARE_POLICY` and `INFO`.
//!
//! Finding paths are relative to the `tags` array (`[1].list[0].value`,
//! or a bare group code when the group itself is missing); callers nest
//! them under the owning entity with
//! [`ErrorReport::merge_prefixed`](mobcheck_core::ErrorReport::merge_prefixed).

use chrono::{NaiveTime, Timelike};
use mobcheck_core::ErrorReport;
use serde_json::Value;

use crate::check::{decimal, nested_str, CheckResult};

/// Shape of a tag entry's `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagValue {
    /// Any non-empty string.
    Text,
    /// A decimal number carried as a string.
    Number,
    /// A time of day, `HH:MM:SS`.
    TimeOfDay,
}

/// Grammar for one tag-group kind.
#[derive(Debug, Clone, Copy)]
pub struct TagGroupGrammar {
    pub code: &'static str,
    pub entries: &'static [(&'static str, TagValue)],
}

/// Route geometry on a fulfillment.
pub const ROUTE_INFO: TagGroupGrammar = TagGroupGrammar {
    code: "ROUTE_INFO",
    entries: &[
        ("ENCODED_POLYLINE", TagValue::Text),
        ("WAYPOINTS", TagValue::Text),
    ],
};

/// Fare components of a ride item.
pub const FARE_POLICY: TagGroupGrammar = TagGroupGrammar {
    code: "FARE_POLICY",
    entries: &[
        ("MIN_FARE", TagValue::Number),
        ("MIN_FARE_DISTANCE_KM", TagValue::Number),
        ("PER_KM_CHARGE", TagValue::Number),
        ("PICKUP_CHARGE", TagValue::Number),
        ("WAITING_CHARGE_PER_MIN", TagValue::Number),
        ("NIGHT_CHARGE_MULTIPLIER", TagValue::Number),
        ("NIGHT_SHIFT_START_TIME", TagValue::TimeOfDay),
        ("NIGHT_SHIFT_END_TIME", TagValue::TimeOfDay),
    ],
};

/// Nearest-driver estimates on a ride item.
pub const INFO: TagGroupGrammar = TagGroupGrammar {
    code: "INFO",
    entries: &[
        ("DISTANCE_TO_NEAREST_DRIVER_METER", TagValue::Number),
        ("ETA_TO_NEAREST_DRIVER_MIN", TagValue::Number),
    ],
};

/// Validate fulfillment tags: a `ROUTE_INFO` group is required; other
/// groups are left alone.
pub fn validate_route_info_tags(tags: &Value) -> CheckResult {
    validate_tag_groups(tags, &[ROUTE_INFO], false)
}

/// Validate ride item tags: `FARE_POLICY` and `INFO` are required and no
/// other group is allowed.
pub fn validate_items_tags(tags: &Value) -> CheckResult {
    validate_tag_groups(tags, &[FARE_POLICY, INFO], true)
}

fn validate_tag_groups(tags: &Value, required: &[TagGroupGrammar], closed: bool) -> CheckResult {
    let mut errors = ErrorReport::new();
    let Some(groups) = tags.as_array() else {
        errors.insert("", "tags must be an array of tag-groups");
        return errors.into();
    };

    let mut found = vec![false; required.len()];
    for (g, group) in groups.iter().enumerate() {
        let Some(code) = nested_str(group, &["descriptor", "code"]) else {
            errors.insert(format!("[{g}].descriptor.code"), "tag-group descriptor.code is missing");
            continue;
        };
        match required.iter().position(|grammar| grammar.code == code) {
            Some(at) => {
                found[at] = true;
                check_group(group, g, &required[at], &mut errors);
            }
            None if closed => {
                let allowed: Vec<&str> = required.iter().map(|grammar| grammar.code).collect();
                errors.insert(
                    format!("[{g}].descriptor.code"),
                    format!("tag-group {code} should be one of {}", allowed.join(", ")),
                );
            }
            None => {}
        }
    }

    for (grammar, seen) in required.iter().zip(found) {
        if !seen {
            errors.insert(grammar.code, format!("{} tag-group is missing", grammar.code));
        }
    }

    errors.into()
}

fn check_group(group: &Value, g: usize, grammar: &TagGroupGrammar, errors: &mut ErrorReport) {
    if let Some(display) = group.get("display") {
        if !display.is_boolean() {
            errors.insert(format!("[{g}].display"), "display must be a boolean");
        }
    }

    let list = match group.get("list").and_then(Value::as_array) {
        Some(list) if !list.is_empty() => list,
        _ => {
            errors.insert(
                format!("[{g}].list"),
                format!("{} list is missing or empty", grammar.code),
            );
            return;
        }
    };

    for (l, entry) in list.iter().enumerate() {
        let key = format!("[{g}].list[{l}]");
        let Some(code) = nested_str(entry, &["descriptor", "code"]) else {
            errors.insert(format!("{key}.descriptor.code"), "descriptor.code is missing");
            continue;
        };
        let Some((_, kind)) = grammar.entries.iter().find(|(c, _)| *c == code) else {
            let allowed: Vec<&str> = grammar.entries.iter().map(|(c, _)| *c).collect();
            errors.insert(
                format!("{key}.descriptor.code"),
                format!("{} code {code} should be one of {}", grammar.code, allowed.join(", ")),
            );
            continue;
        };
        let value = entry.get("value").and_then(Value::as_str).unwrap_or_default();
        if let Err(problem) = check_value(value, *kind) {
            errors.insert(format!("{key}.value"), format!("{code} {problem}"));
        }
    }
}

fn check_value(value: &str, kind: TagValue) -> Result<(), &'static str> {
    if value.trim().is_empty() {
        return Err("value is missing or empty");
    }
    match kind {
        TagValue::Text => Ok(()),
        TagValue::Number => decimal(&Value::String(value.to_string()))
            .map(|_| ())
            .ok_or("value must be a decimal number"),
        TagValue::TimeOfDay => {
            if is_time_of_day(value) {
                Ok(())
            } else {
                Err("value must be a time of day as HH:MM:SS")
            }
        }
    }
}

/// Strict `HH:MM:SS`: two digits per field, no leap second.
fn is_time_of_day(value: &str) -> bool {
    value.len() == 8
        && value.bytes().all(|b| b.is_ascii_digit() || b == b':')
        && NaiveTime::parse_from_str(value, "%H:%M:%S")
            .is_ok_and(|t| t.nanosecond() < 1_000_000_000)
}
