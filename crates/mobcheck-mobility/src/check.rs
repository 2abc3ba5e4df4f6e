//! Shared result type and field accessors for the sub-validators.

use mobcheck_core::ErrorReport;
use rust_decimal::Decimal;
use serde_json::Value;

/// Outcome of one sub-validator: a validity flag plus its findings.
///
/// `valid` is true exactly when `errors` is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub valid: bool,
    pub errors: ErrorReport,
}

impl From<ErrorReport> for CheckResult {
    fn from(errors: ErrorReport) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Keys of `value` outside `allowed`, in the object's order.
///
/// Non-objects have no keys and therefore no extra keys.
pub fn has_only_allowed_keys(value: &Value, allowed: &[&str]) -> Vec<String> {
    value
        .as_object()
        .map(|map| {
            map.keys()
                .filter(|key| !allowed.contains(&key.as_str()))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// `value[key]` as a non-empty string.
pub fn non_empty_str<'v>(value: &'v Value, key: &str) -> Option<&'v str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Follow `keys` from `value`, returning the final non-empty string.
pub fn nested_str<'v>(value: &'v Value, keys: &[&str]) -> Option<&'v str> {
    let (last, parents) = keys.split_last()?;
    let parent = parents.iter().try_fold(value, |v, key| v.get(*key))?;
    non_empty_str(parent, last)
}

/// A decimal amount carried either as a numeric string (`"120.50"`) or a
/// JSON number.
///
/// Only plain notation is accepted: an optional sign, digits, and an
/// optional fraction. Exponent forms (`"1e3"`) and special values are
/// rejected.
pub fn decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => plain_decimal(s.trim()),
        Value::Number(n) => plain_decimal(&n.to_string()),
        _ => None,
    }
}

fn plain_decimal(raw: &str) -> Option<Decimal> {
    let unsigned = raw.strip_prefix('-').unwrap_or(raw);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !digits(whole) || !fraction.map_or(true, digits) {
        return None;
    }
    Decimal::from_str_exact(raw).ok()
}

/// Short description of a value's JSON type for diagnostics.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
