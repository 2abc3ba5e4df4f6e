//! Quote shape validation: total price, breakup lines, and quote ttl.

use mobcheck_core::{Action, ErrorReport};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::check::{decimal, json_kind, nested_str, non_empty_str};

/// Breakup lines may differ from the total by rounding only (0.01).
const BREAKUP_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Validate `order.quote` for `action`.
pub fn validate_quote(quote: Option<&Value>, action: Action) -> ErrorReport {
    let mut errors = ErrorReport::new();
    let quote = match quote {
        None | Some(Value::Null) => {
            errors.insert("quote", format!("quote is missing in /{action}"));
            return errors;
        }
        Some(quote) if !quote.is_object() => {
            errors.insert("quote", format!("quote must be an object, found {}", json_kind(quote)));
            return errors;
        }
        Some(quote) => quote,
    };

    let currency = nested_str(quote, &["price", "currency"]);
    if currency.is_none() {
        errors.insert("quote.price.currency", format!("quote currency is missing in /{action}"));
    }
    let total = quote.get("price").and_then(|p| p.get("value")).and_then(decimal);
    if total.is_none() {
        errors.insert(
            "quote.price.value",
            format!("quote price value must be a decimal number in /{action}"),
        );
    }

    let breakup = match quote.get("breakup").and_then(Value::as_array) {
        Some(lines) if !lines.is_empty() => lines,
        _ => {
            errors.insert(
                "quote.breakup",
                format!("quote breakup is missing or empty in /{action}"),
            );
            return errors;
        }
    };

    let mut sum = Some(Decimal::ZERO);
    for (j, line) in breakup.iter().enumerate() {
        let key = format!("quote.breakup[{j}]");
        if non_empty_str(line, "title").is_none() {
            errors.insert(format!("{key}.title"), "breakup title is missing");
        }
        let value = line.get("price").and_then(|p| p.get("value")).and_then(decimal);
        match value {
            Some(v) => {
                if let Some(s) = sum {
                    sum = s.checked_add(v);
                    if sum.is_none() {
                        errors.insert(format!("{key}.price.value"), "breakup total overflows");
                    }
                }
            }
            None => {
                sum = None;
                errors.insert(
                    format!("{key}.price.value"),
                    "breakup price value must be a decimal number",
                );
            }
        }
        let line_currency = nested_str(line, &["price", "currency"]);
        if let (Some(expected), Some(found)) = (currency, line_currency) {
            if expected != found {
                errors.insert(
                    format!("{key}.price.currency"),
                    format!("breakup currency {found} does not match quote currency {expected}"),
                );
            }
        } else if line_currency.is_none() {
            errors.insert(format!("{key}.price.currency"), "breakup currency is missing");
        }
    }

    if let (Some(total), Some(sum)) = (total, sum) {
        let within = total
            .checked_sub(sum)
            .is_some_and(|diff| diff.abs() <= BREAKUP_TOLERANCE);
        if !within {
            errors.insert(
                "quote.price.value",
                format!("quote price {total} does not match the breakup total {sum} in /{action}"),
            );
        }
    }

    if let Some(ttl) = quote.get("ttl") {
        if !ttl.as_str().is_some_and(is_iso8601_duration) {
            errors.insert("quote.ttl", format!("quote ttl {ttl} is not an ISO 8601 duration"));
        }
    }

    errors
}

/// `PnYnMnDTnHnMnS` with at least one component (`P1D`, `PT15M`). `P200S`
/// is rejected (seconds need the `T` designator).
pub fn is_iso8601_duration(raw: &str) -> bool {
    let Some(rest) = raw.strip_prefix('P') else {
        return false;
    };
    let (date, time) = match rest.split_once('T') {
        Some((date, time)) => {
            if time.is_empty() {
                return false;
            }
            (date, Some(time))
        }
        None => (rest, None),
    };
    let date_ok = components(date, &['Y', 'M', 'W', 'D']);
    let time_ok = time.map(|t| components(t, &['H', 'M', 'S']));
    match (date_ok, time_ok) {
        (Some(d), None) => d > 0,
        (Some(d), Some(Some(t))) => d + t > 0 && t > 0,
        _ => false,
    }
}

/// Count `<digits><designator>` components, designators in order.
fn components(part: &str, designators: &[char]) -> Option<usize> {
    let mut count = 0;
    let mut digits = String::new();
    let mut next = 0;
    for c in part.chars() {
        if c.is_ascii_digit() || (c == '.' && !digits.is_empty()) {
            digits.push(c);
            continue;
        }
        let at = designators[next..].iter().position(|d| *d == c)? + next;
        if digits.is_empty() {
            return None;
        }
        digits.clear();
        count += 1;
        next = at + 1;
    }
    digits.is_empty().then_some(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn quote() -> Value {
        json!({
            "price": {"currency": "INR", "value": "130"},
            "breakup": [
                {"title": "BASE_FARE", "price": {"currency": "INR", "value": "100"}},
                {"title": "DISTANCE_FARE", "price": {"currency": "INR", "value": "30"}}
            ],
            "ttl": "PT5M"
        })
    }

    #[test]
    fn test_valid_quote() {
        let errors = validate_quote(Some(&quote()), Action::OnSelect);
        assert!(errors.is_empty(), "{errors}");
    }

    #[test]
    fn test_missing_quote() {
        let errors = validate_quote(None, Action::OnSelect);
        assert_eq!(errors.get("quote").unwrap(), &["quote is missing in /on_select".to_string()]);
    }

    #[test]
    fn test_breakup_must_sum_to_total() {
        let mut q = quote();
        q["price"]["value"] = json!("150");
        let errors = validate_quote(Some(&q), Action::OnSelect);
        assert!(errors.get("quote.price.value").unwrap()[0].contains("breakup total 130"));
    }

    #[test]
    fn test_large_totals_compare_exactly() {
        let q = json!({
            "price": {"currency": "INR", "value": "10000000000000001"},
            "breakup": [
                {"title": "BASE_FARE", "price": {"currency": "INR", "value": "10000000000000000"}}
            ]
        });
        let errors = validate_quote(Some(&q), Action::OnSelect);
        assert!(errors.contains_path("quote.price.value"), "{errors}");
    }

    #[test]
    fn test_rounding_within_tolerance() {
        let mut q = quote();
        q["price"]["value"] = json!("130.01");
        assert!(validate_quote(Some(&q), Action::OnSelect).is_empty());
        q["price"]["value"] = json!("130.02");
        assert!(validate_quote(Some(&q), Action::OnSelect).contains_path("quote.price.value"));
    }

    #[test]
    fn test_exponent_prices_are_rejected() {
        let mut q = quote();
        q["breakup"][0]["price"]["value"] = json!("1e2");
        let errors = validate_quote(Some(&q), Action::OnSelect);
        assert!(errors.get("quote.breakup[0].price.value").unwrap()[0].contains("decimal number"));
        assert!(!errors.contains_path("quote.price.value"));
    }

    #[test]
    fn test_missing_total_value() {
        let mut q = quote();
        q["price"].as_object_mut().unwrap().remove("value");
        let errors = validate_quote(Some(&q), Action::OnSelect);
        assert_eq!(
            errors.get("quote.price.value").unwrap(),
            &["quote price value must be a decimal number in /on_select".to_string()]
        );
    }

    #[test]
    fn test_breakup_currency_mismatch() {
        let mut q = quote();
        q["breakup"][1]["price"]["currency"] = json!("USD");
        let errors = validate_quote(Some(&q), Action::OnSelect);
        assert!(errors.contains_path("quote.breakup[1].price.currency"));
    }

    #[test]
    fn test_empty_breakup() {
        let mut q = quote();
        q["breakup"] = json!([]);
        let errors = validate_quote(Some(&q), Action::OnSelect);
        assert!(errors.contains_path("quote.breakup"));
    }

    #[test]
    fn test_bad_ttl() {
        let mut q = quote();
        q["ttl"] = json!("5 minutes");
        let errors = validate_quote(Some(&q), Action::OnSelect);
        assert!(errors.contains_path("quote.ttl"));
    }

    #[test]
    fn test_iso8601_duration() {
        assert!(is_iso8601_duration("PT5M"));
        assert!(is_iso8601_duration("P1D"));
        assert!(is_iso8601_duration("P1DT2H30M"));
        assert!(is_iso8601_duration("PT0.5S"));
        assert!(!is_iso8601_duration("P"));
        assert!(!is_iso8601_duration("PT"));
        assert!(!is_iso8601_duration("P200S"));
        assert!(!is_iso8601_duration("PT5M2H"));
        assert!(!is_iso8601_duration("5M"));
    }
}
