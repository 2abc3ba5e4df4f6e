//! # Fulfillment Stops
//!
//! A ride fulfillment has exactly one `START` and one `END` stop (the `END`
//! may be dropped in cancellation flows). Every stop carries a
//! `location.gps` of the form `"lat,lng"`. Stops may carry a `time` with a
//! `timestamp` and/or a `range {start, end}`. When the flow uses ride OTPs,
//! the `START` stop carries `authorization {type: OTP, token}`.

use chrono::DateTime;
use mobcheck_core::ErrorReport;
use serde_json::Value;

use crate::check::{nested_str, non_empty_str, CheckResult};
use crate::constants::{END_STOP, INTERMEDIATE_STOP, START_STOP};

/// Validate `fulfillments[index].stops`.
///
/// `otp` requires START-stop authorization; `cancel` relaxes the END-stop
/// requirement.
pub fn validate_stops(stops: Option<&Value>, index: usize, otp: bool, cancel: bool) -> CheckResult {
    let mut errors = ErrorReport::new();
    let prefix = format!("fulfillments[{index}].stops");

    let stops = match stops.and_then(Value::as_array) {
        Some(stops) if !stops.is_empty() => stops,
        _ => {
            errors.insert(prefix, format!("stops are missing or empty in fulfillments[{index}]"));
            return errors.into();
        }
    };

    let mut starts = 0usize;
    let mut ends = 0usize;
    for (j, stop) in stops.iter().enumerate() {
        let key = format!("{prefix}[{j}]");
        if !stop.is_object() {
            errors.insert(key, "stop must be an object");
            continue;
        }

        let stop_type = non_empty_str(stop, "type");
        match stop_type {
            Some(START_STOP) => starts += 1,
            Some(END_STOP) => ends += 1,
            Some(INTERMEDIATE_STOP) => {}
            Some(other) => errors.insert(
                format!("{key}.type"),
                format!(
                    "stop type must be one of {START_STOP}, {END_STOP}, \
                     {INTERMEDIATE_STOP}, found {other}"
                ),
            ),
            None => errors.insert(format!("{key}.type"), "stop type is missing"),
        }

        match nested_str(stop, &["location", "gps"]) {
            Some(gps) if is_valid_gps(gps) => {}
            Some(gps) => errors.insert(
                format!("{key}.location.gps"),
                format!("gps {gps} is not a valid \"lat,lng\" coordinate"),
            ),
            None => errors.insert(format!("{key}.location.gps"), "gps is missing in stop location"),
        }

        if let Some(time) = stop.get("time") {
            check_time(time, &format!("{key}.time"), &mut errors);
        }

        if otp && stop_type == Some(START_STOP) {
            let authorized = nested_str(stop, &["authorization", "type"]) == Some("OTP")
                && nested_str(stop, &["authorization", "token"]).is_some();
            if !authorized {
                errors.insert(
                    format!("{key}.authorization"),
                    "START stop must carry an OTP authorization with a token",
                );
            }
        }
    }

    if starts != 1 {
        errors.insert(
            prefix.clone(),
            format!(
                "exactly one {START_STOP} stop is required in fulfillments[{index}], \
                 found {starts}"
            ),
        );
    }
    if !cancel && ends != 1 {
        errors.insert(
            prefix,
            format!(
                "exactly one {END_STOP} stop is required in fulfillments[{index}], \
                 found {ends}"
            ),
        );
    }

    errors.into()
}

fn check_time(time: &Value, key: &str, errors: &mut ErrorReport) {
    if let Some(raw) = time.get("timestamp") {
        if !raw.as_str().is_some_and(is_rfc3339) {
            errors.insert(format!("{key}.timestamp"), "timestamp must be an RFC 3339 date-time");
        }
    }
    if let Some(range) = time.get("range") {
        let start =
            non_empty_str(range, "start").and_then(|s| DateTime::parse_from_rfc3339(s).ok());
        let end = non_empty_str(range, "end").and_then(|s| DateTime::parse_from_rfc3339(s).ok());
        match (start, end) {
            (Some(start), Some(end)) if start <= end => {}
            (Some(_), Some(_)) => errors.insert(
                format!("{key}.range"),
                "range start must not be after range end",
            ),
            _ => errors.insert(
                format!("{key}.range"),
                "range must carry RFC 3339 start and end date-times",
            ),
        }
    }
}

fn is_rfc3339(raw: &str) -> bool {
    DateTime::parse_from_rfc3339(raw).is_ok()
}

/// `"lat,lng"` with latitude in [-90, 90] and longitude in [-180, 180].
pub fn is_valid_gps(raw: &str) -> bool {
    let mut parts = raw.split(',');
    let (Some(lat), Some(lng), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    match (lat.trim().parse::<f64>(), lng.trim().parse::<f64>()) {
        (Ok(lat), Ok(lng)) => (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ride_stops() -> Value {
        json!([
            {"type": "START", "location": {"gps": "12.9716,77.5946"}},
            {"type": "END", "location": {"gps": "12.9352,77.6245"}}
        ])
    }

    #[test]
    fn test_start_and_end_pass() {
        let result = validate_stops(Some(&ride_stops()), 0, false, false);
        assert!(result.valid, "{}", result.errors);
    }

    #[test]
    fn test_missing_stops() {
        let result = validate_stops(None, 1, false, false);
        assert_eq!(result.errors.paths().collect::<Vec<_>>(), vec!["fulfillments[1].stops"]);
        let result = validate_stops(Some(&json!([])), 1, false, false);
        assert!(!result.valid);
    }

    #[test]
    fn test_missing_end_is_allowed_when_cancelling() {
        let stops = json!([{"type": "START", "location": {"gps": "12.9,77.5"}}]);
        assert!(!validate_stops(Some(&stops), 0, false, false).valid);
        assert!(validate_stops(Some(&stops), 0, false, true).valid);
    }

    #[test]
    fn test_duplicate_start_is_reported() {
        let stops = json!([
            {"type": "START", "location": {"gps": "12.9,77.5"}},
            {"type": "START", "location": {"gps": "12.9,77.5"}},
            {"type": "END", "location": {"gps": "12.9,77.6"}}
        ]);
        let result = validate_stops(Some(&stops), 0, false, false);
        assert!(result.errors.get("fulfillments[0].stops").unwrap()[0].contains("found 2"));
    }

    #[test]
    fn test_bad_gps_and_type() {
        let stops = json!([
            {"type": "START", "location": {"gps": "212.9,77.5"}},
            {"type": "FINISH", "location": {}}
        ]);
        let result = validate_stops(Some(&stops), 0, false, false);
        assert!(result.errors.contains_path("fulfillments[0].stops[0].location.gps"));
        assert!(result.errors.contains_path("fulfillments[0].stops[1].location.gps"));
        assert!(result.errors.contains_path("fulfillments[0].stops[1].type"));
    }

    #[test]
    fn test_time_range_must_be_ordered() {
        let stops = json!([
            {
                "type": "START",
                "location": {"gps": "12.9,77.5"},
                "time": {
                    "timestamp": "2024-05-01T10:00:00Z",
                    "range": {"start": "2024-05-01T10:10:00Z", "end": "2024-05-01T10:05:00Z"}
                }
            },
            {"type": "END", "location": {"gps": "12.9,77.6"}, "time": {"timestamp": "soon"}}
        ]);
        let result = validate_stops(Some(&stops), 0, false, false);
        assert!(result.errors.contains_path("fulfillments[0].stops[0].time.range"));
        assert!(!result.errors.contains_path("fulfillments[0].stops[0].time.timestamp"));
        assert!(result.errors.contains_path("fulfillments[0].stops[1].time.timestamp"));
    }

    #[test]
    fn test_otp_requires_start_authorization() {
        let result = validate_stops(Some(&ride_stops()), 0, true, false);
        assert!(result.errors.contains_path("fulfillments[0].stops[0].authorization"));

        let mut stops = ride_stops();
        stops[0]["authorization"] = json!({"type": "OTP", "token": "7391"});
        assert!(validate_stops(Some(&stops), 0, true, false).valid);
    }

    #[test]
    fn test_is_valid_gps() {
        assert!(is_valid_gps("12.9716,77.5946"));
        assert!(is_valid_gps("-33.8, 151.2"));
        assert!(!is_valid_gps("12.9716"));
        assert!(!is_valid_gps("12.9,77.5,3"));
        assert!(!is_valid_gps("north,east"));
        assert!(!is_valid_gps("91,0"));
    }
}
