//! Provider identity across steps.

use mobcheck_core::{Action, ErrorReport};

/// Check `order.provider.id` at `current` against the id the `previous`
/// step recorded.
///
/// `recorded` is `None` when the previous step was not seen; only
/// presence is checked then.
pub fn validate_provider_id(
    id: Option<&str>,
    recorded: Option<&str>,
    previous: Action,
    current: Action,
) -> ErrorReport {
    let mut errors = ErrorReport::new();
    let id = match id {
        Some(id) if !id.trim().is_empty() => id,
        _ => {
            errors.insert("provider.id", format!("provider id is missing in /{current}"));
            return errors;
        }
    };
    if let Some(recorded) = recorded {
        if recorded != id {
            errors.insert(
                "provider.id",
                format!(
                    "provider id {id} in /{current} does not match \
                     provider id {recorded} in /{previous}"
                ),
            );
        }
    }
    errors
}
