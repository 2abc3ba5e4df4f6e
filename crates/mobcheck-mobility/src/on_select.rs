//! # `on_select` Step Validator
//!
//! Validates a seller's `on_select` response against the schema, the
//! envelope rules, the mobility business rules, and the identifiers that
//! earlier steps of the same transaction declared.
//!
//! ## Pipeline
//!
//! 1. Presence gate. An empty payload, or one without `context`,
//!    `message` and `message.order`, yields a single finding and nothing
//!    else runs.
//! 2. Structural schema check and envelope check.
//! 3. Sections: provider, fulfillments, items, quote, forbidden fields.
//!    Each section is contained: a malformed shape aborts that section
//!    with one finding at the section key, and the next section still runs.
//! 4. Version extensions for the requested protocol version.
//! 5. State publication for the next step.
//!
//! ## State
//!
//! Prior state is read and this step's state written inside one
//! [`StateStore::with_transaction`] call, so a transaction's record is
//! never observed half-updated. The fulfillment ids published for the
//! next step are the ids validated in this message.

use std::fmt;

use mobcheck_core::{
    Action, ErrorReport, ProtocolVersion, StructuralSchemaChecker, TransactionId,
    ValidationOutcome,
};
use mobcheck_schema::ExtensionRegistry;
use mobcheck_state::{IdSet, StateError, StateField, StateStore, TransactionRecord};
use serde_json::Value;
use thiserror::Error;

use crate::check::{decimal, has_only_allowed_keys, json_kind, nested_str, non_empty_str};
use crate::constants::{
    DOMAIN, FORBIDDEN_ORDER_KEYS, FULFILLMENT_TYPE, ITEM_DESCRIPTOR_CODE, MAX_VEHICLE_KEYS,
    ON_DEMAND_VEHICLE, PROVIDER_KEYS,
};
use crate::context::validate_context;
use crate::provider::validate_provider_id;
use crate::quote::validate_quote;
use crate::refs::{check_reference, validate_item_ref_ids, RefCheck};
use crate::stops::validate_stops;
use crate::tags::{validate_items_tags, validate_route_info_tags};

const ACTION: Action = Action::OnSelect;
const REQUEST: Action = match ACTION.paired_request() {
    Some(request) => request,
    None => panic!("on_select answers a request"),
};

/// Failure that aborts a single section.
#[derive(Error, Debug)]
pub enum SectionError {
    /// A value the section walks had the wrong JSON type.
    #[error("{path} must be {expected}, found {found}")]
    Shape {
        /// Dotted path of the offending value.
        path: String,
        /// Expected JSON type.
        expected: &'static str,
        /// Observed JSON type.
        found: &'static str,
    },
}

impl SectionError {
    fn shape(path: impl Into<String>, expected: &'static str, value: &Value) -> Self {
        Self::Shape {
            path: path.into(),
            expected,
            found: json_kind(value),
        }
    }
}

/// Identifiers and context recorded by earlier steps of the transaction.
#[derive(Debug, Clone, Default)]
struct PriorState {
    item_ids: IdSet,
    location_ids: IdSet,
    fulfillment_ids: IdSet,
    provider_id: Option<String>,
    select_context: Option<Value>,
}

impl PriorState {
    fn read(record: &TransactionRecord, report: &mut ErrorReport) -> Self {
        Self {
            item_ids: recorded(record.id_set(Action::OnSearch, StateField::ItemIds), report)
                .unwrap_or_default(),
            location_ids: recorded(record.id_set(Action::OnSearch, StateField::LocationIds), report)
                .unwrap_or_default(),
            fulfillment_ids: recorded(
                record.id_set(Action::OnSearch, StateField::FulfillmentIds),
                report,
            )
            .unwrap_or_default(),
            provider_id: recorded(record.string(REQUEST, StateField::ProviderId), report),
            select_context: record.get(REQUEST, StateField::Context).cloned(),
        }
    }
}

fn recorded<T>(result: Result<Option<T>, StateError>, report: &mut ErrorReport) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(error = %err, "ignoring malformed prior state");
            report.insert("state", err.to_string());
            None
        }
    }
}

/// Validator for the `on_select` step.
///
/// Holds only borrowed collaborators; one instance can validate any
/// number of messages, from any number of threads.
pub struct OnSelectValidator<'a> {
    schema: &'a dyn StructuralSchemaChecker,
    extensions: &'a ExtensionRegistry,
    store: &'a StateStore,
    domain: String,
}

impl fmt::Debug for OnSelectValidator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnSelectValidator")
            .field("domain", &self.domain)
            .field("extensions", &self.extensions.len())
            .finish_non_exhaustive()
    }
}

impl<'a> OnSelectValidator<'a> {
    /// A validator over the TRV domain using `store` for transaction state.
    pub fn new(
        schema: &'a dyn StructuralSchemaChecker,
        extensions: &'a ExtensionRegistry,
        store: &'a StateStore,
    ) -> Self {
        Self {
            schema,
            extensions,
            store,
            domain: DOMAIN.to_string(),
        }
    }

    /// Validate against another domain's schemas.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Validate one `on_select` message.
    ///
    /// `seen_message_ids` holds message ids already used by earlier
    /// responses. `version` selects the extension documents to apply.
    /// Operational failures are logged and reported as findings; this
    /// never panics on malformed input.
    pub fn validate(
        &self,
        payload: &Value,
        seen_message_ids: &IdSet,
        version: &ProtocolVersion,
    ) -> ValidationOutcome {
        if let Some(report) = presence_gate(payload) {
            tracing::info!(action = %ACTION, "payload rejected by presence gate");
            return report.into();
        }

        let transaction = non_empty_str(&payload["context"], "transaction_id")
            .and_then(|id| TransactionId::new(id).ok());

        let report = match transaction {
            Some(transaction) => {
                tracing::info!(action = %ACTION, %transaction, %version, "validating step");
                self.store.with_transaction(&transaction, |record| {
                    let mut report = ErrorReport::new();
                    let prior = PriorState::read(record, &mut report);
                    let validated =
                        self.run(payload, seen_message_ids, version, &prior, &mut report);
                    publish(record, payload, &validated);
                    report
                })
            }
            None => {
                tracing::warn!(
                    action = %ACTION,
                    "context.transaction_id is absent, validating without prior state"
                );
                let mut report = ErrorReport::new();
                self.run(payload, seen_message_ids, version, &PriorState::default(), &mut report);
                report
            }
        };

        tracing::info!(action = %ACTION, findings = report.message_count(), "step validated");
        report.into()
    }

    /// Run every check after the presence gate. Returns the fulfillment
    /// ids validated in this message.
    fn run(
        &self,
        payload: &Value,
        seen_message_ids: &IdSet,
        version: &ProtocolVersion,
        prior: &PriorState,
        report: &mut ErrorReport,
    ) -> IdSet {
        match self.schema.check(&self.domain, ACTION, payload) {
            Ok(found) => report.merge(found),
            Err(err) => {
                tracing::error!(
                    domain = %self.domain,
                    error = %err,
                    "structural check could not run"
                );
                report.insert("schema", format!("structural validation could not run: {err}"));
            }
        }

        let envelope = validate_context(
            &payload["context"],
            seen_message_ids,
            prior.select_context.as_ref(),
            REQUEST,
            ACTION,
        );
        report.merge(envelope.errors);

        let order = &payload["message"]["order"];

        contain("provider", report, |errors| check_provider(order, prior, errors));

        let mut fulfillment_ids = IdSet::new();
        let completed = contain("fulfillments", report, |errors| {
            check_fulfillments(
                order.get("fulfillments"),
                &prior.fulfillment_ids,
                &mut fulfillment_ids,
                errors,
            )
        });
        if !completed {
            fulfillment_ids.clear();
        }

        contain("items", report, |errors| {
            check_items(order.get("items"), prior, &fulfillment_ids, errors)
        });

        contain("quote", report, |errors| {
            errors.merge(validate_quote(order.get("quote"), ACTION));
            Ok(())
        });

        contain("forbidden_fields", report, |errors| {
            for key in FORBIDDEN_ORDER_KEYS {
                if order.get(*key).is_some() {
                    errors.insert(
                        *key,
                        format!("/message/order/{key} should not be provided in /{ACTION}"),
                    );
                }
            }
            Ok(())
        });

        match self.extensions.apply(version, ACTION, payload) {
            Some(found) => report.merge(found),
            None => tracing::debug!(%version, "no extension document for this version"),
        }

        fulfillment_ids
    }
}

/// Single finding when the payload cannot be validated at all.
fn presence_gate(payload: &Value) -> Option<ErrorReport> {
    if !is_present(Some(payload)) {
        return Some(ErrorReport::single(ACTION.as_str(), "JSON cannot be empty"));
    }
    let message = payload.get("message");
    let order = message.and_then(|m| m.get("order"));
    if !is_present(payload.get("context")) || !is_present(message) || !is_present(order) {
        return Some(ErrorReport::single(
            "missingFields",
            "/context, /message, /order or /message/order is missing or empty",
        ));
    }
    None
}

fn is_present(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Object(map)) if !map.is_empty())
}

/// Run one section. On abort its partial findings are replaced by a single
/// finding at `section`. Returns whether the section completed.
fn contain(
    section: &str,
    report: &mut ErrorReport,
    run: impl FnOnce(&mut ErrorReport) -> Result<(), SectionError>,
) -> bool {
    tracing::info!(section, "checking section");
    let mut findings = ErrorReport::new();
    match run(&mut findings) {
        Ok(()) => {
            report.merge(findings);
            true
        }
        Err(err) => {
            tracing::error!(section, error = %err, "section aborted");
            report.insert(section, format!("{section} could not be validated: {err}"));
            false
        }
    }
}

fn check_provider(
    order: &Value,
    prior: &PriorState,
    errors: &mut ErrorReport,
) -> Result<(), SectionError> {
    let provider = order.get("provider").unwrap_or(&Value::Null);
    if !provider.is_object() && !provider.is_null() {
        return Err(SectionError::shape("provider", "an object", provider));
    }

    errors.merge(validate_provider_id(
        provider.get("id").and_then(Value::as_str),
        prior.provider_id.as_deref(),
        REQUEST,
        ACTION,
    ));

    let extra = has_only_allowed_keys(provider, PROVIDER_KEYS);
    if !extra.is_empty() {
        errors.insert(
            "provider",
            format!(
                "provider in /{ACTION} may only carry {}, found additional keys {}",
                PROVIDER_KEYS.join(", "),
                extra.join(", ")
            ),
        );
    }
    Ok(())
}

fn check_fulfillments(
    fulfillments: Option<&Value>,
    prior_ids: &IdSet,
    validated: &mut IdSet,
    errors: &mut ErrorReport,
) -> Result<(), SectionError> {
    let fulfillments = match fulfillments {
        None | Some(Value::Null) => {
            errors.insert(
                "fulfillments",
                format!("fulfillments are missing or empty in /{ACTION}"),
            );
            return Ok(());
        }
        Some(value) => value
            .as_array()
            .ok_or_else(|| SectionError::shape("fulfillments", "an array", value))?,
    };
    if fulfillments.is_empty() {
        errors.insert("fulfillments", format!("fulfillments are missing or empty in /{ACTION}"));
        return Ok(());
    }

    for (i, fulfillment) in fulfillments.iter().enumerate() {
        let key = format!("fulfillments[{i}]");
        if !fulfillment.is_object() {
            return Err(SectionError::shape(key, "an object", fulfillment));
        }

        let id = fulfillment.get("id").and_then(Value::as_str);
        match check_reference(id, prior_ids) {
            RefCheck::Missing => {
                errors.insert(
                    key.clone(),
                    format!("fulfillment id is missing at {key} in /{ACTION}"),
                );
            }
            RefCheck::Undeclared if !prior_ids.is_empty() => {
                errors.insert(
                    format!("{key}.id"),
                    format!(
                        "fulfillment id {} at {key} in /{ACTION} was not declared in /on_search",
                        id.unwrap_or_default()
                    ),
                );
            }
            RefCheck::Declared | RefCheck::Undeclared => {
                if let Some(id) = id {
                    validated.insert(id.to_string());
                }
            }
        }

        match nested_str(fulfillment, &["vehicle", "category"]) {
            None => errors.insert(
                format!("{key}.vehicleCategory"),
                format!("vehicle category is missing at {key} in /{ACTION}"),
            ),
            Some(category) if !ON_DEMAND_VEHICLE.contains(&category) => errors.insert(
                format!("{key}.vehicleCategory"),
                format!(
                    "vehicle category should be one of {}, found {category}",
                    ON_DEMAND_VEHICLE.join(", ")
                ),
            ),
            Some(_) => {}
        }

        match non_empty_str(fulfillment, "type") {
            None => errors.insert(
                format!("{key}.type"),
                format!("fulfillment type is missing at {key}"),
            ),
            Some(kind) if kind != FULFILLMENT_TYPE => errors.insert(
                format!("{key}.type"),
                format!("fulfillment type should be {FULFILLMENT_TYPE}, found {kind}"),
            ),
            Some(_) => {}
        }

        errors.merge(validate_stops(fulfillment.get("stops"), i, false, false).errors);

        match fulfillment.get("tags") {
            None | Some(Value::Null) => {
                errors.insert(
                    format!("{key}.tags"),
                    format!("tags are missing at {key} in /{ACTION}"),
                );
            }
            Some(tags) => {
                let found = validate_route_info_tags(tags).errors;
                errors.merge_prefixed(&format!("{key}.tags"), found);
            }
        }

        if let Some(vehicle) = fulfillment.get("vehicle").and_then(Value::as_object) {
            if vehicle.len() > MAX_VEHICLE_KEYS {
                errors.insert(
                    format!("{key}.vehicleKeys"),
                    format!(
                        "vehicle at {key} may carry at most {MAX_VEHICLE_KEYS} keys \
                         (category, variant), found {}",
                        vehicle.len()
                    ),
                );
            }
        }
    }
    Ok(())
}

fn check_items(
    items: Option<&Value>,
    prior: &PriorState,
    fulfillment_ids: &IdSet,
    errors: &mut ErrorReport,
) -> Result<(), SectionError> {
    let items = match items {
        None | Some(Value::Null) => {
            errors.insert("items", format!("items are missing or empty in /{ACTION}"));
            return Ok(());
        }
        Some(value) => value
            .as_array()
            .ok_or_else(|| SectionError::shape("items", "an array", value))?,
    };
    if items.is_empty() {
        errors.insert("items", format!("items are missing or empty in /{ACTION}"));
        return Ok(());
    }

    let payment_ids = IdSet::new();
    for (i, item) in items.iter().enumerate() {
        let key = format!("items[{i}]");
        if !item.is_object() {
            return Err(SectionError::shape(key, "an object", item));
        }

        let id = item.get("id").and_then(Value::as_str);
        match check_reference(id, &prior.item_ids) {
            RefCheck::Declared => {}
            RefCheck::Missing => {
                errors.insert(
                    format!("{key}.id"),
                    format!("item id is missing at {key} in /{ACTION}"),
                );
            }
            RefCheck::Undeclared => errors.insert(
                format!("{key}.id"),
                format!(
                    "item id {} at {key} in /{ACTION} was not declared in /on_search",
                    id.unwrap_or_default()
                ),
            ),
        }

        let price = item.get("price").unwrap_or(&Value::Null);
        if price.get("value").and_then(decimal).is_none() {
            errors.insert(
                format!("{key}.price"),
                format!("price value is missing or not a number at {key}"),
            );
        }
        if nested_str(price, &["currency"]).is_none() {
            errors.insert(
                format!("{key}.price.currency"),
                format!("price currency is missing at {key}"),
            );
        }

        errors.merge(validate_item_ref_ids(
            item,
            ACTION,
            i,
            fulfillment_ids,
            &prior.location_ids,
            &payment_ids,
        ));

        match nested_str(item, &["descriptor", "code"]) {
            None => errors.insert(
                format!("{key}.descriptor.code"),
                format!("descriptor code is missing at {key} in /{ACTION}"),
            ),
            Some(code) if code != ITEM_DESCRIPTOR_CODE => errors.insert(
                format!("{key}.descriptor.code"),
                format!("descriptor code should be {ITEM_DESCRIPTOR_CODE}, found {code}"),
            ),
            Some(_) => {}
        }

        match item.get("tags") {
            None | Some(Value::Null) => {
                errors.insert(
                    format!("{key}.tags"),
                    format!("tags are missing at {key} in /{ACTION}"),
                );
            }
            Some(tags) => {
                errors.merge_prefixed(&format!("{key}.tags"), validate_items_tags(tags).errors)
            }
        }
    }
    Ok(())
}

/// Record this step's state under a new `on_select` sequence.
fn publish(record: &mut TransactionRecord, payload: &Value, fulfillment_ids: &IdSet) {
    let sequence = record.begin_step(ACTION);
    tracing::debug!(
        transaction = %record.transaction_id(),
        sequence,
        fulfillments = fulfillment_ids.len(),
        "publishing step state"
    );
    record.set(ACTION, StateField::Message, payload["message"].clone());
    record.set(ACTION, StateField::Payload, payload.clone());
    record.set(ACTION, StateField::Context, payload["context"].clone());
    record.set_id_set(ACTION, StateField::FulfillmentIds, fulfillment_ids);
}
