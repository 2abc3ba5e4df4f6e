//! Integration test: the `on_select` validator over the shipped TRV schemas
//! and 2.0.1 extension documents.
//!
//! Prior steps are simulated by seeding the state store the way `on_search`
//! and `select` would leave it.

use std::path::PathBuf;
use std::sync::OnceLock;

use mobcheck_core::{Action, ErrorReport, ProtocolVersion, TransactionId, ValidationOutcome};
use mobcheck_mobility::OnSelectValidator;
use mobcheck_schema::{ExtensionRegistry, SchemaValidator};
use mobcheck_state::{IdSet, StateField, StateStore};
use serde_json::{json, Value};

/// Find the repository root.
fn repo_root() -> PathBuf {
    let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    dir.pop(); // crates/
    dir.pop(); // repo root
    dir
}

fn engines() -> &'static (SchemaValidator, ExtensionRegistry) {
    static ENGINES: OnceLock<(SchemaValidator, ExtensionRegistry)> = OnceLock::new();
    ENGINES.get_or_init(|| {
        let root = repo_root();
        let schemas = SchemaValidator::new(root.join("schemas")).expect("load schemas/");
        let extensions =
            ExtensionRegistry::load(root.join("extensions")).expect("load extensions/");
        (schemas, extensions)
    })
}

fn fixture() -> Value {
    let path = repo_root().join("fixtures/trv/on_select.json");
    let content = std::fs::read_to_string(&path).expect("read on_select fixture");
    serde_json::from_str(&content).expect("parse on_select fixture")
}

fn v201() -> ProtocolVersion {
    ProtocolVersion::new("2.0.1").unwrap()
}

fn ids(values: &[&str]) -> IdSet {
    values.iter().map(|s| s.to_string()).collect()
}

fn transaction_of(payload: &Value) -> TransactionId {
    TransactionId::new(payload["context"]["transaction_id"].as_str().unwrap()).unwrap()
}

/// Record what `on_search` and `select` leave behind for `payload`'s
/// transaction.
fn seed(
    store: &StateStore,
    payload: &Value,
    items: &[&str],
    locations: &[&str],
    fulfillments: &[&str],
) {
    let mut select_context = payload["context"].clone();
    select_context["action"] = json!("select");
    select_context["timestamp"] = json!("2024-05-01T10:00:00.000Z");
    store.with_transaction(&transaction_of(payload), |record| {
        record.set_id_set(Action::OnSearch, StateField::ItemIds, &ids(items));
        record.set_id_set(Action::OnSearch, StateField::LocationIds, &ids(locations));
        record.set_id_set(Action::OnSearch, StateField::FulfillmentIds, &ids(fulfillments));
        record.set(Action::Select, StateField::ProviderId, json!("P1"));
        record.set(Action::Select, StateField::Context, select_context);
    });
}

fn seeded(payload: &Value) -> StateStore {
    let store = StateStore::new();
    seed(&store, payload, &["I1"], &["L1"], &["F1"]);
    store
}

fn run(store: &StateStore, payload: &Value, version: &ProtocolVersion) -> ValidationOutcome {
    let (schemas, extensions) = engines();
    OnSelectValidator::new(schemas, extensions, store).validate(payload, &IdSet::new(), version)
}

fn findings(store: &StateStore, payload: &Value) -> ErrorReport {
    run(store, payload, &v201()).into_report()
}

#[test]
fn test_shipped_documents_are_registered() {
    let (schemas, extensions) = engines();
    assert!(schemas.registered().contains(&("TRV", Action::OnSelect)));
    assert!(extensions.contains(&v201(), Action::OnSelect));
}

#[test]
fn test_minimal_valid_payload_passes() {
    let payload = fixture();
    let outcome = run(&seeded(&payload), &payload, &v201());
    assert!(outcome.is_pass(), "unexpected findings:\n{}", outcome.into_report());
}

#[test]
fn test_presence_gate_short_circuits() {
    let store = StateStore::new();
    let report = findings(&store, &json!(null));
    assert_eq!(report.paths().collect::<Vec<_>>(), vec!["on_select"]);

    let mut payload = fixture();
    payload.as_object_mut().unwrap().remove("message");
    let report = findings(&store, &payload);
    assert_eq!(report.paths().collect::<Vec<_>>(), vec!["missingFields"]);
    assert_eq!(report.message_count(), 1);
    assert_eq!(store.transaction_count(), 0);
}

#[test]
fn test_fulfillment_not_declared_by_on_search() {
    let payload = {
        let mut p = fixture();
        p["message"]["order"]["fulfillments"][0]["id"] = json!("f2");
        p
    };
    let store = StateStore::new();
    seed(&store, &payload, &["item1"], &["loc1"], &["f1"]);
    let report = findings(&store, &payload);
    let fulfillment_paths: Vec<&str> = report
        .paths()
        .filter(|p| p.starts_with("fulfillments"))
        .collect();
    assert_eq!(fulfillment_paths, vec!["fulfillments[0].id"]);
    assert!(report.get("fulfillments[0].id").unwrap()[0].contains("f2"));
}

#[test]
fn test_missing_fulfillment_id_is_distinct_from_undeclared() {
    let mut payload = fixture();
    payload["message"]["order"]["fulfillments"][0]
        .as_object_mut()
        .unwrap()
        .remove("id");
    let report = findings(&seeded(&payload), &payload);
    assert!(report.get("fulfillments[0]").unwrap()[0].contains("missing"));
    assert!(!report.contains_path("fulfillments[0].id"));
    // Structural schema also flags it, under the full payload path.
    assert!(report.contains_path("message.order.fulfillments[0]"));
}

#[test]
fn test_item_not_declared_by_on_search() {
    let mut payload = fixture();
    payload["message"]["order"]["items"][0]["id"] = json!("I9");
    let report = findings(&seeded(&payload), &payload);
    assert!(report.get("items[0].id").unwrap()[0].contains("not declared"));
}

#[test]
fn test_missing_item_id_is_distinct_from_undeclared() {
    let mut payload = fixture();
    payload["message"]["order"]["items"][0]
        .as_object_mut()
        .unwrap()
        .remove("id");
    let missing = findings(&seeded(&payload), &payload);
    let missing = &missing.get("items[0].id").unwrap()[0];
    assert!(missing.contains("missing"), "{missing}");
    assert!(!missing.contains("not declared"));

    payload["message"]["order"]["items"][0]["id"] = json!("I9");
    let undeclared = findings(&seeded(&payload), &payload);
    assert_ne!(&undeclared.get("items[0].id").unwrap()[0], missing);
}

#[test]
fn test_missing_item_price_value() {
    let mut payload = fixture();
    payload["message"]["order"]["items"][0]["price"]
        .as_object_mut()
        .unwrap()
        .remove("value");
    let report = findings(&seeded(&payload), &payload);
    assert!(report.get("items[0].price").unwrap()[0].contains("price value is missing"));
    assert!(!report.contains_path("items[0].price.currency"));

    payload["message"]["order"]["items"][0]["price"]["value"] = json!("1.3e2");
    let report = findings(&seeded(&payload), &payload);
    assert!(report.contains_path("items[0].price"));
}

#[test]
fn test_literal_mismatches() {
    let mut payload = fixture();
    payload["message"]["order"]["fulfillments"][0]["vehicle"]["category"] = json!("BUS");
    payload["message"]["order"]["fulfillments"][0]["type"] = json!("PICKUP");
    payload["message"]["order"]["items"][0]["descriptor"]["code"] = json!("TRIP");
    let report = findings(&seeded(&payload), &payload);
    assert!(report.contains_path("fulfillments[0].vehicleCategory"));
    assert!(report.contains_path("fulfillments[0].type"));
    assert!(report.contains_path("items[0].descriptor.code"));
}

#[test]
fn test_vehicle_keys_are_closed() {
    let mut payload = fixture();
    payload["message"]["order"]["fulfillments"][0]["vehicle"]["registration"] = json!("KA01AB1234");
    let report = findings(&seeded(&payload), &payload);
    assert!(report.contains_path("fulfillments[0].vehicleKeys"));
}

#[test]
fn test_tag_findings_are_namespaced_per_entity() {
    let mut payload = fixture();
    payload["message"]["order"]["fulfillments"][0]["tags"][0]["list"][0]["value"] = json!("");
    payload["message"]["order"]["items"][0]["tags"][0]["list"][0]["value"] = json!("thirty");
    let report = findings(&seeded(&payload), &payload);
    assert!(report.contains_path("fulfillments[0].tags[0].list[0].value"));
    assert!(report.contains_path("items[0].tags[0].list[0].value"));
}

#[test]
fn test_forbidden_fields_are_reported() {
    let mut payload = fixture();
    payload["message"]["order"]["payments"] = json!([{"id": "PAY1"}]);
    payload["message"]["order"]["cancellation_terms"] = json!([]);
    let report = findings(&seeded(&payload), &payload);
    assert!(report.contains_path("payments"));
    assert!(report.contains_path("cancellation_terms"));
}

#[test]
fn test_extensions_follow_the_requested_version() {
    let mut payload = fixture();
    payload["context"].as_object_mut().unwrap().remove("location");

    let report = findings(&seeded(&payload), &payload);
    assert!(report.contains_path("context"));

    let older = ProtocolVersion::new("2.0.0").unwrap();
    let outcome = run(&seeded(&payload), &payload, &older);
    assert!(outcome.is_pass(), "{}", outcome.into_report());
}

#[test]
fn test_envelope_is_checked_against_select() {
    let mut payload = fixture();
    payload["context"]["timestamp"] = json!("2024-05-01T09:00:00.000Z");
    payload["context"]["bpp_id"] = json!("other.bpp.example.com");
    let report = findings(&seeded(&payload), &payload);
    assert!(report.contains_path("context.timestamp"));
    assert!(report.contains_path("context.bpp_id"));
}

#[test]
fn test_reused_message_id_is_a_duplicate() {
    let payload = fixture();
    let store = seeded(&payload);
    let seen = ids(&[payload["context"]["message_id"].as_str().unwrap()]);
    let (schemas, extensions) = engines();
    let outcome =
        OnSelectValidator::new(schemas, extensions, &store).validate(&payload, &seen, &v201());
    assert!(outcome.into_report().contains_path("context.message_id"));
}

#[test]
fn test_validation_is_idempotent() {
    let mut payload = fixture();
    payload["message"]["order"]["fulfillments"][0]["id"] = json!("F7");
    payload["message"]["order"]["quote"]["price"]["value"] = json!("999");
    let store = seeded(&payload);
    let first = run(&store, &payload, &v201());
    let second = run(&store, &payload, &v201());
    assert_eq!(first, second);
    assert!(!first.is_pass());
}

#[test]
fn test_state_is_published_per_step_occurrence() {
    let payload = fixture();
    let store = seeded(&payload);
    let txn = transaction_of(&payload);

    run(&store, &payload, &v201());
    run(&store, &payload, &v201());

    let record = store.snapshot(&txn).unwrap();
    assert_eq!(record.current_sequence(Action::OnSelect), Some(2));
    assert_eq!(
        record.id_set(Action::OnSelect, StateField::FulfillmentIds).unwrap(),
        Some(ids(&["F1"]))
    );
    assert_eq!(record.get_at(Action::OnSelect, 1, StateField::Context), Some(&payload["context"]));
    assert_eq!(record.get(Action::OnSelect, StateField::Message), Some(&payload["message"]));
    // Prior-step state is untouched.
    assert_eq!(
        record.id_set(Action::OnSearch, StateField::FulfillmentIds).unwrap(),
        Some(ids(&["F1"]))
    );
}

#[test]
fn test_state_is_published_even_with_findings() {
    let mut payload = fixture();
    payload["message"]["order"]["fulfillments"][0]["id"] = json!("F2");
    let store = seeded(&payload);
    assert!(!run(&store, &payload, &v201()).is_pass());

    let record = store.snapshot(&transaction_of(&payload)).unwrap();
    // F2 was rejected, so nothing was validated.
    assert_eq!(
        record.id_set(Action::OnSelect, StateField::FulfillmentIds).unwrap(),
        Some(IdSet::new())
    );
}

#[test]
fn test_concurrent_transactions_do_not_share_state() {
    let store = StateStore::new();
    let payloads: Vec<Value> = (0..8)
        .map(|n| {
            let mut p = fixture();
            let fulfillment = format!("F{n}");
            p["context"]["transaction_id"] = json!(format!("T{n}"));
            p["message"]["order"]["fulfillments"][0]["id"] = json!(fulfillment);
            p["message"]["order"]["items"][0]["fulfillment_ids"] = json!([fulfillment]);
            seed(&store, &p, &["I1"], &["L1"], &[fulfillment.as_str()]);
            p
        })
        .collect();

    std::thread::scope(|scope| {
        for payload in &payloads {
            let store = &store;
            scope.spawn(move || {
                let outcome = run(store, payload, &v201());
                assert!(outcome.is_pass(), "{}", outcome.into_report());
            });
        }
    });

    for (n, payload) in payloads.iter().enumerate() {
        let record = store.snapshot(&transaction_of(payload)).unwrap();
        assert_eq!(
            record.id_set(Action::OnSelect, StateField::FulfillmentIds).unwrap(),
            Some(ids(&[format!("F{n}").as_str()]))
        );
    }
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Field edits that each break one rule.
    const MUTATIONS: [fn(&mut Value); 8] = [
        |p| p["message"]["order"]["fulfillments"][0]["id"] = json!("F9"),
        |p| p["message"]["order"]["items"][0]["id"] = json!("I9"),
        |p| p["message"]["order"]["items"][0]["price"]["currency"] = Value::Null,
        |p| p["message"]["order"]["quote"]["ttl"] = json!("soon"),
        |p| p["message"]["order"]["payments"] = json!([]),
        |p| p["message"]["order"]["fulfillments"] = json!("F1"),
        |p| p["message"]["order"]["provider"]["rating"] = json!("4"),
        |p| p["context"]["timestamp"] = json!("yesterday"),
    ];

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Same payload, same prior state: same report, and findings only
        /// when something was broken.
        #[test]
        fn validation_is_deterministic(
            picked in prop::sample::subsequence((0..8usize).collect::<Vec<_>>(), 0..=8)
        ) {
            let mut payload = fixture();
            for index in &picked {
                MUTATIONS[*index](&mut payload);
            }
            let store = seeded(&payload);
            let first = run(&store, &payload, &v201());
            let second = run(&store, &payload, &v201());
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.is_pass(), picked.is_empty());
        }
    }
}
