//! # On-Select Subcommand
//!
//! Validates one recorded `on_select` message. Earlier steps of the
//! transaction are described by a prior-state fixture instead of being
//! replayed:
//!
//! ```yaml
//! item_ids: [I1]
//! location_ids: [L1]
//! fulfillment_ids: [F1]
//! provider_id: P1
//! select_context: { ... }   # context block of the select request
//! ```
//!
//! The outcome is printed as JSON. Exit code is 0 on pass and 1 when
//! findings were recorded.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use mobcheck_core::{Action, ProtocolVersion, TransactionId, ValidationOutcome};
use mobcheck_mobility::OnSelectValidator;
use mobcheck_schema::{ExtensionRegistry, SchemaValidator};
use mobcheck_state::{IdSet, StateField, StateStore};

use crate::config::CheckerConfig;

/// Arguments for the `mobcheck on-select` subcommand.
#[derive(Args, Debug)]
pub struct OnSelectArgs {
    /// The on_select message to validate (JSON).
    #[arg(long, value_name = "FILE")]
    pub payload: PathBuf,

    /// State recorded by earlier steps of the transaction (YAML or JSON).
    #[arg(long, value_name = "FILE")]
    pub prior: Option<PathBuf>,

    /// Message id already used by an earlier response. Repeatable.
    #[arg(long = "seen", value_name = "ID")]
    pub seen: Vec<String>,

    /// Protocol version whose extension documents apply.
    /// Defaults to the configured version.
    #[arg(long)]
    pub protocol_version: Option<String>,
}

/// Identifiers and context recorded by `on_search` and `select`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PriorState {
    pub item_ids: IdSet,
    pub location_ids: IdSet,
    pub fulfillment_ids: IdSet,
    pub provider_id: Option<String>,
    pub select_context: Option<Value>,
}

impl PriorState {
    /// Load a fixture. JSON fixtures parse as YAML too.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read prior state: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse prior state: {}", path.display()))
    }

    /// Record this state in `store` the way the earlier steps would have.
    pub fn seed(&self, store: &StateStore, transaction: &TransactionId) {
        store.with_transaction(transaction, |record| {
            record.set_id_set(Action::OnSearch, StateField::ItemIds, &self.item_ids);
            record.set_id_set(Action::OnSearch, StateField::LocationIds, &self.location_ids);
            record.set_id_set(Action::OnSearch, StateField::FulfillmentIds, &self.fulfillment_ids);
            if let Some(provider_id) = &self.provider_id {
                let provider_id = Value::String(provider_id.clone());
                record.set(Action::Select, StateField::ProviderId, provider_id);
            }
            if let Some(context) = &self.select_context {
                record.set(Action::Select, StateField::Context, context.clone());
            }
        });
    }
}

/// Validate the payload named by `args`.
pub fn check_on_select(args: &OnSelectArgs, config: &CheckerConfig) -> Result<ValidationOutcome> {
    let content = std::fs::read_to_string(&args.payload)
        .with_context(|| format!("failed to read payload: {}", args.payload.display()))?;
    let payload: Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse payload JSON: {}", args.payload.display()))?;

    let version = match &args.protocol_version {
        Some(raw) => ProtocolVersion::new(raw).context("invalid --protocol-version")?,
        None => config.protocol_version()?,
    };

    let schemas = SchemaValidator::new(&config.schema_dir).context("failed to load JSON schemas")?;
    tracing::info!(schema_count = schemas.schema_count(), "loaded schema registry");

    let extensions = if config.extension_dir.is_dir() {
        ExtensionRegistry::load(&config.extension_dir)
            .context("failed to load extension documents")?
    } else {
        tracing::warn!(
            extension_dir = %config.extension_dir.display(),
            "extension directory not found; no version extensions apply"
        );
        ExtensionRegistry::empty()
    };

    let store = StateStore::new();
    if let Some(path) = &args.prior {
        let prior = PriorState::load(path)?;
        let transaction = payload
            .pointer("/context/transaction_id")
            .and_then(Value::as_str)
            .and_then(|id| TransactionId::new(id).ok());
        match transaction {
            Some(transaction) => prior.seed(&store, &transaction),
            None => tracing::warn!("payload has no transaction_id; prior state ignored"),
        }
    }

    let seen: IdSet = args.seen.iter().cloned().collect();
    let outcome = OnSelectValidator::new(&schemas, &extensions, &store)
        .with_domain(&config.domain)
        .validate(&payload, &seen, &version);
    Ok(outcome)
}

/// Execute the on-select subcommand.
///
/// Returns exit code: 0 on pass, 1 on findings.
pub fn run_on_select(args: &OnSelectArgs, config: &CheckerConfig) -> Result<u8> {
    let outcome = check_on_select(args, config)?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(if outcome.is_pass() { 0 } else { 1 })
}
