//! # Protocol Actions — Single Source of Truth
//!
//! Defines the `Action` enum naming every step of a Beckn-style
//! transaction. Requests (`select`) and their asynchronous responses
//! (`on_select`) are distinct variants. Every `match` on `Action` is
//! exhaustive, so adding a step forces every consumer to handle it.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::MobcheckError;

/// A single message exchange in a transaction.
///
/// | Request | Response |
/// |---------|----------|
/// | `search` | `on_search` |
/// | `select` | `on_select` |
/// | `init` | `on_init` |
/// | `confirm` | `on_confirm` |
/// | `status` | `on_status` |
/// | `update` | `on_update` |
/// | `cancel` | `on_cancel` |
/// | `track` | `on_track` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Search,
    OnSearch,
    Select,
    OnSelect,
    Init,
    OnInit,
    Confirm,
    OnConfirm,
    Status,
    OnStatus,
    Update,
    OnUpdate,
    Cancel,
    OnCancel,
    Track,
    OnTrack,
}

impl Action {
    /// Returns all actions in transaction order.
    pub fn all() -> &'static [Action] {
        &[
            Self::Search,
            Self::OnSearch,
            Self::Select,
            Self::OnSelect,
            Self::Init,
            Self::OnInit,
            Self::Confirm,
            Self::OnConfirm,
            Self::Status,
            Self::OnStatus,
            Self::Update,
            Self::OnUpdate,
            Self::Cancel,
            Self::OnCancel,
            Self::Track,
            Self::OnTrack,
        ]
    }

    /// Returns the wire name used in `context.action`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::OnSearch => "on_search",
            Self::Select => "select",
            Self::OnSelect => "on_select",
            Self::Init => "init",
            Self::OnInit => "on_init",
            Self::Confirm => "confirm",
            Self::OnConfirm => "on_confirm",
            Self::Status => "status",
            Self::OnStatus => "on_status",
            Self::Update => "update",
            Self::OnUpdate => "on_update",
            Self::Cancel => "cancel",
            Self::OnCancel => "on_cancel",
            Self::Track => "track",
            Self::OnTrack => "on_track",
        }
    }

    /// True for the asynchronous `on_*` callbacks.
    pub fn is_response(&self) -> bool {
        self.paired_request().is_some()
    }

    /// The request a response answers. `None` for requests.
    pub const fn paired_request(&self) -> Option<Action> {
        match self {
            Self::OnSearch => Some(Self::Search),
            Self::OnSelect => Some(Self::Select),
            Self::OnInit => Some(Self::Init),
            Self::OnConfirm => Some(Self::Confirm),
            Self::OnStatus => Some(Self::Status),
            Self::OnUpdate => Some(Self::Update),
            Self::OnCancel => Some(Self::Cancel),
            Self::OnTrack => Some(Self::Track),
            Self::Search
            | Self::Select
            | Self::Init
            | Self::Confirm
            | Self::Status
            | Self::Update
            | Self::Cancel
            | Self::Track => None,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = MobcheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| MobcheckError::UnknownAction(s.to_string()))
    }
}
