//! # mobcheck-cli — Command-Line Conformance Checker
//!
//! Provides the `mobcheck` command-line interface over the step
//! validators.
//!
//! ## Subcommands
//!
//! - `mobcheck on-select` — Validate a recorded `on_select` message.
//!
//! ```bash
//! mobcheck on-select --payload fixtures/trv/on_select.json \
//!     --prior fixtures/trv/prior.yaml
//! mobcheck -v --config mobcheck.yaml on-select --payload msg.json --seen M0
//! ```
//!
//! ## Exit Codes
//!
//! 0 when the message passes, 1 when findings were recorded, 2 when the
//! check could not run (unreadable input, missing schemas, bad config).

pub mod check;
pub mod config;

use std::path::{Path, PathBuf};

/// Walk up from `start` to the first directory holding a `schemas/`
/// directory.
pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut dir = start;
    loop {
        if dir.join("schemas").is_dir() {
            return Some(dir.to_path_buf());
        }
        dir = dir.parent()?;
    }
}
