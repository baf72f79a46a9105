//! The mutating workflows: bumping the pinned version downstream and
//! reverting a commit in either repository.
//!
//! Both run through an [`Engine`], which owns the shared checkouts and the
//! command runner. The engine is created once at startup and shared by every
//! request.

pub mod bump;
pub mod revert;

use std::sync::Arc;

use serde::Serialize;

use crate::command::CommandRunner;
use crate::config::Config;
use crate::git::Checkouts;
use crate::types::Sha;

pub use bump::{BumpOutcome, bump_command};
pub use revert::{RevertError, RevertRequest, is_upstream_bump, revert_message};

/// What a request achieved, as reported back to the caller.
///
/// Serializes to `{"reason": ...}`, plus `"revert_sha"` after a revert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub reason: String,

    #[serde(skip)]
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub revert_sha: Option<Sha>,
}

impl ActionOutcome {
    pub fn succeeded(reason: impl Into<String>) -> Self {
        ActionOutcome {
            reason: reason.into(),
            success: true,
            revert_sha: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        ActionOutcome {
            reason: reason.into(),
            success: false,
            revert_sha: None,
        }
    }

    pub fn with_revert_sha(self, sha: Sha) -> Self {
        ActionOutcome {
            revert_sha: Some(sha),
            ..self
        }
    }
}

/// Runs workflows against the two shared checkouts.
pub struct Engine<R> {
    config: Arc<Config>,
    runner: Arc<R>,
    checkouts: Checkouts<R>,
}

impl<R: CommandRunner> Engine<R> {
    pub fn new(config: Arc<Config>, runner: Arc<R>) -> Self {
        let checkouts = Checkouts::new(runner.clone(), &config);
        Engine {
            config,
            runner,
            checkouts,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn checkouts(&self) -> &Checkouts<R> {
        &self.checkouts
    }
}
