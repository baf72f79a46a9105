//! Shared checkouts of the primary and downstream repositories.
//!
//! Each repository has exactly one checkout on disk, shared by every request.
//! Before anything reads from or mutates a checkout it is brought up to date
//! with the remote's default branch:
//!
//! 1. If the directory does not exist, clone it and set `pull.rebase=false`.
//! 2. Always fetch the default branch, hard-reset onto it, then pull. This
//!    repairs a checkout left dirty or diverged by an earlier failure.
//!
//! Refreshes of one checkout are serialized by a per-repository mutex. The
//! [`SyncedCheckout`] returned by [`Checkouts::ensure_synced`] keeps holding
//! that mutex, so whatever the caller does with the checkout afterwards sees
//! exactly the state the refresh produced. The two repositories have separate
//! mutexes and never wait on each other.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::{git_command, rev_parse, run_git};
use crate::command::{CommandError, CommandRunner};
use crate::config::{Config, RepositoryTarget};
use crate::types::{RepoKind, Sha};

/// Errors from bringing a checkout up to date.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The checkout's parent directory could not be created.
    #[error("failed to prepare {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A git command failed.
    #[error("failed to sync {repo}: {source}")]
    Command {
        repo: String,
        #[source]
        source: CommandError,
    },
}

/// Lifecycle of a shared checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    /// Nothing on disk yet.
    Absent,
    /// On disk, but not known to match the remote (never refreshed by this
    /// process, or the last refresh failed part-way).
    PresentStale,
    /// The last refresh completed and left HEAD at this commit.
    PresentSynced { head: Sha },
}

#[derive(Debug, Default)]
struct SlotState {
    synced_head: Option<Sha>,
}

struct Slot {
    target: RepositoryTarget,
    state: Mutex<SlotState>,
}

/// The two shared checkouts and the locks that guard them.
pub struct Checkouts<R> {
    runner: Arc<R>,
    primary: Slot,
    downstream: Slot,
}

/// Exclusive access to a freshly synced checkout.
///
/// The checkout stays locked until this guard is dropped.
pub struct SyncedCheckout<'a> {
    target: &'a RepositoryTarget,
    head: Sha,
    _guard: MutexGuard<'a, SlotState>,
}

impl SyncedCheckout<'_> {
    pub fn target(&self) -> &RepositoryTarget {
        self.target
    }

    pub fn path(&self) -> &Path {
        &self.target.checkout_path
    }

    /// HEAD right after the refresh.
    pub fn head(&self) -> &Sha {
        &self.head
    }
}

impl<R: CommandRunner> Checkouts<R> {
    pub fn new(runner: Arc<R>, config: &Config) -> Self {
        let slot = |target: &RepositoryTarget| Slot {
            target: target.clone(),
            state: Mutex::new(SlotState::default()),
        };
        Checkouts {
            runner,
            primary: slot(&config.primary),
            downstream: slot(&config.downstream),
        }
    }

    fn slot(&self, kind: RepoKind) -> &Slot {
        match kind {
            RepoKind::Primary => &self.primary,
            RepoKind::Downstream => &self.downstream,
        }
    }

    pub fn target(&self, kind: RepoKind) -> &RepositoryTarget {
        &self.slot(kind).target
    }

    /// Current state of a checkout, or `None` while it is locked by a
    /// refresh or by work on the synced tree.
    pub fn state(&self, kind: RepoKind) -> Option<CheckoutState> {
        let slot = self.slot(kind);
        let state = slot.state.try_lock().ok()?;
        if !slot.target.checkout_path.exists() {
            return Some(CheckoutState::Absent);
        }
        Some(match &state.synced_head {
            Some(head) => CheckoutState::PresentSynced { head: head.clone() },
            None => CheckoutState::PresentStale,
        })
    }

    /// Clones the checkout if needed and refreshes it from the remote.
    ///
    /// Concurrent calls for the same repository run one after another; the
    /// returned guard keeps the next one waiting until it is dropped.
    pub async fn ensure_synced(&self, kind: RepoKind) -> Result<SyncedCheckout<'_>, SyncError> {
        let slot = self.slot(kind);
        let mut state = slot.state.lock().await;
        let target = &slot.target;

        // Anything that fails below leaves the checkout in an unknown state.
        state.synced_head = None;

        let wrap = |source: CommandError| SyncError::Command {
            repo: target.id.full_name(),
            source,
        };

        info!(
            repo = %target.id,
            path = %target.checkout_path.display(),
            "About to clone/pull checkout"
        );

        if !target.checkout_path.exists() {
            self.clone_checkout(target).await?;
        }

        let path = target.checkout_path.as_path();
        let branch = target.default_branch.as_str();
        let remote_branch = format!("origin/{branch}");

        run_git(&*self.runner, path, &["fetch", "origin", branch])
            .await
            .map_err(wrap)?;
        run_git(&*self.runner, path, &["reset", "--hard", &remote_branch])
            .await
            .map_err(wrap)?;
        run_git(&*self.runner, path, &["pull", "origin", branch])
            .await
            .map_err(wrap)?;

        let head = rev_parse(&*self.runner, path, "HEAD").await.map_err(wrap)?;
        debug!(repo = %target.id, head = %head.short(), "Checkout synced");
        state.synced_head = Some(head.clone());

        Ok(SyncedCheckout {
            target,
            head,
            _guard: state,
        })
    }

    /// Refreshes both checkouts. Used at startup.
    pub async fn sync_all(&self) -> Result<(), SyncError> {
        for kind in RepoKind::ALL {
            self.ensure_synced(kind).await?;
        }
        Ok(())
    }

    async fn clone_checkout(&self, target: &RepositoryTarget) -> Result<(), SyncError> {
        let path = &target.checkout_path;
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).map_err(|source| SyncError::Io {
            path: parent.to_path_buf(),
            source,
        })?;

        let wrap = |source: CommandError| SyncError::Command {
            repo: target.id.full_name(),
            source,
        };

        let clone = git_command(parent)
            .arg("clone")
            .arg(target.remote_url.as_str())
            .path_arg(path);
        if let Err(e) = self.runner.run(&clone).await {
            warn!(repo = %target.id, error = %e, "Clone failed");
            return Err(wrap(e));
        }

        // Silences git's hint about divergent branches on every pull.
        run_git(&*self.runner, path, &["config", "pull.rebase", "false"])
            .await
            .map_err(wrap)?;

        Ok(())
    }
}
