//! Reverting a single commit on request.
//!
//! The shared checkout is never modified. It is refreshed, cloned into a
//! scratch directory under its lock, and the revert is committed and pushed
//! from the scratch clone. The scratch directory is a [`TempDir`], so it is
//! removed however the workflow ends.
//!
//! Commits in the downstream repository whose subject starts with
//! `<primary>@` were made by the bump tool. Reverting one of those downstream
//! would only unpin the primary; the offending change has to be reverted in
//! the primary repository instead, so such requests are refused before
//! anything is reverted.

use serde::Deserialize;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{info, warn};

use crate::command::{CommandError, CommandRunner};
use crate::git::{SyncError, commit_subject, git_command, git_commit_command, rev_parse, run_git};
use crate::types::{InvalidSha, RepoId, RepoKind, Sha};

use super::{ActionOutcome, Engine};

/// Body of a `POST /api/revert` request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RevertRequest {
    /// Short or full name of one of the two repositories.
    pub repo: String,
    pub sha: String,
    /// Who asked; credited as co-author of the revert.
    pub name: String,
}

#[derive(Debug, Error)]
pub enum RevertError {
    #[error("Unknown repository {0:?}")]
    UnknownRepository(String),

    #[error(transparent)]
    InvalidSha(#[from] InvalidSha),

    #[error("A requester name is required")]
    MissingRequester,

    /// The commit is a bump of the primary and must be reverted there.
    #[error("{sha} cannot be reverted here; revert it in {primary} instead")]
    Guard { sha: Sha, primary: RepoId },

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("failed to create scratch directory: {0}")]
    Scratch(#[source] std::io::Error),
}

impl RevertError {
    /// Whether the caller asked for something that can never work, as
    /// opposed to the workflow failing while carrying it out.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            RevertError::UnknownRepository(_)
                | RevertError::InvalidSha(_)
                | RevertError::MissingRequester
                | RevertError::Guard { .. }
        )
    }
}

/// The three paragraphs of a revert commit message.
pub fn revert_message(subject: &str, sha: &Sha, requester: &str) -> [String; 3] {
    [
        format!("Revert \"{subject}\""),
        format!("This reverts commit {sha}."),
        format!("Co-authored-by: {requester}"),
    ]
}

/// Whether `subject` is a downstream commit produced by bumping one of
/// `upstreams`.
pub fn is_upstream_bump<'a>(subject: &str, upstreams: impl IntoIterator<Item = &'a RepoId>) -> bool {
    upstreams
        .into_iter()
        .any(|repo| subject.starts_with(&format!("{}@", repo.full_name())))
}

impl<R: CommandRunner> Engine<R> {
    /// Reverts `request.sha` in the requested repository and pushes the
    /// result to its default branch.
    pub async fn revert_commit(&self, request: &RevertRequest) -> Result<ActionOutcome, RevertError> {
        let config = self.config();
        let kind = config
            .resolve_repo(&request.repo)
            .ok_or_else(|| RevertError::UnknownRepository(request.repo.clone()))?;
        let sha = Sha::parse(request.sha.as_str())?;
        let requester = request.name.trim();
        if requester.is_empty() {
            return Err(RevertError::MissingRequester);
        }

        let target = config.target(kind);
        info!(%requester, %sha, repo = %target.id, "Revert requested");

        let scratch = tempfile::Builder::new()
            .prefix("deploy-sync-revert-")
            .tempdir()
            .map_err(RevertError::Scratch)?;
        self.clone_into_scratch(kind, &scratch).await?;
        let work = scratch.path();

        let subject = commit_subject(self.runner(), work, &sha).await?.replace('"', "");
        let upstreams = [&config.upstream, &config.primary.id];
        if kind == RepoKind::Downstream && is_upstream_bump(&subject, upstreams) {
            warn!(%sha, %subject, "Refusing to revert a bump commit downstream");
            return Err(RevertError::Guard {
                sha,
                primary: config.primary.id.clone(),
            });
        }

        run_git(self.runner(), work, &["revert", "--no-commit", sha.as_str()]).await?;

        let mut commit = git_commit_command(work, &config.committer).arg("commit");
        for paragraph in revert_message(&subject, &sha, requester) {
            commit = commit.arg("-m").arg(paragraph);
        }
        self.runner().run(&commit).await?;

        // The scratch clone's origin is the local checkout; push to the real remote.
        let mut push = git_command(work)
            .arg("push")
            .arg(target.remote_url.as_str())
            .arg(format!("HEAD:refs/heads/{}", target.default_branch));
        if config.dry_run {
            push = push.arg("--dry-run");
        }
        self.runner().run(&push).await?;

        let revert_sha = rev_parse(self.runner(), work, "HEAD").await?;
        info!(%sha, revert_sha = %revert_sha, repo = %target.id, dry_run = config.dry_run, "Revert pushed");

        Ok(ActionOutcome::succeeded(format!("{sha} reverted.")).with_revert_sha(revert_sha))
    }

    /// Refreshes the shared checkout and clones it into `scratch`, holding
    /// the checkout lock only for as long as that takes.
    async fn clone_into_scratch(&self, kind: RepoKind, scratch: &TempDir) -> Result<(), RevertError> {
        let synced = self.checkouts().ensure_synced(kind).await?;
        let clone = git_command(scratch.path())
            .arg("clone")
            .path_arg(synced.path())
            .path_arg(scratch.path());
        self.runner().run(&clone).await?;
        drop(synced);
        Ok(())
    }
}
