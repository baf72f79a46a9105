//! Version bump: pin the downstream repository to a new primary sha.
//!
//! The actual edit, commit and push are done by an external tool that lives
//! with the deployment (`BUMP_TOOL_PATH`). It is invoked inside the
//! downstream checkout as
//!
//! ```text
//! <bump tool> <head sha> [--author "<name> <email>"]
//! ```
//!
//! with the committer identity and `DRY_RUN` in its environment. The
//! downstream checkout stays locked from the refresh until the tool exits.

use std::path::Path;

use tracing::{info, warn};

use crate::command::{CommandRunner, CommandSpec};
use crate::types::{RepoKind, Sha};
use crate::webhooks::CommitAuthor;

use super::{ActionOutcome, Engine};

/// Result of a bump attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpOutcome {
    pub updated: bool,
    pub reason: String,
}

impl From<BumpOutcome> for ActionOutcome {
    fn from(outcome: BumpOutcome) -> Self {
        if outcome.updated {
            ActionOutcome::succeeded(outcome.reason)
        } else {
            ActionOutcome::failed(outcome.reason)
        }
    }
}

/// Builds the bump tool invocation. `--author` is left out entirely when
/// there is no author.
pub fn bump_command(
    tool: &Path,
    workdir: &Path,
    head_sha: &Sha,
    author: Option<&CommitAuthor>,
) -> CommandSpec {
    let spec = CommandSpec::new(tool.to_string_lossy(), workdir).arg(head_sha.as_str());
    match author {
        Some(author) => spec.arg("--author").arg(author.display()),
        None => spec,
    }
}

impl<R: CommandRunner> Engine<R> {
    /// Pins the downstream repository to `head_sha` of the primary.
    ///
    /// Never fails outright: every failure becomes `updated = false` with the
    /// reason attached, which the webhook turns into a 400.
    pub async fn bump_version(
        &self,
        branch: &str,
        head_sha: &Sha,
        author: Option<&CommitAuthor>,
    ) -> BumpOutcome {
        let config = self.config();
        let primary = &config.primary.id;

        let synced = match self.checkouts().ensure_synced(RepoKind::Downstream).await {
            Ok(synced) => synced,
            Err(e) => {
                warn!(error = %e, "Could not sync downstream checkout for bump");
                return BumpOutcome {
                    updated: false,
                    reason: format!("Failed to bump {primary}@{head_sha}: {e}"),
                };
            }
        };
        let downstream = synced.target();

        info!(
            %branch,
            sha = %head_sha,
            downstream = %downstream.id,
            from = %synced.head().short(),
            "Bumping downstream"
        );

        let spec = bump_command(&config.bump_tool, synced.path(), head_sha, author)
            .env("GIT_AUTHOR_NAME", config.committer.name.as_str())
            .env("GIT_COMMITTER_NAME", config.committer.name.as_str())
            .env("GIT_COMMITTER_EMAIL", config.committer.email.as_str())
            .env("EMAIL", config.committer.email.as_str())
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("DRY_RUN", if config.dry_run { "1" } else { "0" });

        match self.runner().run(&spec).await {
            Ok(_) => {
                let reason = format!(
                    "{} is now pinned to {primary}@{head_sha} (from {branch}).",
                    downstream.id
                );
                info!(downstream = %downstream.id, sha = %head_sha, "Bump succeeded");
                BumpOutcome {
                    updated: true,
                    reason,
                }
            }
            Err(e) => {
                warn!(error = %e, "Bump failed");
                BumpOutcome {
                    updated: false,
                    reason: format!("Failed to bump {primary}@{head_sha}: {e}"),
                }
            }
        }
    }
}
