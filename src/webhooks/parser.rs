//! `pull_request` payload parser.
//!
//! Every field is optional at this layer. A payload only fails to parse when
//! it is not JSON or a field has the wrong JSON type; a payload that is
//! merely incomplete parses fine and is turned away by the classifier with a
//! 200, matching how GitHub expects hooks to treat events they don't care
//! about.

use serde::Deserialize;
use thiserror::Error;

use crate::types::RepoId;

use super::events::{CommitAuthor, PrAction, PrRef, PullRequestEvent};

/// Error type for webhook parsing failures.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON deserialization failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

// ─── Raw payload structures ───

#[derive(Debug, Default, Deserialize)]
struct RawRepository {
    full_name: Option<String>,
    name: Option<String>,
    owner: Option<RawOwner>,
}

#[derive(Debug, Default, Deserialize)]
struct RawOwner {
    login: Option<String>,
}

impl RawRepository {
    fn repo_id(&self) -> Option<RepoId> {
        if let Some(full_name) = &self.full_name {
            return RepoId::parse(full_name);
        }
        let owner = self.owner.as_ref()?.login.as_deref()?;
        let name = self.name.as_deref()?;
        RepoId::parse(&format!("{owner}/{name}"))
    }
}

#[derive(Debug, Deserialize)]
struct RawPullRequestPayload {
    action: Option<String>,
    #[serde(default)]
    pull_request: Option<RawPullRequest>,
    #[serde(default)]
    repository: Option<RawRepository>,
    #[serde(default)]
    head_commit: Option<RawHeadCommit>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPullRequest {
    #[serde(default)]
    head: Option<RawRef>,
    #[serde(default)]
    base: Option<RawRef>,
    merged: Option<bool>,
    body: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRef {
    #[serde(rename = "ref")]
    ref_name: Option<String>,
    sha: Option<String>,
    #[serde(default)]
    repo: Option<RawRepository>,
}

impl RawRef {
    fn into_pr_ref(self) -> PrRef {
        PrRef {
            repo: self.repo.as_ref().and_then(RawRepository::repo_id),
            branch: self.ref_name,
            sha: self.sha,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawHeadCommit {
    #[serde(default)]
    author: Option<RawCommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct RawCommitAuthor {
    name: Option<String>,
    email: Option<String>,
}

/// Parses a `pull_request` delivery.
pub fn parse_pull_request(payload: &[u8]) -> Result<PullRequestEvent, ParseError> {
    let raw: RawPullRequestPayload = serde_json::from_slice(payload)?;
    let pull_request = raw.pull_request.unwrap_or_default();

    let head_commit_author = raw
        .head_commit
        .and_then(|commit| commit.author)
        .and_then(|author| match (author.name, author.email) {
            (Some(name), Some(email)) => Some(CommitAuthor { name, email }),
            _ => None,
        });

    Ok(PullRequestEvent {
        action: PrAction::parse(raw.action.as_deref()),
        repository: raw.repository.as_ref().and_then(RawRepository::repo_id),
        head: pull_request.head.unwrap_or_default().into_pr_ref(),
        base: pull_request.base.unwrap_or_default().into_pr_ref(),
        merged: pull_request.merged.unwrap_or(false),
        body: pull_request.body,
        head_commit_author,
    })
}
