//! Typed webhook events.
//!
//! Only `pull_request` deliveries are ever acted on. Fields GitHub may omit
//! or null are kept as `Option` here; deciding what a missing field means is
//! the classifier's job, not the parser's.

use std::fmt;

use crate::types::RepoId;

/// The `action` of a `pull_request` delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrAction {
    /// PR was opened.
    Opened,
    /// PR head was updated (new commits pushed).
    Synchronize,
    /// Anything else (`closed`, `labeled`, ...), or no action at all.
    Other(String),
}

impl PrAction {
    pub fn parse(action: Option<&str>) -> Self {
        match action {
            Some("opened") => PrAction::Opened,
            Some("synchronize") => PrAction::Synchronize,
            Some(other) => PrAction::Other(other.to_string()),
            None => PrAction::Other(String::new()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PrAction::Opened => "opened",
            PrAction::Synchronize => "synchronize",
            PrAction::Other(other) => other,
        }
    }
}

impl fmt::Display for PrAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One side (head or base) of a pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrRef {
    /// Repository the branch lives in. `None` when the fork was deleted.
    pub repo: Option<RepoId>,
    pub branch: Option<String>,
    /// Raw sha as delivered; validated when the event is classified.
    pub sha: Option<String>,
}

/// Author of the head commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

impl CommitAuthor {
    /// `Name <email>` with any `"` removed from the name, suitable for
    /// `--author`.
    ///
    /// ```
    /// use deploy_sync::webhooks::CommitAuthor;
    ///
    /// let author = CommitAuthor {
    ///     name: "A \"B".to_string(),
    ///     email: "e@x".to_string(),
    /// };
    /// assert_eq!(author.display(), "A B <e@x>");
    /// ```
    pub fn display(&self) -> String {
        format!("{} <{}>", self.name.replace('"', ""), self.email)
    }
}

/// A parsed `pull_request` delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestEvent {
    pub action: PrAction,
    /// The repository the webhook was delivered for.
    pub repository: Option<RepoId>,
    pub head: PrRef,
    pub base: PrRef,
    pub merged: bool,
    /// PR description. GitHub sends `null` for an empty one.
    pub body: Option<String>,
    pub head_commit_author: Option<CommitAuthor>,
}
