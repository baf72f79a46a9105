//! Newtype wrappers for domain identifiers.
//!
//! These types keep repository names and commit shas from being mixed up with
//! arbitrary strings, and make the argument lists handed to git harder to
//! get wrong.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error returned when a string is not a plausible commit sha.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid sha: {0:?} (expected 4-40 hex characters)")]
pub struct InvalidSha(pub String);

/// A git commit sha (abbreviated or full hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sha(String);

impl Sha {
    /// Parses a sha, accepting 4 to 40 hex characters.
    ///
    /// Rejecting everything else also guarantees the value can never be read
    /// as an option by git (no leading `-`).
    ///
    /// ```
    /// use deploy_sync::types::Sha;
    ///
    /// assert!(Sha::parse("deadbeef").is_ok());
    /// assert!(Sha::parse("--upload-pack=x").is_err());
    /// ```
    pub fn parse(s: impl Into<String>) -> Result<Self, InvalidSha> {
        let s = s.into();
        let trimmed = s.trim();
        let valid = (4..=40).contains(&trimmed.len())
            && trimmed.chars().all(|c| c.is_ascii_hexdigit());
        if valid {
            Ok(Sha(trimmed.to_ascii_lowercase()))
        } else {
            Err(InvalidSha(s))
        }
    }

    /// Returns the SHA as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a short (7-character) version of the SHA for display.
    pub fn short(&self) -> &str {
        self.0.get(..7).unwrap_or(&self.0)
    }
}

impl fmt::Display for Sha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A repository identifier in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        RepoId {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Parses `owner/name`. Both halves must be non-empty and there must be
    /// exactly one slash.
    pub fn parse(full_name: &str) -> Option<Self> {
        let (owner, repo) = full_name.trim().split_once('/')?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some(RepoId::new(owner, repo))
    }

    /// Returns `owner/name`.
    pub fn full_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Which of the two configured repositories an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoKind {
    /// The upstream repository whose shas get pinned downstream.
    Primary,
    /// The repository that pins the primary's sha.
    Downstream,
}

impl RepoKind {
    pub const ALL: [RepoKind; 2] = [RepoKind::Primary, RepoKind::Downstream];
}

impl fmt::Display for RepoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoKind::Primary => write!(f, "primary"),
            RepoKind::Downstream => write!(f, "downstream"),
        }
    }
}
