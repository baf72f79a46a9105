//! Decides whether a `pull_request` event should trigger a version bump.
//!
//! Rules are checked in order and the first one that matches wins:
//!
//! 1. Only `opened` and `synchronize` are acted on.
//! 2. Outside trusted mode, the delivery must come from the upstream repo.
//! 3. Outside trusted mode, head and base must both live in the upstream repo
//!    (no forks).
//! 4. Outside trusted mode, merged PRs are ignored.
//! 5. Trusted mode is refused in staging.
//! 6. The PR body must contain the deploy marker.
//! 7. The head sha must be present and well formed.
//!
//! Every ignore is answered with 200. GitHub marks a hook red on any other
//! status, which should only happen when something actually broke.

use std::fmt;

use crate::config::{Config, Stage};
use crate::types::{RepoId, Sha};

use super::events::{PrAction, PullRequestEvent};

/// The parts of [`Config`] the classifier looks at.
#[derive(Debug, Clone)]
pub struct ClassifyPolicy {
    pub upstream: RepoId,
    pub deploy_marker: String,
    pub trusted_mode: bool,
    pub stage: Stage,
}

impl ClassifyPolicy {
    pub fn from_config(config: &Config) -> Self {
        ClassifyPolicy {
            upstream: config.upstream.clone(),
            deploy_marker: config.deploy_marker.clone(),
            trusted_mode: config.trusted_mode,
            stage: config.stage,
        }
    }
}

/// Why an event was not acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    UnsupportedAction,
    UnknownRepository,
    InvalidHeadOrBase,
    AlreadyMerged,
    UnsupportedStage,
    MarkerNotFound,
    NotRelevant,
}

impl IgnoreReason {
    /// The reason string sent back to GitHub.
    pub fn message(self) -> &'static str {
        match self {
            IgnoreReason::UnsupportedAction => "Unsupported action for pull_request event.",
            IgnoreReason::UnknownRepository => "Unknown repository",
            IgnoreReason::InvalidHeadOrBase => "Invalid head or base repos.",
            IgnoreReason::AlreadyMerged => "Pull request is already merged.",
            IgnoreReason::UnsupportedStage => "We do not support this for staging.",
            IgnoreReason::MarkerNotFound => "Deploy marker not found.",
            IgnoreReason::NotRelevant => "Commit not relevant for deploy sync.",
        }
    }
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionDecision {
    Ignore(IgnoreReason),
    Proceed { head_sha: Sha, head_branch: String },
}

pub fn classify(event: &PullRequestEvent, policy: &ClassifyPolicy) -> ActionDecision {
    use ActionDecision::Ignore;

    if !matches!(event.action, PrAction::Opened | PrAction::Synchronize) {
        return Ignore(IgnoreReason::UnsupportedAction);
    }

    let is_upstream = |repo: &Option<RepoId>| repo.as_ref() == Some(&policy.upstream);

    if !policy.trusted_mode {
        if !is_upstream(&event.repository) {
            return Ignore(IgnoreReason::UnknownRepository);
        }
        if !is_upstream(&event.head.repo) || !is_upstream(&event.base.repo) {
            return Ignore(IgnoreReason::InvalidHeadOrBase);
        }
        if event.merged {
            return Ignore(IgnoreReason::AlreadyMerged);
        }
    } else if policy.stage == Stage::Staging {
        return Ignore(IgnoreReason::UnsupportedStage);
    }

    let body = event.body.as_deref().unwrap_or_default();
    if !body.contains(policy.deploy_marker.as_str()) {
        return Ignore(IgnoreReason::MarkerNotFound);
    }

    match event.head.sha.as_deref().map(Sha::parse) {
        Some(Ok(head_sha)) => ActionDecision::Proceed {
            head_sha,
            head_branch: event.head.branch.clone().unwrap_or_default(),
        },
        _ => Ignore(IgnoreReason::NotRelevant),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhooks::events::PrRef;
    use proptest::prelude::*;

    const MARKER: &str = "#sync-downstream";
    const HEAD_SHA: &str = "1234567890abcdef1234567890abcdef12345678";

    fn upstream() -> RepoId {
        RepoId::new("acme", "app")
    }

    fn policy() -> ClassifyPolicy {
        ClassifyPolicy {
            upstream: upstream(),
            deploy_marker: MARKER.to_string(),
            trusted_mode: false,
            stage: Stage::Production,
        }
    }

    fn trusted(stage: Stage) -> ClassifyPolicy {
        ClassifyPolicy {
            trusted_mode: true,
            stage,
            ..policy()
        }
    }

    fn pr_ref(repo: RepoId, branch: &str, sha: &str) -> PrRef {
        PrRef {
            repo: Some(repo),
            branch: Some(branch.to_string()),
            sha: Some(sha.to_string()),
        }
    }

    /// An event every rule accepts.
    fn actionable() -> PullRequestEvent {
        PullRequestEvent {
            action: PrAction::Opened,
            repository: Some(upstream()),
            head: pr_ref(upstream(), "feature", HEAD_SHA),
            base: pr_ref(upstream(), "master", "abcdabcd"),
            merged: false,
            body: Some(format!("Bump it please\n\n{MARKER}")),
            head_commit_author: None,
        }
    }

    fn proceed() -> ActionDecision {
        ActionDecision::Proceed {
            head_sha: Sha::parse(HEAD_SHA).unwrap(),
            head_branch: "feature".to_string(),
        }
    }

    #[test]
    fn actionable_event_proceeds() {
        assert_eq!(classify(&actionable(), &policy()), proceed());

        let event = PullRequestEvent {
            action: PrAction::Synchronize,
            ..actionable()
        };
        assert_eq!(classify(&event, &policy()), proceed());
    }

    #[test]
    fn unsupported_action_is_ignored() {
        let event = PullRequestEvent {
            action: PrAction::Other("closed".to_string()),
            ..actionable()
        };
        assert_eq!(
            classify(&event, &policy()),
            ActionDecision::Ignore(IgnoreReason::UnsupportedAction)
        );
    }

    #[test]
    fn foreign_repository_is_ignored() {
        let event = PullRequestEvent {
            repository: Some(RepoId::new("someone", "app")),
            ..actionable()
        };
        assert_eq!(
            classify(&event, &policy()),
            ActionDecision::Ignore(IgnoreReason::UnknownRepository)
        );

        let event = PullRequestEvent {
            repository: None,
            ..actionable()
        };
        assert_eq!(
            classify(&event, &policy()),
            ActionDecision::Ignore(IgnoreReason::UnknownRepository)
        );
    }

    #[test]
    fn fork_head_is_ignored() {
        let event = PullRequestEvent {
            head: pr_ref(RepoId::new("fork", "app"), "feature", HEAD_SHA),
            ..actionable()
        };
        assert_eq!(
            classify(&event, &policy()),
            ActionDecision::Ignore(IgnoreReason::InvalidHeadOrBase)
        );

        let event = PullRequestEvent {
            base: PrRef::default(),
            ..actionable()
        };
        assert_eq!(
            classify(&event, &policy()),
            ActionDecision::Ignore(IgnoreReason::InvalidHeadOrBase)
        );
    }

    #[test]
    fn merged_is_ignored_even_with_marker() {
        let event = PullRequestEvent {
            merged: true,
            ..actionable()
        };
        assert_eq!(
            classify(&event, &policy()),
            ActionDecision::Ignore(IgnoreReason::AlreadyMerged)
        );
    }

    #[test]
    fn trusted_mode_skips_identity_checks() {
        let event = PullRequestEvent {
            repository: Some(RepoId::new("me", "fork")),
            head: pr_ref(RepoId::new("me", "fork"), "feature", HEAD_SHA),
            merged: true,
            ..actionable()
        };
        assert_eq!(classify(&event, &trusted(Stage::Development)), proceed());
        assert_eq!(classify(&event, &trusted(Stage::Production)), proceed());
    }

    #[test]
    fn trusted_mode_is_refused_in_staging() {
        assert_eq!(
            classify(&actionable(), &trusted(Stage::Staging)),
            ActionDecision::Ignore(IgnoreReason::UnsupportedStage)
        );
    }

    #[test]
    fn missing_marker_is_ignored_even_with_valid_sha() {
        let event = PullRequestEvent {
            body: Some("no marker here".to_string()),
            ..actionable()
        };
        assert_eq!(
            classify(&event, &policy()),
            ActionDecision::Ignore(IgnoreReason::MarkerNotFound)
        );
    }

    #[test]
    fn null_body_counts_as_empty() {
        let event = PullRequestEvent {
            body: None,
            ..actionable()
        };
        assert_eq!(
            classify(&event, &policy()),
            ActionDecision::Ignore(IgnoreReason::MarkerNotFound)
        );
    }

    #[test]
    fn missing_or_malformed_head_sha_is_not_relevant() {
        for sha in [None, Some(""), Some("not-a-sha")] {
            let event = PullRequestEvent {
                head: PrRef {
                    sha: sha.map(str::to_string),
                    ..actionable().head
                },
                ..actionable()
            };
            assert_eq!(
                classify(&event, &policy()),
                ActionDecision::Ignore(IgnoreReason::NotRelevant),
                "{sha:?}"
            );
        }
    }

    #[test]
    fn ignore_messages() {
        assert_eq!(
            IgnoreReason::UnsupportedAction.to_string(),
            "Unsupported action for pull_request event."
        );
        assert_eq!(IgnoreReason::MarkerNotFound.message(), "Deploy marker not found.");
    }

    fn arb_repo() -> impl Strategy<Value = Option<RepoId>> {
        prop_oneof![
            Just(None),
            Just(Some(upstream())),
            "[a-z]{1,8}".prop_map(|owner| Some(RepoId::new(owner, "app"))),
        ]
    }

    fn arb_pr_ref() -> impl Strategy<Value = PrRef> {
        (
            arb_repo(),
            proptest::option::of("[a-z/-]{0,12}"),
            proptest::option::of("[0-9a-f]{0,40}"),
        )
            .prop_map(|(repo, branch, sha)| PrRef { repo, branch, sha })
    }

    fn arb_policy() -> impl Strategy<Value = ClassifyPolicy> {
        (
            proptest::bool::ANY,
            prop_oneof![
                Just(Stage::Development),
                Just(Stage::Staging),
                Just(Stage::Production)
            ],
        )
            .prop_map(|(trusted_mode, stage)| ClassifyPolicy {
                trusted_mode,
                stage,
                ..policy()
            })
    }

    proptest! {
        /// Anything other than opened/synchronize is ignored, whatever the
        /// rest of the event says.
        #[test]
        fn prop_unsupported_action_always_ignored(
            action in "[a-z_]{0,20}",
            repository in arb_repo(),
            head in arb_pr_ref(),
            base in arb_pr_ref(),
            merged: bool,
            body in proptest::option::of(".*"),
            policy in arb_policy(),
        ) {
            prop_assume!(action != "opened" && action != "synchronize");
            let event = PullRequestEvent {
                action: PrAction::parse(Some(action.as_str())),
                repository,
                head,
                base,
                merged,
                body,
                head_commit_author: None,
            };
            prop_assert_eq!(
                classify(&event, &policy),
                ActionDecision::Ignore(IgnoreReason::UnsupportedAction)
            );
        }

        /// Without the marker nothing proceeds.
        #[test]
        fn prop_no_marker_never_proceeds(
            body in proptest::option::of("[a-z ]{0,40}"),
            policy in arb_policy(),
        ) {
            let event = PullRequestEvent { body, ..actionable() };
            let proceeded = matches!(classify(&event, &policy), ActionDecision::Proceed { .. });
            prop_assert!(!proceeded);
        }
    }
}
