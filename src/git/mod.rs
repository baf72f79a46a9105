//! Git operations on the two shared checkouts.
//!
//! Every git invocation is built as a [`CommandSpec`] by [`git_command`] (or
//! [`git_commit_command`] when it creates commits) and executed through a
//! [`CommandRunner`]. Nothing here spawns processes directly.
//!
//! - [`checkout`]: clone-or-refresh of the shared checkouts, serialized per
//!   repository.

pub mod checkout;

use std::path::Path;

use crate::command::{CommandError, CommandOutput, CommandRunner, CommandSpec};
use crate::types::Sha;

pub use checkout::{CheckoutState, Checkouts, SyncError, SyncedCheckout};

/// Identity used for creating commits.
///
/// This is passed via `-c` flags to git commands, so commits can be created
/// even though global and system git config are disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitIdentity {
    /// The committer/author name (git `user.name`).
    pub name: String,

    /// The committer/author email (git `user.email`).
    pub email: String,
}

/// Create a git command with a clean environment (no system/user config).
///
/// This ensures consistent behavior across different machines by ignoring
/// system and user git configuration (e.g., rerere, hooks, aliases), and
/// never blocks on a credential prompt.
pub fn git_command(workdir: &Path) -> CommandSpec {
    CommandSpec::new("git", workdir)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("GIT_CONFIG_GLOBAL", "/dev/null")
        .env("GIT_TERMINAL_PROMPT", "0")
}

/// Create a git command configured for commit operations.
///
/// The returned command has `-c user.name=<name>` and `-c user.email=<email>`
/// prepended; callers append the subcommand.
pub fn git_commit_command(workdir: &Path, identity: &CommitIdentity) -> CommandSpec {
    git_command(workdir)
        .arg("-c")
        .arg(format!("user.name={}", identity.name))
        .arg("-c")
        .arg(format!("user.email={}", identity.email))
}

/// Run a git command in the given working directory.
pub async fn run_git<R: CommandRunner>(
    runner: &R,
    workdir: &Path,
    args: &[&str],
) -> Result<CommandOutput, CommandError> {
    runner.run(&git_command(workdir).args(args.iter().copied())).await
}

/// Run a git command and return stdout, trimmed.
pub async fn git_stdout<R: CommandRunner>(
    runner: &R,
    workdir: &Path,
    args: &[&str],
) -> Result<String, CommandError> {
    let output = run_git(runner, workdir, args).await?;
    Ok(output.stdout.trim().to_string())
}

/// Get the SHA of a revision.
pub async fn rev_parse<R: CommandRunner>(
    runner: &R,
    workdir: &Path,
    rev: &str,
) -> Result<Sha, CommandError> {
    let stdout = git_stdout(runner, workdir, &["rev-parse", rev]).await?;
    Sha::parse(stdout.as_str()).map_err(|_| CommandError::UnexpectedOutput {
        command: format!("git rev-parse {rev}"),
        output: stdout,
    })
}

/// Get the subject line of a commit.
pub async fn commit_subject<R: CommandRunner>(
    runner: &R,
    workdir: &Path,
    sha: &Sha,
) -> Result<String, CommandError> {
    git_stdout(runner, workdir, &["log", "-1", "--format=%s", sha.as_str()]).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ScriptedRunner, git_subcommand};

    #[test]
    fn git_command_isolates_config() {
        let spec = git_command(Path::new("/repo"));
        assert_eq!(spec.program, "git");
        assert_eq!(spec.cwd, Path::new("/repo"));
        assert!(spec.env.contains(&("GIT_CONFIG_NOSYSTEM".into(), "1".into())));
        assert!(spec.env.contains(&("GIT_TERMINAL_PROMPT".into(), "0".into())));
        assert!(spec.args.is_empty());
    }

    #[test]
    fn git_commit_command_prepends_identity() {
        let identity = CommitIdentity {
            name: "Bot \"Quoted\" Name".to_string(),
            email: "bot@example.com".to_string(),
        };
        let spec = git_commit_command(Path::new("/repo"), &identity).arg("commit");

        assert_eq!(
            spec.args,
            vec![
                "-c",
                "user.name=Bot \"Quoted\" Name",
                "-c",
                "user.email=bot@example.com",
                "commit"
            ]
        );
        assert_eq!(git_subcommand(&spec), Some("commit"));
    }

    #[tokio::test]
    async fn rev_parse_parses_sha() {
        let runner = ScriptedRunner::new(|_| Ok(format!("{}\n", "c".repeat(40))));
        let sha = rev_parse(&runner, Path::new("/repo"), "HEAD").await.unwrap();
        assert_eq!(sha.as_str(), "c".repeat(40));
        assert_eq!(runner.calls()[0].args, vec!["rev-parse", "HEAD"]);
    }

    #[tokio::test]
    async fn rev_parse_rejects_garbage() {
        let runner = ScriptedRunner::new(|_| Ok("not a sha".to_string()));
        let err = rev_parse(&runner, Path::new("/repo"), "HEAD").await.unwrap_err();
        assert!(matches!(err, CommandError::UnexpectedOutput { .. }));
    }

    #[tokio::test]
    async fn commit_subject_uses_log_format() {
        let runner = ScriptedRunner::new(|_| Ok("fix: things (#1)\n".to_string()));
        let sha = Sha::parse("abcdef1").unwrap();
        let subject = commit_subject(&runner, Path::new("/repo"), &sha).await.unwrap();

        assert_eq!(subject, "fix: things (#1)");
        assert_eq!(
            runner.calls()[0].args,
            vec!["log", "-1", "--format=%s", "abcdef1"]
        );
    }
}
