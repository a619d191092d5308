use std::{path::Path, time::Duration};

use tracing::debug;

use crate::{
    config::Credential,
    error::{Result, ScrubError},
    runner::{CommandOutput, CommandRunner},
    types::CommitDetails,
};

/// Stderr fragments meaning the remote refused a ref update.
const PUBLISH_PATTERNS: &[&str] = &[
    "stale info",
    "rejected",
    "protected branch",
    "non-fast-forward",
    "hook declined",
];

/// Stderr fragments meaning the credential was missing or refused.
const AUTH_PATTERNS: &[&str] = &[
    "authentication failed",
    "could not read username",
    "invalid username or password",
    "terminal prompts disabled",
    "permission denied",
    "returned error: 401",
    "returned error: 403",
    "error: 401",
    "error: 403",
];

/// Stderr fragments meaning a repository or revision does not exist.
const NOT_FOUND_PATTERNS: &[&str] = &[
    "repository not found",
    "not found",
    "does not exist",
    "does not appear to be a git repository",
    "unknown revision",
    "bad revision",
    "bad object",
];

/// Stderr fragments for network failures worth retrying later.
const TRANSIENT_PATTERNS: &[&str] = &[
    "could not resolve host",
    "connection timed out",
    "connection reset",
    "failed to connect",
    "early eof",
    "remote end hung up",
];

/// Map a failed command's sanitized stderr to the matching error variant.
pub fn classify(command: String, stderr: &str) -> ScrubError {
    let lower = stderr.to_lowercase();
    let matches = |patterns: &[&str]| patterns.iter().any(|p| lower.contains(p));
    let message = stderr.trim().to_string();

    if matches(PUBLISH_PATTERNS) {
        ScrubError::PublishConflict(message)
    } else if matches(AUTH_PATTERNS) {
        ScrubError::Authentication(message)
    } else if matches(NOT_FOUND_PATTERNS) {
        ScrubError::NotFound(message)
    } else if matches(TRANSIENT_PATTERNS) {
        ScrubError::TransientCommand(message)
    } else {
        ScrubError::Command { command, message }
    }
}

/// Render a command line for error messages, with the credential redacted.
fn command_line(args: &[&str], credential: &Credential) -> String {
    credential.sanitize(&format!("git {}", args.join(" ")))
}

/// Run `args`, turning a non-zero exit into a classified, sanitized error.
fn run_checked(
    runner: &dyn CommandRunner,
    args: &[&str],
    cwd: Option<&Path>,
    timeout: Duration,
    credential: &Credential,
) -> Result<CommandOutput> {
    let output = runner
        .run(args, cwd, timeout)
        .map_err(|e| sanitize_error(e, credential))?;
    if !output.success {
        return Err(classify(
            command_line(args, credential),
            &credential.sanitize(&output.stderr),
        ));
    }
    Ok(output)
}

/// Scrub the credential from the text of an error raised by the runner.
fn sanitize_error(error: ScrubError, credential: &Credential) -> ScrubError {
    match error {
        ScrubError::TransientCommand(m) => ScrubError::TransientCommand(credential.sanitize(&m)),
        ScrubError::GitUnavailable(m) => ScrubError::GitUnavailable(credential.sanitize(&m)),
        other => other,
    }
}

/// Report the installed git version.
pub fn version(runner: &dyn CommandRunner, timeout: Duration) -> Result<String> {
    let output = run_checked(runner, &["--version"], None, timeout, &Credential::none())?;
    Ok(output.stdout.trim().to_string())
}

/// Clone the default branch of `url` into `dest`.
pub fn clone(
    runner: &dyn CommandRunner,
    url: &str,
    dest: &Path,
    timeout: Duration,
    credential: &Credential,
) -> Result<()> {
    let dest = dest.to_string_lossy();
    run_checked(
        runner,
        &[
            "clone",
            "--quiet",
            "--no-tags",
            "--single-branch",
            "--",
            url,
            &dest,
        ],
        None,
        timeout,
        credential,
    )?;
    Ok(())
}

/// Typed git operations against one local clone.
pub struct Git<'a> {
    /// Runner used for every invocation.
    runner: &'a dyn CommandRunner,
    /// Working directory of the clone.
    dir: &'a Path,
    /// Upper bound for each invocation.
    timeout: Duration,
    /// Secret scrubbed from all error text.
    credential: &'a Credential,
}

impl<'a> Git<'a> {
    /// Operate on the clone at `dir`.
    pub fn new(
        runner: &'a dyn CommandRunner,
        dir: &'a Path,
        timeout: Duration,
        credential: &'a Credential,
    ) -> Self {
        Self {
            runner,
            dir,
            timeout,
            credential,
        }
    }

    /// Run a command that must succeed and return its trimmed stdout.
    fn output(&self, args: &[&str]) -> Result<String> {
        let output = run_checked(
            self.runner,
            args,
            Some(self.dir),
            self.timeout,
            self.credential,
        )?;
        Ok(output.stdout.trim().to_string())
    }

    /// Run a command whose exit code carries meaning.
    fn probe(&self, args: &[&str]) -> Result<CommandOutput> {
        self.runner
            .run(args, Some(self.dir), self.timeout)
            .map_err(|e| sanitize_error(e, self.credential))
    }

    /// The commit the checked-out branch points at, if it has any commits.
    pub fn head(&self) -> Result<Option<String>> {
        self.resolve_commit("HEAD")
    }

    /// Name of the checked-out branch.
    pub fn current_branch(&self) -> Result<String> {
        self.output(&["symbolic-ref", "--short", "HEAD"])
    }

    /// Resolve `rev` to a full commit hash, or `None` if it names no commit.
    pub fn resolve_commit(&self, rev: &str) -> Result<Option<String>> {
        let spec = format!("{rev}^{{commit}}");
        let args = ["rev-parse", "--verify", "--quiet", spec.as_str()];
        let output = self.probe(&args)?;
        if output.success {
            return Ok(Some(output.stdout.trim().to_string()));
        }
        if output.code == Some(1) && output.stderr.trim().is_empty() {
            return Ok(None);
        }
        Err(classify(
            command_line(&args, self.credential),
            &self.credential.sanitize(&output.stderr),
        ))
    }

    /// First parent of `commit`, or `None` for a root commit.
    pub fn parent(&self, commit: &str) -> Result<Option<String>> {
        self.resolve_commit(&format!("{commit}^"))
    }

    /// Commits reachable from `tip` but not from `base`, newest first.
    pub fn commits_after(&self, base: &str, tip: &str) -> Result<Vec<String>> {
        let range = format!("{base}..{tip}");
        let stdout = self.output(&["rev-list", &range])?;
        Ok(stdout.lines().map(str::to_string).collect())
    }

    /// Whether `ancestor` is reachable from `descendant`.
    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        let args = ["merge-base", "--is-ancestor", ancestor, descendant];
        let output = self.probe(&args)?;
        match output.code {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(ScrubError::Ancestry(format!(
                "{}: {}",
                command_line(&args, self.credential),
                self.credential.sanitize(output.stderr.trim())
            ))),
        }
    }

    /// Subject line of `commit`.
    pub fn subject(&self, commit: &str) -> Result<String> {
        self.output(&["show", "--no-patch", "--format=%s", commit])
    }

    /// Subject, author, date and touched paths of `commit`.
    pub fn commit_details(&self, commit: &str) -> Result<CommitDetails> {
        let header = self.output(&["show", "--no-patch", "--format=%H%n%s%n%an%n%aI", commit])?;
        let mut lines = header.lines().map(str::to_string);
        let commit_id = lines.next().unwrap_or_default();
        let subject = lines.next().unwrap_or_default();
        let author = lines.next().unwrap_or_default();
        let date = lines.next().unwrap_or_default();

        let files = self.output(&[
            "diff-tree",
            "--no-commit-id",
            "--name-only",
            "-r",
            "--root",
            commit,
        ])?;

        Ok(CommitDetails {
            commit_id,
            subject,
            author,
            date,
            files: files.lines().map(str::to_string).collect(),
        })
    }

    /// Move the branch and working tree to `rev`, discarding everything after it.
    pub fn reset_hard(&self, rev: &str) -> Result<()> {
        debug!(dir = %self.dir.display(), "resetting branch");
        self.output(&["reset", "--quiet", "--hard", rev])?;
        Ok(())
    }

    /// Force-update `branch` on origin, but only while it still points at `expected`.
    pub fn push_with_lease(&self, branch: &str, expected: &str) -> Result<()> {
        let lease = format!("--force-with-lease=refs/heads/{branch}:{expected}");
        let refspec = format!("HEAD:refs/heads/{branch}");
        let args = ["push", &lease, "origin", &refspec];
        let output = self.probe(&args)?;
        if output.success {
            return Ok(());
        }
        // Per-ref rejection details may land on either stream.
        let report = format!("{}\n{}", output.stderr.trim(), output.stdout.trim());
        Err(classify(
            command_line(&args, self.credential),
            &self.credential.sanitize(report.trim()),
        ))
    }

    /// Where `branch` currently points on origin.
    pub fn remote_tip(&self, branch: &str) -> Result<Option<String>> {
        let refname = format!("refs/heads/{branch}");
        let stdout = self.output(&["ls-remote", "origin", &refname])?;
        Ok(stdout
            .lines()
            .find_map(|line| line.split_whitespace().next())
            .map(str::to_string))
    }
}
