use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrubError};

/// Maximum characters of a commit message kept in outcome records.
pub const MESSAGE_SUMMARY_LEN: usize = 60;

/// Shortest abbreviated commit id git accepts.
const MIN_COMMIT_ID_LEN: usize = 4;

/// Length of a full SHA-1 commit id.
const FULL_COMMIT_ID_LEN: usize = 40;

/// Timestamp assumed for records that carry none.
pub const EPOCH_TIMESTAMP: &str = "1970-01-01T00:00:00Z";

/// Return the abbreviated form of a commit id for display.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// First line of `message`, truncated to `limit` characters.
pub fn summary_line(message: &str, limit: usize) -> String {
    let line = message.lines().next().unwrap_or_default();
    if line.chars().count() <= limit {
        return line.to_string();
    }
    let mut short: String = line.chars().take(limit.saturating_sub(3)).collect();
    short.push_str("...");
    short
}

/// Characters allowed in repository owner and name segments.
fn is_repo_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// A commit flagged by discovery as eligible for deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCommit {
    /// Repository in `owner/name` form.
    pub repository: String,
    /// Commit hash.
    pub commit_id: String,
    /// Commit message.
    pub message: String,
    /// Author timestamp, ISO-8601.
    pub timestamp: String,
    /// Author name, when discovery reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl CandidateCommit {
    /// Create a candidate without author information.
    pub fn new(
        repository: impl Into<String>,
        commit_id: impl Into<String>,
        message: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            repository: repository.into(),
            commit_id: commit_id.into(),
            message: message.into(),
            timestamp: timestamp.into(),
            author: None,
        }
    }

    /// Attach the author name.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Abbreviated commit id.
    pub fn short_id(&self) -> &str {
        short_id(&self.commit_id)
    }

    /// Check that the record is well-formed before it reaches git.
    ///
    /// Commit ids must be full or abbreviated hex hashes, which also keeps
    /// ref names and command-line options out of git invocations.
    pub fn validate(&self) -> Result<()> {
        let segments: Vec<&str> = self.repository.split('/').collect();
        let repository_ok = segments.len() == 2
            && segments.iter().all(|segment| {
                !segment.is_empty()
                    && !segment.starts_with(['-', '.'])
                    && segment.chars().all(is_repo_char)
            });
        if !repository_ok {
            return Err(ScrubError::InvalidInput(format!(
                "repository must look like owner/name, got {:?}",
                self.repository
            )));
        }

        if !(MIN_COMMIT_ID_LEN..=FULL_COMMIT_ID_LEN).contains(&self.commit_id.len())
            || !self.commit_id.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(ScrubError::InvalidInput(format!(
                "invalid commit id {:?} for {}",
                self.commit_id, self.repository
            )));
        }

        Ok(())
    }
}

/// Candidates belonging to one repository, deduplicated by commit id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitGroup {
    /// Repository in `owner/name` form.
    pub repository: String,
    /// Candidates in first-seen order.
    pub commits: Vec<CandidateCommit>,
}

impl CommitGroup {
    /// Group candidates by repository, keeping first-seen repository order and
    /// dropping repeated commit ids within a repository.
    pub fn group(candidates: impl IntoIterator<Item = CandidateCommit>) -> Vec<Self> {
        let mut groups: Vec<Self> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for candidate in candidates {
            let slot = *index
                .entry(candidate.repository.clone())
                .or_insert_with(|| {
                    groups.push(Self {
                        repository: candidate.repository.clone(),
                        commits: Vec::new(),
                    });
                    groups.len() - 1
                });
            let group = &mut groups[slot];
            if !group
                .commits
                .iter()
                .any(|c| c.commit_id == candidate.commit_id)
            {
                group.commits.push(candidate);
            }
        }

        groups
    }

    /// Number of distinct candidates.
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    /// Whether the group holds no candidates.
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }
}

/// The safety checker's judgment for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafetyVerdict {
    /// Whether deletion would leave all non-candidate commits intact.
    pub is_safe: bool,
    /// Human-readable explanation.
    pub reason: String,
    /// Every non-candidate commit that deletion would destroy.
    pub blocking_commit_ids: Vec<String>,
}

impl SafetyVerdict {
    /// A safe verdict.
    pub fn safe(reason: impl Into<String>) -> Self {
        Self {
            is_safe: true,
            reason: reason.into(),
            blocking_commit_ids: Vec::new(),
        }
    }

    /// An unsafe verdict caused by commits built on top of the candidates.
    pub fn blocked(reason: impl Into<String>, blocking_commit_ids: Vec<String>) -> Self {
        Self {
            is_safe: false,
            reason: reason.into(),
            blocking_commit_ids,
        }
    }

    /// An unsafe verdict with no specific blocking commits.
    pub fn refused(reason: impl Into<String>) -> Self {
        Self::blocked(reason, Vec::new())
    }
}

/// Per-commit result of a rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStatus {
    /// Removed from the branch history.
    Deleted,
    /// Did not resolve in the cloned history.
    NotFound,
    /// Could not be verified.
    Failed,
}

/// Outcome for one commit within a [`RewriteResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOutcome {
    /// Commit id as supplied by discovery.
    pub commit_id: String,
    /// What happened to it.
    pub status: CommitStatus,
    /// Message summary or failure detail.
    pub message: String,
}

/// Overall status of a repository rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteStatus {
    /// Local rewrite and publish both succeeded.
    Success,
    /// Local history was rewritten but the remote still holds the old history.
    Partial,
    /// Nothing was changed.
    Failed,
}

impl fmt::Display for RewriteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
        })
    }
}

/// Result of rewriting one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteResult {
    /// Repository in `owner/name` form.
    pub repository: String,
    /// Candidates submitted for deletion.
    pub total_commits: usize,
    /// Candidates removed from the local history.
    pub deleted_commits: usize,
    /// Candidates that failed verification.
    pub failed_commits: usize,
    /// Overall status.
    pub status: RewriteStatus,
    /// Failure detail; always set for `partial` and `failed`.
    pub error_message: Option<String>,
    /// Per-commit outcomes.
    pub commit_outcomes: Vec<CommitOutcome>,
}

impl RewriteResult {
    /// Start a result for `total_commits` candidates in `repository`.
    ///
    /// The status starts as `failed` until the rewrite proves otherwise.
    pub fn new(repository: impl Into<String>, total_commits: usize) -> Self {
        Self {
            repository: repository.into(),
            total_commits,
            deleted_commits: 0,
            failed_commits: 0,
            status: RewriteStatus::Failed,
            error_message: None,
            commit_outcomes: Vec::new(),
        }
    }

    /// Append a commit outcome and update the counters.
    pub fn record(&mut self, commit_id: &str, status: CommitStatus, message: String) {
        match status {
            CommitStatus::Deleted => self.deleted_commits += 1,
            CommitStatus::NotFound | CommitStatus::Failed => self.failed_commits += 1,
        }
        self.commit_outcomes.push(CommitOutcome {
            commit_id: commit_id.to_string(),
            status,
            message,
        });
    }

    /// Finalize as failed with `message`.
    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.status = RewriteStatus::Failed;
        self.error_message = Some(message.into());
        self
    }

    /// Finalize as partial; a partial result always explains itself.
    pub fn partial(mut self, message: impl Into<String>) -> Self {
        self.status = RewriteStatus::Partial;
        self.error_message = Some(message.into());
        self
    }

    /// Finalize as successful.
    pub fn succeeded(mut self) -> Self {
        self.status = RewriteStatus::Success;
        self.error_message = None;
        self
    }
}

/// A candidate whose deletion was not performed and is seeded for a later run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredCommit {
    /// Repository in `owner/name` form.
    pub repository: String,
    /// Commit id.
    pub commit_id: String,
    /// Commit message.
    pub message: String,
    /// Author timestamp, kept so a retry can still order the commits.
    pub timestamp: String,
    /// Why the commit was deferred.
    pub reason: String,
}

impl DeferredCommit {
    /// Defer `commit` with `reason`.
    pub fn from_candidate(commit: &CandidateCommit, reason: &str) -> Self {
        Self {
            repository: commit.repository.clone(),
            commit_id: commit.commit_id.clone(),
            message: commit.message.clone(),
            timestamp: commit.timestamp.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Run-wide counters, returned by the orchestrator at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Repositories in the input.
    pub total_repos: usize,
    /// Repositories that reached the rewrite step.
    pub processed_repos: usize,
    /// Repositories deferred without rewriting.
    pub skipped_repos: usize,
    /// Rewrites that changed nothing.
    pub failed_repos: usize,
    /// Rewrites whose publish failed.
    pub partial_repos: usize,
    /// Distinct candidates in the input.
    pub total_commits: usize,
    /// Candidates removed from the remote.
    pub deleted_commits: usize,
    /// Candidates deferred for a later run.
    pub skipped_commits: usize,
}

/// Terminal state of one repository in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryState {
    /// The clone failed; the repository was deferred.
    CloneFailed,
    /// The safety check refused; the repository was deferred.
    Unsafe,
    /// The user declined; the repository was deferred.
    Declined,
    /// The user skipped the repository; it was deferred.
    Skipped,
    /// The run was interrupted before the repository was rewritten.
    Interrupted,
    /// The rewrite step ran with the given status.
    Rewritten(RewriteStatus),
}

impl fmt::Display for RepositoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CloneFailed => f.write_str("clone failed"),
            Self::Unsafe => f.write_str("unsafe"),
            Self::Declined => f.write_str("declined"),
            Self::Skipped => f.write_str("skipped"),
            Self::Interrupted => f.write_str("interrupted"),
            Self::Rewritten(status) => write!(f, "rewritten ({status})"),
        }
    }
}

/// One line of the final summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryReport {
    /// Repository in `owner/name` form.
    pub repository: String,
    /// Number of candidates in the repository.
    pub commits: usize,
    /// Where processing stopped.
    pub state: RepositoryState,
    /// Why, for every state other than a successful rewrite.
    pub reason: Option<String>,
}

/// Commit information shown before the human decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitDetails {
    /// Full commit id.
    pub commit_id: String,
    /// First line of the message.
    pub subject: String,
    /// Author name.
    pub author: String,
    /// Author date, strict ISO-8601.
    pub date: String,
    /// Paths touched by the commit.
    pub files: Vec<String>,
}

/// Everything a run produced.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// One result per repository that reached the rewrite step.
    pub results: Vec<RewriteResult>,
    /// Commits seeded for a later run.
    pub deferred: Vec<DeferredCommit>,
    /// Run-wide counters.
    pub statistics: RunStatistics,
    /// One entry per repository, in processing order.
    pub repositories: Vec<RepositoryReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(repository: &str, id: &str) -> CandidateCommit {
        CandidateCommit::new(repository, id, "msg", EPOCH_TIMESTAMP)
    }

    #[test]
    fn test_group_preserves_order_and_dedups() {
        let groups = CommitGroup::group(vec![
            candidate("a/b", "c1"),
            candidate("x/y", "d1"),
            candidate("a/b", "c2"),
            candidate("a/b", "c1"),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].repository, "a/b");
        assert_eq!(
            groups[0]
                .commits
                .iter()
                .map(|c| c.commit_id.as_str())
                .collect::<Vec<_>>(),
            vec!["c1", "c2"]
        );
        assert_eq!(groups[1].len(), 1);
    }

    #[test]
    fn test_validate_rejects_malformed_records() {
        assert!(candidate("a/b", "c1c1").validate().is_ok());
        assert!(candidate("a/b.rs", "0123abcd").validate().is_ok());
        assert!(candidate("a/b", &"ab".repeat(20)).validate().is_ok());
        assert!(candidate("ab", "c1c1").validate().is_err());
        assert!(candidate("a/b/c", "c1c1").validate().is_err());
        assert!(candidate("a/-b", "c1c1").validate().is_err());
        assert!(candidate("a/b", "").validate().is_err());
        assert!(candidate("a/b", "c1").validate().is_err());
        assert!(candidate("a/b", &"ab".repeat(21)).validate().is_err());
        assert!(candidate("a/b", "--upload-pack=x").validate().is_err());
        assert!(candidate("a/b", "HEAD~1").validate().is_err());
        assert!(candidate("a/b", "HEAD").validate().is_err());
        assert!(candidate("a/b", "main").validate().is_err());
    }

    #[test]
    fn test_summary_line_truncates_first_line() {
        assert_eq!(summary_line("short\nbody", 60), "short");
        let long = "x".repeat(80);
        let summary = summary_line(&long, 60);
        assert_eq!(summary.chars().count(), 60);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_partial_always_carries_message() {
        let result = RewriteResult::new("a/b", 1).partial("push rejected");
        assert_eq!(result.status, RewriteStatus::Partial);
        assert_eq!(result.error_message.as_deref(), Some("push rejected"));
    }

    #[test]
    fn test_record_updates_counters() {
        let mut result = RewriteResult::new("a/b", 3);
        result.record("c1", CommitStatus::Deleted, String::new());
        result.record("c2", CommitStatus::NotFound, String::new());
        result.record("c3", CommitStatus::Failed, String::new());
        assert_eq!(result.deleted_commits, 1);
        assert_eq!(result.failed_commits, 2);
        assert_eq!(result.commit_outcomes.len(), 3);
    }

    #[test]
    fn test_statuses_serialize_snake_case() -> serde_json::Result<()> {
        assert_eq!(serde_json::to_string(&CommitStatus::NotFound)?, "\"not_found\"");
        assert_eq!(serde_json::to_string(&RewriteStatus::Partial)?, "\"partial\"");
        Ok(())
    }
}
