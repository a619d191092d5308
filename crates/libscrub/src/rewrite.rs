use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::{
    error::ScrubError,
    types::{
        CandidateCommit, CommitStatus, MESSAGE_SUMMARY_LEN, RewriteResult, short_id,
        summary_line,
    },
    workspace::Workspace,
};

/// Sort key for an author timestamp: parsed RFC 3339 instants compare in UTC,
/// anything unparseable falls back to its raw text.
fn timestamp_key(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.with_timezone(&Utc).format("%Y-%m-%dT%H:%M:%S%.9fZ").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

/// The candidate with the earliest author timestamp; ties keep input order.
fn oldest(commits: &[CandidateCommit]) -> Option<&CandidateCommit> {
    commits
        .iter()
        .min_by(|a, b| timestamp_key(&a.timestamp).cmp(&timestamp_key(&b.timestamp)))
}

/// Remove `commits` from the workspace's branch and publish the result.
///
/// The local branch is only reset after every candidate has been verified and
/// the new tip has been shown to exclude all of them. If the reset succeeds but
/// publishing fails the result is `partial`: the remote still holds the old
/// history and nothing is retried.
pub fn rewrite_history(workspace: &Workspace<'_>, commits: &[CandidateCommit]) -> RewriteResult {
    let repository = workspace.repository();
    let git = workspace.git();
    let mut result = RewriteResult::new(repository, commits.len());

    let mut resolved = Vec::with_capacity(commits.len());
    for commit in commits {
        match git.resolve_commit(&commit.commit_id) {
            Ok(Some(id)) => resolved.push(id),
            Ok(None) => result.record(
                &commit.commit_id,
                CommitStatus::NotFound,
                format!("commit {} not found", commit.short_id()),
            ),
            Err(e) => {
                warn!(repository, error = %e, "verification aborted");
                result.record(&commit.commit_id, CommitStatus::Failed, e.to_string());
                return result.failed(format!("could not verify commits: {e}"));
            }
        }
    }
    if result.failed_commits > 0 {
        let message = format!(
            "{} of {} commits could not be found",
            result.failed_commits, result.total_commits
        );
        return result.failed(message);
    }

    let Some(target) = oldest(commits) else {
        return result.failed("no commits to delete");
    };
    let new_tip = match git.parent(&target.commit_id) {
        Ok(Some(parent)) => parent,
        Ok(None) => {
            return result.failed(format!(
                "commit {} is the root commit and cannot be removed",
                target.short_id()
            ));
        }
        Err(e) => return result.failed(format!("could not resolve parent: {e}")),
    };

    for id in &resolved {
        match git.is_ancestor(id, &new_tip) {
            Ok(false) => {}
            Ok(true) => {
                let error = ScrubError::UnsafeOperation(format!(
                    "commit {} predates the rewrite point; timestamps disagree with history",
                    short_id(id)
                ));
                return result.failed(error.to_string());
            }
            Err(e) => return result.failed(e.to_string()),
        }
    }

    if let Err(e) = git.reset_hard(&new_tip) {
        return result.failed(format!("reset failed: {e}"));
    }

    for commit in commits {
        result.record(
            &commit.commit_id,
            CommitStatus::Deleted,
            summary_line(&commit.message, MESSAGE_SUMMARY_LEN),
        );
    }
    info!(repository, deleted = result.deleted_commits, "local history rewritten");

    let branch = workspace.branch();
    if let Err(e) = git.push_with_lease(branch, workspace.initial_tip()) {
        warn!(repository, error = %e, "publish failed; remote keeps old history");
        return result.partial(publish_failure(&e));
    }

    match git.remote_tip(branch) {
        Ok(Some(tip)) if tip == new_tip => {}
        Ok(tip) => {
            warn!(repository, ?tip, "remote branch did not move to the rewritten tip");
            return result.partial(format!(
                "push reported success but origin/{branch} does not point at {new_tip}"
            ));
        }
        Err(e) => warn!(repository, error = %e, "could not confirm published tip"),
    }

    info!(repository, "history published");
    result.succeeded()
}

/// Message for a failed publish.
fn publish_failure(error: &ScrubError) -> String {
    match error {
        ScrubError::PublishConflict(m) => format!("remote rejected the update: {m}"),
        other => format!("push failed: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EPOCH_TIMESTAMP;

    fn at(id: &str, timestamp: &str) -> CandidateCommit {
        CandidateCommit::new("a/b", id, "m", timestamp)
    }

    #[test]
    fn test_oldest_compares_across_offsets() {
        let commits = [
            at("c1", "2024-01-01T12:00:00+00:00"),
            at("c2", "2024-01-01T13:00:00+02:00"),
        ];
        assert_eq!(oldest(&commits).map(|c| c.commit_id.as_str()), Some("c2"));
    }

    #[test]
    fn test_oldest_ties_keep_input_order() {
        let commits = [at("c1", EPOCH_TIMESTAMP), at("c2", EPOCH_TIMESTAMP)];
        assert_eq!(oldest(&commits).map(|c| c.commit_id.as_str()), Some("c1"));
    }

    #[test]
    fn test_unparseable_timestamps_sort_textually() {
        let commits = [at("c1", "not-a-date"), at("c2", "2020-05-01T00:00:00Z")];
        assert_eq!(oldest(&commits).map(|c| c.commit_id.as_str()), Some("c2"));
        assert_eq!(timestamp_key("garbage"), "garbage");
    }
}
