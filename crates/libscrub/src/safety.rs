use std::collections::HashSet;

use tracing::{debug, warn};

use crate::{
    error::{Result, ScrubError},
    git::Git,
    types::{CandidateCommit, SafetyVerdict, short_id, summary_line},
    workspace::Workspace,
};

/// Blocking commits named in an unsafe verdict's reason.
const MAX_NAMED_COMMITS: usize = 3;

/// Short id and subject of the first few `commits`; a subject that cannot be
/// read is left out.
fn describe(git: &Git<'_>, commits: &[String]) -> String {
    commits
        .iter()
        .take(MAX_NAMED_COMMITS)
        .map(|id| match git.subject(id) {
            Ok(subject) => format!("{} \"{}\"", short_id(id), summary_line(&subject, 40)),
            Err(_) => short_id(id).to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Decide whether deleting `commits` from the workspace's branch leaves every
/// other commit intact.
///
/// Any failure to read the history is a refusal: the verdict is unsafe and
/// carries the error as its reason.
pub fn check_safety(workspace: &Workspace<'_>, commits: &[CandidateCommit]) -> SafetyVerdict {
    let verdict = match evaluate(&workspace.git(), commits) {
        Ok(verdict) => verdict,
        Err(e) => SafetyVerdict::refused(format!("safety check failed: {e}")),
    };
    if verdict.is_safe {
        debug!(repository = workspace.repository(), reason = %verdict.reason, "deletion is safe");
    } else {
        warn!(
            repository = workspace.repository(),
            reason = %verdict.reason,
            blocking = verdict.blocking_commit_ids.len(),
            "deletion is unsafe"
        );
    }
    verdict
}

/// Compute the verdict, propagating any git failure.
fn evaluate(git: &Git<'_>, commits: &[CandidateCommit]) -> Result<SafetyVerdict> {
    if commits.is_empty() {
        return Ok(SafetyVerdict::refused("no commits to delete"));
    }

    let tip = git
        .head()?
        .ok_or_else(|| ScrubError::NotFound("branch has no commits".to_string()))?;

    let mut resolved = Vec::with_capacity(commits.len());
    for commit in commits {
        let id = git.resolve_commit(&commit.commit_id)?.ok_or_else(|| {
            ScrubError::NotFound(format!("commit {} not found", commit.short_id()))
        })?;
        resolved.push(id);
    }
    let candidate_ids: HashSet<&str> = resolved.iter().map(String::as_str).collect();

    let mut seen = HashSet::new();
    let mut blocking = Vec::new();
    for id in &resolved {
        for descendant in git.commits_after(id, &tip)? {
            if !candidate_ids.contains(descendant.as_str()) && seen.insert(descendant.clone()) {
                blocking.push(descendant);
            }
        }
    }

    if !blocking.is_empty() {
        let mut reason = format!(
            "{} newer commit{} would be lost: {}",
            blocking.len(),
            if blocking.len() == 1 { "" } else { "s" },
            describe(git, &blocking)
        );
        if blocking.len() > MAX_NAMED_COMMITS {
            reason.push_str(&format!(", ... and {} more", blocking.len() - MAX_NAMED_COMMITS));
        }
        return Ok(SafetyVerdict::blocked(reason, blocking));
    }

    if candidate_ids.contains(tip.as_str()) {
        return Ok(SafetyVerdict::safe("candidates form the tip of the branch"));
    }

    for id in &resolved {
        if !git.is_ancestor(id, &tip)? {
            return Ok(SafetyVerdict::refused(
                "candidate is not on the current branch history",
            ));
        }
    }

    Ok(SafetyVerdict::safe("no commits depend on the candidates"))
}
