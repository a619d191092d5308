use std::{io, result::Result as StdResult};

use anyhow::Result;
use libscrub::{
    Decision, DecisionProvider, DecisionRequest, RepositoryReport, RepositoryState,
    RewriteResult, RewriteStatus, RunObserver, RunReport, SafetyVerdict, ScrubError, short_id,
};
use scrub_term::{Choice, Output, OutputError, Spinner};

/// Blocking commits listed before the rest are summarized.
const MAX_LISTED_COMMITS: usize = 5;

/// Files listed per commit in the preview.
const MAX_LISTED_FILES: usize = 10;

/// Emit an output result, turning output failures into errors.
pub fn emit(result: StdResult<(), OutputError>) -> Result<()> {
    result.map_err(|e| anyhow::anyhow!("Output operation failed: {e}"))
}

/// Pluralize `noun` for `count`.
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// List the commits an unsafe verdict would destroy.
pub fn render_blocking(output: &dyn Output, verdict: &SafetyVerdict) -> Result<()> {
    let ids = &verdict.blocking_commit_ids;
    if ids.is_empty() {
        return Ok(());
    }
    let section = output.section("would also erase:");
    for id in ids.iter().take(MAX_LISTED_COMMITS) {
        emit(section.message(short_id(id)))?;
    }
    if ids.len() > MAX_LISTED_COMMITS {
        emit(section.message(&format!("... and {} more", ids.len() - MAX_LISTED_COMMITS)))?;
    }
    Ok(())
}

/// Asks the user at the terminal before every rewrite.
pub struct TerminalDecisions<'o> {
    /// Where the preview and prompt are shown.
    output: &'o dyn Output,
}

impl<'o> TerminalDecisions<'o> {
    /// Prompt through `output`.
    pub fn new(output: &'o dyn Output) -> Self {
        Self { output }
    }

    /// Show what is about to be deleted.
    fn preview(&self, request: &DecisionRequest<'_>) -> Result<()> {
        let section = self.output.section(&format!(
            "{} ({} of {}): {}",
            request.repository,
            request.position,
            request.total,
            plural(request.commits.len(), "commit")
        ));
        for details in request.details {
            let commit = section.section(&format!(
                "{}  {}",
                short_id(&details.commit_id),
                details.subject
            ));
            emit(commit.item("author", &details.author))?;
            emit(commit.item("date", &details.date))?;
            if !details.files.is_empty() {
                let mut files: Vec<String> =
                    details.files.iter().take(MAX_LISTED_FILES).cloned().collect();
                if details.files.len() > MAX_LISTED_FILES {
                    files.push(format!(
                        "... and {} more",
                        details.files.len() - MAX_LISTED_FILES
                    ));
                }
                emit(commit.item("files", &files.join(", ")))?;
            }
        }
        emit(section.success(&format!("safe: {}", request.verdict.reason)))
    }
}

impl DecisionProvider for TerminalDecisions<'_> {
    fn decide(&mut self, request: &DecisionRequest<'_>) -> libscrub::Result<Decision> {
        self.preview(request)
            .map_err(|e| ScrubError::Io(io::Error::other(e.to_string())))?;

        let choices = [
            Choice::new('y', "Delete and force-push"),
            Choice::new('n', "Keep, retry later"),
            Choice::new('s', "Skip this repository"),
        ];
        let prompt = format!(
            "Delete {} from {}?",
            plural(request.commits.len(), "commit"),
            request.repository
        );
        match self.output.select(&prompt, &choices) {
            Ok(0) => Ok(Decision::Approve),
            Ok(2) => Ok(Decision::Skip),
            Ok(_) | Err(OutputError::Cancelled) => Ok(Decision::Decline),
            Err(OutputError::Io(e)) => Err(ScrubError::Io(e)),
            Err(e) => Err(ScrubError::Io(io::Error::other(e.to_string()))),
        }
    }
}

/// Answers every request the same way without asking.
pub struct Unattended {
    /// The fixed answer.
    decision: Decision,
}

impl Unattended {
    /// Always answer `decision`.
    pub fn new(decision: Decision) -> Self {
        Self { decision }
    }
}

impl DecisionProvider for Unattended {
    fn decide(&mut self, _request: &DecisionRequest<'_>) -> libscrub::Result<Decision> {
        Ok(self.decision)
    }
}

/// Renders run progress: spinners while git works, one line per outcome.
pub struct ProgressRenderer<'o> {
    /// Where progress is shown.
    output: &'o dyn Output,
    /// Spinner for the step in flight.
    spinner: Option<Spinner>,
}

impl<'o> ProgressRenderer<'o> {
    /// Render through `output`.
    pub fn new(output: &'o dyn Output) -> Self {
        Self {
            output,
            spinner: None,
        }
    }

    /// Stop the current spinner, if any.
    fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish();
        }
    }

    /// Print the outcome line for a finished repository.
    fn render_outcome(
        &self,
        report: &RepositoryReport,
        result: Option<&RewriteResult>,
    ) -> Result<()> {
        let reason = report.reason.as_deref().unwrap_or_default();
        let name = &report.repository;
        match report.state {
            RepositoryState::Rewritten(RewriteStatus::Success) => {
                let deleted = result.map_or(report.commits, |r| r.deleted_commits);
                emit(self.output.success(&format!(
                    "{name}: deleted {} and published",
                    plural(deleted, "commit")
                )))
            }
            RepositoryState::Rewritten(RewriteStatus::Partial) => emit(self.output.fail(&format!(
                "{name}: PARTIAL: history rewritten locally but the remote was not updated: {reason}"
            ))),
            RepositoryState::Rewritten(RewriteStatus::Failed) => {
                emit(self.output.fail(&format!("{name}: failed, nothing changed: {reason}")))
            }
            RepositoryState::CloneFailed | RepositoryState::Interrupted => {
                emit(self.output.warn(&format!("{name}: {reason}")))
            }
            RepositoryState::Unsafe => Ok(()),
            RepositoryState::Declined | RepositoryState::Skipped => {
                emit(self.output.message(&format!("{name}: {reason}")))
            }
        }
    }
}

impl RunObserver for ProgressRenderer<'_> {
    fn repository_started(
        &mut self,
        repository: &str,
        commits: usize,
        position: usize,
        total: usize,
    ) {
        self.stop_spinner();
        self.spinner = Some(self.output.spinner(&format!(
            "[{position}/{total}] cloning {repository} ({})",
            plural(commits, "commit")
        )));
    }

    fn verdict_reached(&mut self, repository: &str, verdict: &SafetyVerdict) {
        self.stop_spinner();
        if verdict.is_safe {
            return;
        }
        self.output
            .fail(&format!("{repository}: unsafe, skipping: {}", verdict.reason))
            .ok();
        render_blocking(self.output, verdict).ok();
    }

    fn rewrite_started(&mut self, repository: &str) {
        self.stop_spinner();
        self.spinner = Some(
            self.output
                .spinner(&format!("rewriting and publishing {repository}")),
        );
    }

    fn repository_finished(&mut self, report: &RepositoryReport, result: Option<&RewriteResult>) {
        self.stop_spinner();
        self.render_outcome(report, result).ok();
    }
}

/// Print the end-of-run summary, itemizing every repository that needs attention.
pub fn render_summary(output: &dyn Output, report: &RunReport) -> Result<()> {
    let stats = &report.statistics;
    let section = output.section("Summary");
    emit(section.item(
        "repositories",
        &format!(
            "{} total, {} rewritten, {} kept for later",
            stats.total_repos, stats.processed_repos, stats.skipped_repos
        ),
    ))?;
    emit(section.item(
        "commits",
        &format!(
            "{} total, {} deleted, {} kept for later",
            stats.total_commits, stats.deleted_commits, stats.skipped_commits
        ),
    ))?;

    let partial: Vec<&RepositoryReport> = report
        .repositories
        .iter()
        .filter(|r| r.state == RepositoryState::Rewritten(RewriteStatus::Partial))
        .collect();
    if !partial.is_empty() {
        let attention = section.section("Remote NOT updated (local rewrite only):");
        for entry in partial {
            emit(attention.fail(&format!(
                "{}: {}",
                entry.repository,
                entry.reason.as_deref().unwrap_or_default()
            )))?;
        }
    }

    let mut others = report
        .repositories
        .iter()
        .filter(|r| {
            matches!(
                r.state,
                RepositoryState::Unsafe
                    | RepositoryState::CloneFailed
                    | RepositoryState::Rewritten(RewriteStatus::Failed)
            )
        })
        .peekable();
    if others.peek().is_some() {
        let attention = section.section("Not deleted:");
        for entry in others {
            emit(attention.warn(&format!(
                "{} ({}): {}",
                entry.repository,
                entry.state,
                entry.reason.as_deref().unwrap_or_default()
            )))?;
        }
    }

    Ok(())
}
