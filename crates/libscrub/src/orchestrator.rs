use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::{
    config::EngineConfig,
    error::Result,
    interrupt::Interrupt,
    rewrite::rewrite_history,
    runner::CommandRunner,
    safety::check_safety,
    types::{
        CandidateCommit, CommitDetails, CommitGroup, DeferredCommit, RepositoryReport,
        RepositoryState, RewriteResult, RewriteStatus, RunReport, RunStatistics, SafetyVerdict,
    },
    workspace::Workspace,
};

/// Deferral reason for repositories left untouched by an interrupt.
pub const REASON_INTERRUPTED: &str = "run interrupted";
/// Deferral reason when the user declines a deletion.
pub const REASON_DECLINED: &str = "declined by user";
/// Deferral reason when the user skips a repository.
pub const REASON_SKIPPED: &str = "skipped by user";

/// The human decision for one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Delete the commits.
    Approve,
    /// Do not delete; keep the commits for a later run.
    Decline,
    /// Leave the repository for later without judging it.
    Skip,
}

/// Everything shown to the decision provider for one repository.
#[derive(Debug)]
pub struct DecisionRequest<'r> {
    /// Repository in `owner/name` form.
    pub repository: &'r str,
    /// Candidates that would be deleted.
    pub commits: &'r [CandidateCommit],
    /// The (safe) verdict for the candidates.
    pub verdict: &'r SafetyVerdict,
    /// Per-commit preview, in candidate order.
    pub details: &'r [CommitDetails],
    /// One-based position of the repository in the run.
    pub position: usize,
    /// Number of repositories in the run.
    pub total: usize,
}

/// Source of per-repository approval.
pub trait DecisionProvider {
    /// Decide what to do with a repository whose deletion is safe.
    fn decide(&mut self, request: &DecisionRequest<'_>) -> Result<Decision>;
}

/// Sink for run outcomes.
pub trait ResultRecorder {
    /// Record the result of one rewrite.
    fn record_result(&mut self, result: &RewriteResult) -> Result<()>;
    /// Record commits deferred to a later run.
    fn record_deferred(&mut self, commits: &[DeferredCommit]) -> Result<()>;
    /// Called once with the final counters.
    fn finish(&mut self, statistics: &RunStatistics) -> Result<()>;
}

/// Progress hooks for frontends. Every method defaults to doing nothing.
pub trait RunObserver {
    /// A repository is about to be cloned.
    fn repository_started(
        &mut self,
        _repository: &str,
        _commits: usize,
        _position: usize,
        _total: usize,
    ) {
    }
    /// The safety check finished.
    fn verdict_reached(&mut self, _repository: &str, _verdict: &SafetyVerdict) {}
    /// An approved rewrite is starting.
    fn rewrite_started(&mut self, _repository: &str) {}
    /// Processing of a repository ended.
    fn repository_finished(
        &mut self,
        _report: &RepositoryReport,
        _result: Option<&RewriteResult>,
    ) {
    }
}

/// Observer that ignores every event.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Safety verdict for one repository from a read-only check.
#[derive(Debug, Clone)]
pub struct RepositoryCheck {
    /// Repository in `owner/name` form.
    pub repository: String,
    /// Distinct candidates in the repository.
    pub commits: Vec<CandidateCommit>,
    /// Verdict; a clone failure is reported as a refusal.
    pub verdict: SafetyVerdict,
}

/// How processing of one group ended.
enum GroupOutcome {
    /// Nothing was rewritten; every listed commit is deferred.
    Deferred(RepositoryState, String, Vec<CandidateCommit>),
    /// The rewrite step ran.
    Rewritten(RewriteResult),
}

/// Drives the per-repository workflow over a batch of candidates.
pub struct Orchestrator<'a> {
    /// Settings shared by every repository.
    config: EngineConfig,
    /// Runner for every git invocation.
    runner: &'a dyn CommandRunner,
    /// Stop flag checked between repositories and after each decision.
    interrupt: Interrupt,
    /// Progress hooks.
    observer: Box<dyn RunObserver + 'a>,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator with no interrupt source and no observer.
    pub fn new(config: EngineConfig, runner: &'a dyn CommandRunner) -> Self {
        Self {
            config,
            runner,
            interrupt: Interrupt::new(),
            observer: Box::new(NoopObserver),
        }
    }

    /// Use `interrupt` as the stop flag.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Report progress to `observer`.
    pub fn with_observer(mut self, observer: impl RunObserver + 'a) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Clone every repository and run the safety check without changing anything.
    ///
    /// Repositories not reached because of an interrupt are reported as
    /// refused with [`REASON_INTERRUPTED`].
    pub fn check(&mut self, candidates: Vec<CandidateCommit>) -> Result<Vec<RepositoryCheck>> {
        let groups = validated_groups(candidates)?;
        let total = groups.len();
        let mut checks = Vec::with_capacity(total);

        for (index, group) in groups.into_iter().enumerate() {
            if self.interrupt.is_raised() {
                checks.push(RepositoryCheck {
                    repository: group.repository,
                    commits: group.commits,
                    verdict: SafetyVerdict::refused(REASON_INTERRUPTED),
                });
                continue;
            }
            self.observer
                .repository_started(&group.repository, group.len(), index + 1, total);
            let (commits, verdict) =
                match Workspace::acquire(&group.repository, &self.config, self.runner) {
                    Ok(workspace) => {
                        let commits = collapse_aliases(&workspace, group.commits);
                        let verdict = check_safety(&workspace, &commits);
                        release(workspace);
                        (commits, verdict)
                    }
                    Err(e) => (
                        group.commits,
                        SafetyVerdict::refused(format!("clone failed: {e}")),
                    ),
                };
            self.observer.verdict_reached(&group.repository, &verdict);
            checks.push(RepositoryCheck {
                repository: group.repository,
                commits,
                verdict,
            });
        }

        Ok(checks)
    }

    /// Process every repository in turn and report what happened.
    ///
    /// Candidates are validated before any repository is touched. A failure in
    /// one repository never stops the run; only recorder errors do.
    pub fn run(
        &mut self,
        candidates: Vec<CandidateCommit>,
        decider: &mut dyn DecisionProvider,
        recorder: &mut dyn ResultRecorder,
    ) -> Result<RunReport> {
        let groups = validated_groups(candidates)?;
        let total = groups.len();
        let mut report = RunReport {
            statistics: RunStatistics {
                total_repos: total,
                total_commits: groups.iter().map(CommitGroup::len).sum(),
                ..RunStatistics::default()
            },
            ..RunReport::default()
        };
        info!(
            repositories = total,
            commits = report.statistics.total_commits,
            "starting run"
        );

        for (index, group) in groups.iter().enumerate() {
            let outcome = if self.interrupt.is_raised() {
                GroupOutcome::Deferred(
                    RepositoryState::Interrupted,
                    REASON_INTERRUPTED.to_string(),
                    group.commits.clone(),
                )
            } else {
                self.observer
                    .repository_started(&group.repository, group.len(), index + 1, total);
                self.process(group, index + 1, total, decider)
            };

            let (entry, result) = match outcome {
                GroupOutcome::Deferred(state, reason, commits) => {
                    let deferred: Vec<DeferredCommit> = commits
                        .iter()
                        .map(|c| DeferredCommit::from_candidate(c, &reason))
                        .collect();
                    recorder.record_deferred(&deferred)?;
                    let stats = &mut report.statistics;
                    stats.total_commits -= group.len() - deferred.len();
                    stats.skipped_repos += 1;
                    stats.skipped_commits += deferred.len();
                    let entry = RepositoryReport {
                        repository: group.repository.clone(),
                        commits: deferred.len(),
                        state,
                        reason: Some(reason),
                    };
                    report.deferred.extend(deferred);
                    (entry, None)
                }
                GroupOutcome::Rewritten(result) => {
                    recorder.record_result(&result)?;
                    let stats = &mut report.statistics;
                    stats.total_commits -= group.len() - result.total_commits;
                    stats.processed_repos += 1;
                    match result.status {
                        RewriteStatus::Success => stats.deleted_commits += result.deleted_commits,
                        RewriteStatus::Partial => stats.partial_repos += 1,
                        RewriteStatus::Failed => stats.failed_repos += 1,
                    }
                    let entry = RepositoryReport {
                        repository: group.repository.clone(),
                        commits: result.total_commits,
                        state: RepositoryState::Rewritten(result.status),
                        reason: result.error_message.clone(),
                    };
                    (entry, Some(result))
                }
            };

            self.observer.repository_finished(&entry, result.as_ref());
            report.repositories.push(entry);
            if let Some(result) = result {
                report.results.push(result);
            }
        }

        recorder.finish(&report.statistics)?;
        info!(
            processed = report.statistics.processed_repos,
            skipped = report.statistics.skipped_repos,
            deleted = report.statistics.deleted_commits,
            "run finished"
        );
        Ok(report)
    }

    /// Clone, check, ask and rewrite a single repository.
    fn process(
        &mut self,
        group: &CommitGroup,
        position: usize,
        total: usize,
        decider: &mut dyn DecisionProvider,
    ) -> GroupOutcome {
        let repository = group.repository.as_str();
        let workspace = match Workspace::acquire(repository, &self.config, self.runner) {
            Ok(workspace) => workspace,
            Err(e) => {
                warn!(repository, error = %e, "clone failed");
                return GroupOutcome::Deferred(
                    RepositoryState::CloneFailed,
                    format!("clone failed: {e}"),
                    group.commits.clone(),
                );
            }
        };

        let commits = collapse_aliases(&workspace, group.commits.clone());
        let verdict = check_safety(&workspace, &commits);
        self.observer.verdict_reached(repository, &verdict);
        if !verdict.is_safe {
            release(workspace);
            return GroupOutcome::Deferred(
                RepositoryState::Unsafe,
                format!("unsafe: {}", verdict.reason),
                commits,
            );
        }

        let details = preview(&workspace, &commits);
        let request = DecisionRequest {
            repository,
            commits: &commits,
            verdict: &verdict,
            details: &details,
            position,
            total,
        };
        let decision = match decider.decide(&request) {
            Ok(decision) => decision,
            Err(e) => {
                warn!(repository, error = %e, "decision failed; declining");
                Decision::Decline
            }
        };

        let (state, reason) = if self.interrupt.is_raised() {
            (RepositoryState::Interrupted, REASON_INTERRUPTED)
        } else {
            match decision {
                Decision::Approve => {
                    self.observer.rewrite_started(repository);
                    let result = rewrite_history(&workspace, &commits);
                    release(workspace);
                    return GroupOutcome::Rewritten(result);
                }
                Decision::Decline => {
                    warn!(repository, "deletion declined");
                    (RepositoryState::Declined, REASON_DECLINED)
                }
                Decision::Skip => {
                    info!(repository, "repository skipped");
                    (RepositoryState::Skipped, REASON_SKIPPED)
                }
            }
        };
        release(workspace);
        GroupOutcome::Deferred(state, reason.to_string(), commits)
    }
}

/// Validate every candidate, then group them by repository.
fn validated_groups(candidates: Vec<CandidateCommit>) -> Result<Vec<CommitGroup>> {
    for candidate in &candidates {
        candidate.validate()?;
    }
    Ok(CommitGroup::group(candidates))
}

/// Drop candidates naming a commit already listed under another spelling,
/// such as a full hash and its abbreviation. Unresolvable candidates are kept
/// so the safety check can refuse them.
fn collapse_aliases(
    workspace: &Workspace<'_>,
    commits: Vec<CandidateCommit>,
) -> Vec<CandidateCommit> {
    let git = workspace.git();
    let mut seen = HashSet::new();
    commits
        .into_iter()
        .filter(|commit| match git.resolve_commit(&commit.commit_id) {
            Ok(Some(id)) if !seen.insert(id.clone()) => {
                debug!(
                    repository = workspace.repository(),
                    commit = %commit.commit_id,
                    "dropping duplicate spelling of a candidate"
                );
                false
            }
            _ => true,
        })
        .collect()
}

/// Collect preview details, falling back to the candidate record when git
/// cannot describe a commit.
fn preview(workspace: &Workspace<'_>, commits: &[CandidateCommit]) -> Vec<CommitDetails> {
    let git = workspace.git();
    commits
        .iter()
        .map(|commit| {
            git.commit_details(&commit.commit_id)
                .unwrap_or_else(|_| CommitDetails {
                    commit_id: commit.commit_id.clone(),
                    subject: commit.message.lines().next().unwrap_or_default().to_string(),
                    author: commit.author.clone().unwrap_or_default(),
                    date: commit.timestamp.clone(),
                    files: Vec::new(),
                })
        })
        .collect()
}

/// Remove a workspace, logging rather than failing if cleanup goes wrong.
fn release(workspace: Workspace<'_>) {
    let repository = workspace.repository().to_string();
    if let Err(e) = workspace.release() {
        warn!(repository, error = %e, "failed to remove workspace");
    }
}
