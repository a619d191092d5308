use std::path::PathBuf;

use anyhow::Result;
use libscrub::{
    Decision, DecisionProvider, JsonRecorder, Orchestrator, Remote, RunReport, ScrubError,
};

use super::{Context, EXIT_OK};
use crate::ui::{ProgressRenderer, TerminalDecisions, Unattended, emit, render_summary};

/// Exit code when a rewrite failed without changing anything.
const EXIT_FAILED: i32 = 1;

/// Exit code when a remote kept its old history; same as a publish conflict.
const EXIT_PARTIAL: i32 = 6;

/// Parameters for the `scrub delete` command.
pub struct DeleteRequest {
    /// Approve every safe deletion without asking.
    pub yes: bool,
    /// Run report destination.
    pub report_path: PathBuf,
    /// Retry seed destination.
    pub retry_path: PathBuf,
}

/// Exit code summarizing a finished run.
fn exit_code(report: &RunReport) -> i32 {
    if report.statistics.partial_repos > 0 {
        EXIT_PARTIAL
    } else if report.statistics.failed_repos > 0 {
        EXIT_FAILED
    } else {
        EXIT_OK
    }
}

/// Run the `scrub delete` command logic.
pub fn delete(ctx: &Context<'_>, request: &DeleteRequest) -> Result<i32> {
    if matches!(ctx.config.remote, Remote::Https { .. }) && ctx.config.credential.is_empty() {
        return Err(ScrubError::Authentication(
            "a token is required to publish: pass --token or set GITHUB_TOKEN".to_string(),
        )
        .into());
    }

    let runner = ctx.runner()?;
    let candidates = ctx.candidates()?;

    let mut decider: Box<dyn DecisionProvider + '_> = if request.yes {
        Box::new(Unattended::new(Decision::Approve))
    } else if ctx.no_prompt {
        Box::new(Unattended::new(Decision::Decline))
    } else {
        Box::new(TerminalDecisions::new(ctx.output))
    };
    let mut recorder = JsonRecorder::new(&request.report_path, &request.retry_path);

    let mut orchestrator = Orchestrator::new(ctx.config.clone(), &runner)
        .with_interrupt(ctx.interrupt.clone())
        .with_observer(ProgressRenderer::new(ctx.output));
    let report = orchestrator.run(candidates, decider.as_mut(), &mut recorder)?;

    render_summary(ctx.output, &report)?;
    emit(ctx.output.message(&format!(
        "Report written to {}",
        recorder.report_path().display()
    )))?;
    if recorder.has_retry_file() {
        emit(ctx.output.message(&format!(
            "Commits kept for later written to {} (rerun with --input {})",
            recorder.retry_path().display(),
            recorder.retry_path().display()
        )))?;
    }
    if ctx.interrupt.is_raised() {
        emit(ctx.output.warn("Run interrupted; remaining repositories were kept for later"))?;
    }

    Ok(exit_code(&report))
}
