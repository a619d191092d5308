use anyhow::Result;
use libscrub::{Orchestrator, RepositoryCheck};
use scrub_term::Output;

use super::{Context, EXIT_OK};
use crate::ui::{emit, plural, render_blocking};

/// Exit code when any repository is unsafe; same as an unsafe operation.
const EXIT_UNSAFE: i32 = 2;

/// Print one repository's verdict.
fn render_check(output: &dyn Output, check: &RepositoryCheck) -> Result<()> {
    let commits = plural(check.commits.len(), "commit");
    if check.verdict.is_safe {
        emit(output.success(&format!(
            "{} ({commits}): safe: {}",
            check.repository, check.verdict.reason
        )))
    } else {
        emit(output.fail(&format!(
            "{} ({commits}): unsafe: {}",
            check.repository, check.verdict.reason
        )))?;
        render_blocking(output, &check.verdict)
    }
}

/// Run the `scrub check` command logic.
///
/// Exits non-zero when any repository could not be deleted safely or was not
/// checked because of an interrupt.
pub fn check(ctx: &Context<'_>) -> Result<i32> {
    let runner = ctx.runner()?;
    let candidates = ctx.candidates()?;

    let mut orchestrator =
        Orchestrator::new(ctx.config.clone(), &runner).with_interrupt(ctx.interrupt.clone());
    let checks = orchestrator.check(candidates)?;

    for check in &checks {
        render_check(ctx.output, check)?;
    }

    let unsafe_count = checks.iter().filter(|c| !c.verdict.is_safe).count();
    emit(ctx.output.message(&format!(
        "{} safe, {unsafe_count} unsafe",
        checks.len() - unsafe_count
    )))?;

    if ctx.interrupt.is_raised() {
        emit(ctx.output.warn("Check interrupted; unchecked repositories are reported as unsafe"))?;
    }

    if unsafe_count > 0 {
        Ok(EXIT_UNSAFE)
    } else {
        Ok(EXIT_OK)
    }
}
