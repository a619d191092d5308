use std::path::PathBuf;

use anyhow::{Context as _, Result};
use libscrub::{CandidateCommit, EngineConfig, Interrupt, SystemRunner, load_candidates};
use scrub_term::Output;
use tracing::debug;

use crate::ui::{emit, plural};

/// Read-only safety report.
pub mod check;
/// Interactive deletion run.
pub mod delete;

/// Exit code when every repository was handled cleanly.
pub const EXIT_OK: i32 = 0;

/// Everything a command needs from the command line.
pub struct Context<'o> {
    /// User-facing output.
    pub output: &'o dyn Output,
    /// Engine settings.
    pub config: EngineConfig,
    /// Candidate commits file.
    pub input: PathBuf,
    /// Never prompt.
    pub no_prompt: bool,
    /// Raised by Ctrl+C.
    pub interrupt: Interrupt,
}

impl Context<'_> {
    /// Make sure git can be started before touching any repository.
    pub fn runner(&self) -> Result<SystemRunner> {
        let runner = SystemRunner::git();
        let version = libscrub::version(&runner, self.config.command_timeout)?;
        debug!(version, "found git");
        Ok(runner)
    }

    /// Load and announce the candidate commits.
    pub fn candidates(&self) -> Result<Vec<CandidateCommit>> {
        let candidates = load_candidates(&self.input)
            .with_context(|| format!("loading {}", self.input.display()))?;
        emit(self.output.message(&format!(
            "Loaded {} from {}",
            plural(candidates.len(), "commit"),
            self.input.display()
        )))?;
        Ok(candidates)
    }
}
