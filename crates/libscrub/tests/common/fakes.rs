//! Stand-ins for the engine's seams: a runner with injected faults, scripted
//! decisions and an in-memory recorder.

use std::{cell::RefCell, collections::VecDeque, path::Path, time::Duration};

use libscrub::{
    CommandOutput, CommandRunner, Decision, DecisionProvider, DecisionRequest, DeferredCommit,
    Interrupt, Result, ResultRecorder, RewriteResult, RunStatistics, ScrubError, SystemRunner,
};

/// A failure injected in place of a real command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The command times out.
    Timeout,
    /// The command exits with status 1 and the given stderr.
    Fail {
        /// Text written to stderr.
        stderr: String,
    },
}

/// A runner that forwards to git, except for commands matching a scripted fault.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    /// Runner used for commands without a fault.
    inner: SystemRunner,
    /// Argument prefixes paired with the fault they trigger.
    faults: RefCell<Vec<(Vec<String>, Fault)>>,
    /// Every argument list seen, in order.
    calls: RefCell<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    /// A runner with no faults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every command whose arguments start with `prefix`.
    pub fn fail_on(&self, prefix: &[&str], fault: Fault) {
        self.faults
            .borrow_mut()
            .push((prefix.iter().map(|s| s.to_string()).collect(), fault));
    }

    /// Every argument list run so far.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    /// Whether any command with this subcommand has run.
    pub fn invoked(&self, subcommand: &str) -> bool {
        self.calls
            .borrow()
            .iter()
            .any(|args| args.first().is_some_and(|a| a == subcommand))
    }

    /// The fault matching `args`, if any.
    fn fault_for(&self, args: &[&str]) -> Option<Fault> {
        self.faults
            .borrow()
            .iter()
            .find(|(prefix, _)| {
                prefix.len() <= args.len() && prefix.iter().zip(args).all(|(p, a)| p == a)
            })
            .map(|(_, fault)| fault.clone())
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, args: &[&str], cwd: Option<&Path>, timeout: Duration) -> Result<CommandOutput> {
        self.calls
            .borrow_mut()
            .push(args.iter().map(|s| s.to_string()).collect());
        match self.fault_for(args) {
            Some(Fault::Timeout) => Err(ScrubError::TransientCommand(format!(
                "git {} timed out after {}s",
                args.first().copied().unwrap_or_default(),
                timeout.as_secs()
            ))),
            Some(Fault::Fail { stderr }) => Ok(CommandOutput {
                success: false,
                code: Some(1),
                stdout: String::new(),
                stderr,
            }),
            None => self.inner.run(args, cwd, timeout),
        }
    }
}

/// Decisions replayed from a script.
#[derive(Debug, Default)]
pub struct ScriptedDecisions {
    /// Decisions still to hand out.
    queue: VecDeque<Decision>,
    /// Answer once the queue is empty.
    fallback: Option<Decision>,
    /// Repositories asked about, in order.
    asked: Vec<String>,
    /// Flag raised while each question is pending.
    interrupt: Option<Interrupt>,
}

impl ScriptedDecisions {
    /// Answer every request with `decision`.
    pub fn always(decision: Decision) -> Self {
        Self {
            fallback: Some(decision),
            ..Self::default()
        }
    }

    /// Answer requests in order, declining once the list runs out.
    pub fn sequence(decisions: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            queue: decisions.into_iter().collect(),
            fallback: Some(Decision::Decline),
            ..Self::default()
        }
    }

    /// Raise `interrupt` whenever a decision is requested, as a Ctrl+C at the
    /// prompt would.
    pub fn interrupting(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Repositories that reached the decision step.
    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl DecisionProvider for ScriptedDecisions {
    fn decide(&mut self, request: &DecisionRequest<'_>) -> Result<Decision> {
        self.asked.push(request.repository.to_string());
        if let Some(interrupt) = &self.interrupt {
            interrupt.raise();
        }
        Ok(self
            .queue
            .pop_front()
            .or(self.fallback)
            .unwrap_or(Decision::Decline))
    }
}

/// Keeps every recorded outcome in memory.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    /// Recorded rewrite results.
    pub results: Vec<RewriteResult>,
    /// Recorded deferred commits.
    pub deferred: Vec<DeferredCommit>,
    /// Final counters, once the run finished.
    pub statistics: Option<RunStatistics>,
}

impl ResultRecorder for MemoryRecorder {
    fn record_result(&mut self, result: &RewriteResult) -> Result<()> {
        self.results.push(result.clone());
        Ok(())
    }

    fn record_deferred(&mut self, commits: &[DeferredCommit]) -> Result<()> {
        self.deferred.extend_from_slice(commits);
        Ok(())
    }

    fn finish(&mut self, statistics: &RunStatistics) -> Result<()> {
        self.statistics = Some(statistics.clone());
        Ok(())
    }
}
