#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
//! Engine for safely deleting a user's own commits from hosted Git repositories.
//!
//! Each repository is cloned into a temporary workspace, checked for commits
//! that deletion would destroy, and, once a [`DecisionProvider`] approves,
//! rewritten and force-published with a lease on the tip observed at clone
//! time. The CLI binary in `crates/scrub` builds on top of this library.

/// Credentials, remote locations and engine settings.
mod config;
/// Error type shared by the engine.
mod error;
/// Typed wrappers over git commands.
mod git;
/// Cooperative stop flag.
mod interrupt;
/// Per-repository workflow and run bookkeeping.
mod orchestrator;
/// Local history rewrite and publish.
mod rewrite;
/// Subprocess execution with timeouts.
mod runner;
/// Deletion safety check.
mod safety;
/// JSON candidate source and result recorder.
mod store;
/// Records exchanged between the engine and its callers.
mod types;
/// Temporary clones.
mod workspace;

pub use config::{Credential, DEFAULT_HOST, EngineConfig, REDACTED, Remote};
pub use error::{Result, ScrubError};
pub use git::{Git, classify, version};
pub use interrupt::Interrupt;
pub use orchestrator::{
    Decision, DecisionProvider, DecisionRequest, NoopObserver, Orchestrator, REASON_DECLINED,
    REASON_INTERRUPTED, REASON_SKIPPED, RepositoryCheck, ResultRecorder, RunObserver,
};
pub use rewrite::rewrite_history;
pub use runner::{CommandOutput, CommandRunner, DEFAULT_TIMEOUT, SystemRunner};
pub use safety::check_safety;
pub use store::{JsonRecorder, load_candidates, parse_candidates};
pub use types::{
    CandidateCommit, CommitDetails, CommitGroup, CommitOutcome, CommitStatus, DeferredCommit,
    EPOCH_TIMESTAMP, MESSAGE_SUMMARY_LEN, RepositoryReport, RepositoryState, RewriteResult,
    RewriteStatus, RunReport, RunStatistics, SafetyVerdict, short_id, summary_line,
};
pub use workspace::Workspace;
