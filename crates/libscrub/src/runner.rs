use std::{
    io::{ErrorKind, Read},
    path::Path,
    process::{Command, Stdio},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

#[cfg(unix)]
use std::os::unix::process::CommandExt;

use tracing::{debug, warn};

use crate::error::{Result, ScrubError};

/// Default upper bound for a single command (clones of large repositories
/// can take minutes).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// How often a running child is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the command exited with status zero.
    pub success: bool,
    /// Exit code, when the process exited normally.
    pub code: Option<i32>,
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

/// Narrow interface for running version-control commands.
///
/// A non-zero exit is reported through [`CommandOutput::success`], not as an
/// error. Errors are reserved for commands that could not run to completion:
/// spawn failures and timeouts ([`ScrubError::TransientCommand`]).
pub trait CommandRunner {
    /// Run the program with `args` in `cwd`, bounded by `timeout`.
    fn run(&self, args: &[&str], cwd: Option<&Path>, timeout: Duration) -> Result<CommandOutput>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    /// Program to execute.
    program: String,
}

impl SystemRunner {
    /// Runner for an arbitrary program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Runner for the `git` executable on `PATH`.
    pub fn git() -> Self {
        Self::new("git")
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::git()
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, args: &[&str], cwd: Option<&Path>, timeout: Duration) -> Result<CommandOutput> {
        // Only the subcommand is logged: later arguments may carry a credential.
        let subcommand = args.first().copied().unwrap_or_default();
        debug!(program = %self.program, subcommand, cwd = ?cwd, "running command");

        let mut command = Command::new(&self.program);
        command
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        // A separate process group keeps a terminal Ctrl+C from reaching the
        // child, so an in-flight push is never torn down halfway.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ScrubError::GitUnavailable(format!("{}: {e}", self.program))
            } else {
                ScrubError::Io(e)
            }
        })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break Some(status);
            }
            if started.elapsed() >= timeout {
                if let Err(e) = child.kill() {
                    warn!(subcommand, error = %e, "failed to kill timed-out command");
                }
                child.wait()?;
                break None;
            }
            thread::sleep(POLL_INTERVAL);
        };

        let Some(status) = status else {
            // Grandchildren may still hold the pipes open; the reader threads
            // are left to finish on their own.
            return Err(ScrubError::TransientCommand(format!(
                "{} {subcommand} timed out after {}s",
                self.program,
                timeout.as_secs()
            )));
        };

        Ok(CommandOutput {
            success: status.success(),
            code: status.code(),
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    }
}

/// Read a child pipe to the end on a helper thread.
fn drain<R: Read + Send + 'static>(source: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut source) = source {
            source.read_to_end(&mut buf).ok();
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Join a reader thread, treating a panicked reader as empty output.
fn collect(handle: JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captures_stdout_of_successful_command() -> Result<()> {
        let output = SystemRunner::git().run(&["--version"], None, DEFAULT_TIMEOUT)?;
        assert!(output.success);
        assert_eq!(output.code, Some(0));
        assert!(output.stdout.starts_with("git version"));
        Ok(())
    }

    #[test]
    fn test_nonzero_exit_is_not_an_error() -> Result<()> {
        let output = SystemRunner::git().run(&["no-such-subcommand"], None, DEFAULT_TIMEOUT)?;
        assert!(!output.success);
        assert!(!output.stderr.is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_program_is_reported() {
        let result = SystemRunner::new("scrub-definitely-missing-binary").run(
            &[],
            None,
            DEFAULT_TIMEOUT,
        );
        assert!(matches!(result, Err(ScrubError::GitUnavailable(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_is_transient_failure() {
        let started = Instant::now();
        let result = SystemRunner::new("sleep").run(&["5"], None, Duration::from_millis(200));
        assert!(matches!(result, Err(ScrubError::TransientCommand(_))));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
