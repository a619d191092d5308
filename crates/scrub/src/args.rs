use std::{path::PathBuf, time::Duration};

use clap::{ArgAction, ArgGroup, Parser, Subcommand};
use libscrub::{Credential, DEFAULT_HOST, EngineConfig, Remote};
use tracing::Level;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("color_mode")
        .args(["color", "no_color"])
))]
/// Top-level CLI options for scrub.
pub struct Cli {
    /// Token with write access, used for clone and push
    #[arg(
        long,
        global = true,
        env = "GITHUB_TOKEN",
        hide_env_values = true,
        value_name = "TOKEN"
    )]
    pub token: Option<String>,

    /// Hosting platform to clone from
    #[arg(long, global = true, default_value = DEFAULT_HOST, value_name = "HOST")]
    pub host: String,

    /// Clone from bare repositories under DIR (<owner>/<name>.git) instead of a host
    #[arg(long, global = true, value_name = "DIR", conflicts_with = "host")]
    pub remote_dir: Option<PathBuf>,

    /// Upper bound for each git command, in seconds
    #[arg(
        long,
        global = true,
        env = "SCRUB_TIMEOUT_SECS",
        default_value_t = 300,
        value_name = "SECS"
    )]
    pub timeout_secs: u64,

    /// Candidate commits file
    #[arg(
        short,
        long,
        global = true,
        default_value = "commits.json",
        value_name = "FILE"
    )]
    pub input: PathBuf,

    /// Enable colored output
    #[arg(long, global = true)]
    pub color: bool,

    /// Disable colored output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Suppress all output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Never prompt; safe deletions are declined and kept for a later run
    #[arg(long, global = true)]
    pub no_prompt: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    /// The primary command to execute.
    pub command: Commands,
}

#[derive(Subcommand)]
/// CLI subcommands supported by scrub.
pub enum Commands {
    /// Delete commits repository by repository, asking before each force-push
    Delete {
        /// Approve every safe deletion without asking
        #[arg(long)]
        yes: bool,

        /// Where to write the run report
        #[arg(long, default_value = "deleted_commits.json", value_name = "FILE")]
        output: PathBuf,

        /// Where to write commits kept for a later run
        #[arg(long, default_value = "skipped_commits.json", value_name = "FILE")]
        skipped_output: PathBuf,
    },

    /// Report whether deletion would be safe, without changing anything
    Check,
}

impl Cli {
    /// Engine settings derived from the global options.
    pub fn engine_config(&self) -> EngineConfig {
        let remote = match &self.remote_dir {
            Some(root) => Remote::Directory { root: root.clone() },
            None => Remote::Https {
                host: self.host.clone(),
            },
        };
        EngineConfig {
            remote,
            credential: self
                .token
                .as_deref()
                .map(Credential::new)
                .unwrap_or_default(),
            command_timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    /// Default log level for the `-v` count.
    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}
