#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
//! Command-line interface for deleting your own commits from hosted Git
//! repositories via the libscrub crate.

use std::{
    io::{self, IsTerminal, Write},
    process,
};

use anyhow::Result;
use clap::Parser;
use libscrub::{Interrupt, ScrubError};
use scrub_term::{Output, Quiet, Terminal};
use tracing::{info, warn};

/// Command-line argument definitions.
mod args;
/// Subcommand implementations.
mod commands;
/// Tracing subscriber setup.
mod telemetry;
/// Prompts and rendering.
mod ui;

use args::{Cli, Commands};
use commands::{
    Context,
    delete::{DeleteRequest, delete},
};

/// Raise `interrupt` on Ctrl+C instead of terminating, so an in-flight
/// publish always completes and gets reported.
fn install_interrupt_handler() -> Interrupt {
    let interrupt = Interrupt::new();
    let handle = interrupt.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        handle.raise();
    }) {
        warn!(error = %e, "failed to install Ctrl+C handler");
    }
    interrupt
}

/// Dispatch the parsed command and return the process exit code.
fn run(cli: Cli, output: &dyn Output) -> Result<i32> {
    let interrupt = install_interrupt_handler();
    let ctx = Context {
        output,
        config: cli.engine_config(),
        input: cli.input.clone(),
        no_prompt: cli.no_prompt || cli.quiet || !io::stdin().is_terminal(),
        interrupt,
    };

    match cli.command {
        Commands::Delete {
            yes,
            output: report_path,
            skipped_output,
        } => {
            info!(input = %ctx.input.display(), "starting delete");
            delete(
                &ctx,
                &DeleteRequest {
                    yes,
                    report_path,
                    retry_path: skipped_output,
                },
            )
        }
        Commands::Check => commands::check::check(&ctx),
    }
}

fn main() {
    let cli = Cli::parse();

    // Determine color output preference early for error handling
    let color = if cli.color {
        true
    } else if cli.no_color {
        false
    } else {
        io::stdout().is_terminal()
    };

    let quiet = cli.quiet;
    let output: Box<dyn Output> = if quiet {
        Box::new(Quiet)
    } else {
        Box::new(Terminal::new(color))
    };

    telemetry::init_tracing(cli.log_json, cli.log_level());

    let exit_code = match run(cli, output.as_ref()) {
        Ok(code) => code,
        Err(e) => {
            // Reset any existing colors only if color was enabled and stdout is a TTY
            if color && io::stdout().is_terminal() {
                print!("\x1b[0m");
                if let Err(flush_err) = io::stdout().flush() {
                    eprintln!("Failed to flush stdout while resetting colors: {flush_err}");
                }
            }

            if let Err(display_err) = output.fail(&format!("{e:#}")) {
                eprintln!("Failed to report error via output handler: {display_err:#}");
            }
            if quiet {
                eprintln!("scrub: {e:#}");
            }
            e.downcast_ref::<ScrubError>()
                .map_or(1, ScrubError::exit_code)
        }
    };

    if let Err(finish_err) = output.finish() {
        eprintln!("Failed to flush output handler: {finish_err:#}");
    }
    process::exit(exit_code);
}
