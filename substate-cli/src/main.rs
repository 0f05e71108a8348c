//! substate-cli - Command-line interface for substate
//!
//! Provides both a REPL and one-shot command execution.

mod commands;
mod repl;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "substate-cli")]
#[command(about = "Command-line interface for substate hierarchical state machines")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start interactive REPL
    Repl {
        /// Machine definition (path or builtin:<name>)
        #[arg(short, long, default_value = "builtin:subscription", env = "SUBSTATE_MACHINE")]
        machine: String,
    },

    /// List built-in machines
    Machines,

    /// Parse and validate a machine definition
    Validate {
        /// Machine definition (path or builtin:<name>)
        definition: String,
    },

    /// Print the state tree of a machine definition
    Inspect {
        /// Machine definition (path or builtin:<name>)
        definition: String,
    },

    /// Run an event script and print the resulting states
    Run {
        /// Machine definition (path or builtin:<name>)
        #[arg(short, long, default_value = "builtin:subscription", env = "SUBSTATE_MACHINE")]
        machine: String,

        /// Event script (YAML or JSON); defaults to the built-in reference script
        #[arg(short, long, env = "SUBSTATE_SCRIPT")]
        script: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Print the final context
        #[arg(long)]
        show_context: bool,

        /// Record failing events and continue instead of aborting
        #[arg(long)]
        keep_going: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        None => repl::run("builtin:subscription")?,
        Some(Commands::Repl { machine }) => repl::run(&machine)?,
        Some(cmd) => match commands::execute(cmd) {
            Ok(output) => {
                println!("{}", output);
            }
            Err(e) => {
                match commands::error_code(e.as_ref()) {
                    Some(code) => eprintln!("{} [{}]: {}", "Error".red(), code, e),
                    None => eprintln!("{}: {}", "Error".red(), e),
                }
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
