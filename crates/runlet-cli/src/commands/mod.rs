//! CLI command definitions and dispatch.

pub mod init;
pub mod run;

use clap::{Parser, Subcommand};

/// runlet: run an image in an isolated interactive shell.
#[derive(Parser, Debug)]
#[command(
    name = "runlet",
    version,
    about,
    long_about = None,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Internal mode; absent for a normal run.
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: run::RunArgs,
}

/// Hidden subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Container init, run by runlet itself inside the new namespaces.
    #[command(name = "__init", hide = true)]
    Init(init::InitArgs),
}

/// Dispatches the parsed CLI to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Command::Init(args)) => init::execute(&args),
        None => run::execute(cli.run),
    }
}
