//! datasync CLI
//!
//! Presentation layer over the sync core: each invocation reads settings,
//! runs one operation and prints a single result.

mod cli;
mod commands;
mod context;
mod error;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::{Cli, Commands};
use context::Context;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("{}: tracing already initialized", "warning".yellow().bold());
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = cli.command else {
        println!("{} keeps your data files in sync", "datasync".green().bold());
        println!();
        println!("Run {} for available commands.", "datasync --help".cyan());
        return Ok(());
    };

    let ctx = || Context::load(cli.config.as_deref());
    match command {
        Commands::Init { json } => commands::run_init(&ctx()?, json),
        Commands::Pull { force, json } => commands::run_pull(&ctx()?, force, json),
        Commands::Push { message, json } => {
            commands::run_push(&ctx()?, message.as_deref(), json)
        }
        Commands::Status { json } => commands::run_status(&ctx()?, json),
        Commands::Log { count } => commands::run_log(&ctx()?, count),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "datasync", &mut std::io::stdout());
            Ok(())
        }
    }
}
