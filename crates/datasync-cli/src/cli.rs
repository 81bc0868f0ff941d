//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// datasync - keep a small set of data files in sync through a git remote
#[derive(Parser, Debug)]
#[command(name = "datasync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file (TOML, JSON or YAML)
    #[arg(long, global = true, env = "DATASYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Prepare the user data root and force pull, as on application start
    Init {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Bring local data up to date with the remote
    ///
    /// By default remote history is merged and the pull is refused when
    /// local and remote changes conflict. With --force every sync file is
    /// replaced by the remote's copy.
    Pull {
        /// Discard local edits and take the remote's content
        #[arg(short, long)]
        force: bool,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Commit the sync files and push them
    Push {
        /// Commit message (defaults to "Data update <timestamp>")
        #[arg(short, long)]
        message: Option<String>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Show settings and local changes
    Status {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Show recent commits
    Log {
        /// Number of commits to show
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}
