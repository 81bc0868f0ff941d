//! Log command implementation

use colored::Colorize;

use crate::context::Context;
use crate::error::Result;

/// Print the last `count` commits of the checked-out branch.
pub fn run_log(ctx: &Context, count: usize) -> Result<()> {
    let Some(handle) = ctx.existing_repository()? else {
        println!("{}", "No repository yet".dimmed());
        return Ok(());
    };

    let commits = datasync_git::list_recent_commits(&handle, "HEAD", count)?;
    if commits.is_empty() {
        println!("{}", "No commits yet".dimmed());
        return Ok(());
    }

    for commit in commits {
        println!(
            "{} {} {} {}",
            commit.hash.yellow(),
            commit.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            commit.author.cyan(),
            commit.message
        );
    }
    Ok(())
}
