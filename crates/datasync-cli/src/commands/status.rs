//! Status command implementation

use colored::Colorize;
use serde_json::json;

use crate::context::Context;
use crate::error::Result;

/// Run the status command
pub fn run_status(ctx: &Context, json: bool) -> Result<()> {
    let settings = &ctx.settings;
    let files = settings.file_set()?;
    let root = ctx.user_root()?;
    let handle = ctx.existing_repository()?;

    let branch = match &handle {
        Some(handle) => handle.current_branch()?,
        None => None,
    };
    let changed = match &handle {
        Some(handle) => handle.local_changes(files.iter())?,
        None => Default::default(),
    };

    if json {
        let file_states: Vec<_> = files
            .iter()
            .map(|name| {
                json!({
                    "name": name,
                    "exists": root.join(name).is_file(),
                    "modified": changed.contains(name),
                })
            })
            .collect();
        let output = json!({
            "enabled": settings.enabled(),
            "config": ctx.config_path,
            "user_root": root.as_str(),
            "bundled_root": settings.bundled_root().map(|p| p.as_str().to_string()),
            "remote": settings.git.remote.url,
            "repository": handle.is_some(),
            "branch": branch,
            "files": file_states,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", "Sync Status".bold());
    println!();

    let enabled = if settings.enabled() {
        "enabled".green()
    } else {
        "disabled".yellow()
    };
    println!("{}:     {}", "Sync".dimmed(), enabled);
    if let Some(path) = &ctx.config_path {
        println!("{}:   {}", "Config".dimmed(), path.display());
    }
    println!("{}: {}", "User data".dimmed(), root);
    if let Some(bundled) = settings.bundled_root() {
        println!("{}:  {}", "Bundled".dimmed(), bundled);
    }
    let remote = if settings.git.remote.url.is_empty() {
        "(not set)".dimmed().to_string()
    } else {
        settings.git.remote.url.cyan().to_string()
    };
    println!("{}:   {}", "Remote".dimmed(), remote);

    match (&handle, &branch) {
        (None, _) => println!(
            "{}:   {} (run {} to create)",
            "Branch".dimmed(),
            "no repository".yellow(),
            "datasync init".cyan()
        ),
        (Some(_), Some(branch)) => println!("{}:   {}", "Branch".dimmed(), branch.cyan()),
        (Some(_), None) => println!("{}:   {}", "Branch".dimmed(), "detached".yellow()),
    }
    println!();

    println!("{}:", "Files".bold());
    for name in files.iter() {
        let state = if !root.join(name).is_file() {
            "missing".red()
        } else if changed.contains(name) {
            "modified".yellow()
        } else {
            "clean".green()
        };
        println!("  {} ({})", name.cyan(), state);
    }

    Ok(())
}
