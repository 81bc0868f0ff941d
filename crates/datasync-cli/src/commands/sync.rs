//! Init, pull and push commands

use colored::Colorize;
use datasync_core::{PullPolicy, SyncOrchestrator, SyncResult};

use crate::context::Context;
use crate::error::{CliError, Result};

/// Prepare the user data root and force pull.
pub fn run_init(ctx: &Context, json: bool) -> Result<()> {
    let startup = SyncOrchestrator::new().startup(&ctx.settings);
    report(&startup.result, json)
}

/// Pull with the merge or force policy.
pub fn run_pull(ctx: &Context, force: bool, json: bool) -> Result<()> {
    if !ctx.settings.enabled() {
        return report(&SyncResult::disabled(), json);
    }
    let policy = if force {
        PullPolicy::Force
    } else {
        PullPolicy::Merge
    };
    let handle = ctx.ensure_repository()?;
    let result = SyncOrchestrator::new().pull(&handle, &ctx.settings, policy);
    report(&result, json)
}

/// Commit and push the sync files.
pub fn run_push(ctx: &Context, message: Option<&str>, json: bool) -> Result<()> {
    if !ctx.settings.enabled() {
        return report(&SyncResult::disabled(), json);
    }
    let handle = ctx.ensure_repository()?;
    let result = SyncOrchestrator::new().push(&handle, &ctx.settings, message.unwrap_or(""));
    report(&result, json)
}

/// Print a result; a failed call becomes a CLI error (exit code 1).
fn report(result: &SyncResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else if result.success {
        let icon = if result.is_noop() { "=".dimmed() } else { "+".green() };
        println!("{} {}", icon, result.message);
        for name in &result.files_changed {
            println!("  {} {}", "~".yellow(), name);
        }
    }

    for warning in &result.warnings {
        eprintln!("{}: {}", "warning".yellow().bold(), warning);
    }

    if result.success {
        Ok(())
    } else {
        Err(CliError::SyncFailed {
            message: result.message.clone(),
        })
    }
}
