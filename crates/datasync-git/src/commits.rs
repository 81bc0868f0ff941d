//! Recent commit history for display.

use chrono::{DateTime, TimeZone, Utc};

use crate::handle::RepositoryHandle;
use crate::Result;

/// Information about a single commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Short commit hash (7 characters)
    pub hash: String,

    /// First line of the commit message
    pub message: String,

    pub author: String,

    pub timestamp: DateTime<Utc>,
}

/// The last `max_count` commits reachable from `rev`, newest first.
///
/// `rev` is anything `revparse_single` accepts: a local branch name,
/// `origin/main`, or `HEAD`. An unborn HEAD has no history and yields an
/// empty list.
pub fn list_recent_commits(
    handle: &RepositoryHandle,
    rev: &str,
    max_count: usize,
) -> Result<Vec<CommitInfo>> {
    let repo = handle.repo();
    if rev == "HEAD" && handle.head_commit()?.is_none() {
        return Ok(Vec::new());
    }
    let tip = repo.revparse_single(rev)?.peel_to_commit()?;

    let mut revwalk = repo.revwalk()?;
    revwalk.push(tip.id())?;
    revwalk.set_sorting(git2::Sort::TIME)?;

    let mut commits = Vec::with_capacity(max_count);
    for oid in revwalk.take(max_count) {
        let oid = oid?;
        let commit = repo.find_commit(oid)?;

        let timestamp = Utc
            .timestamp_opt(commit.time().seconds(), 0)
            .single()
            .unwrap_or_default();
        let message = commit
            .message()
            .unwrap_or("")
            .lines()
            .next()
            .unwrap_or("")
            .to_string();
        let author = commit.author().name().unwrap_or("Unknown").to_string();

        commits.push(CommitInfo {
            hash: format!("{:.7}", oid),
            message,
            author,
            timestamp,
        });
    }

    Ok(commits)
}
