//! Pull and push state machine.
//!
//! Each entry point runs one call to completion on the caller's thread and
//! reports through [`SyncResult`]; errors never escape as panics. A failed
//! call leaves the orchestrator in [`SyncState::Failed`] until the next call
//! starts, and nothing else carries over between calls.

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};

use chrono::Local;

use datasync_fs::{NormalizedPath, checksum};
use datasync_git::{
    AdvertisedRefs, BranchResolver, MergeOutcome, RemoteConfig, RepositoryHandle, SchemePolicy,
};

use crate::config::SyncSettings;
use crate::file_set::SyncFileSet;
use crate::manager::RepositoryManager;
use crate::reconcile::{FileReconciler, MirrorReport};
use crate::sync::result::{ErrorKind, SyncResult};
use crate::{Error, Result};

/// Prefix of the commit a force pull records locally.
pub const FORCE_PULL_MESSAGE_PREFIX: &str = "Force pull from remote";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How a pull reconciles local state with the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullPolicy {
    /// Merge remote history into the local branch; refuse on conflict.
    Merge,
    /// Replace every sync file with the remote tip's content.
    Force,
}

/// Where the orchestrator currently is within a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Fetching,
    ResolvingBranch,
    Reconciling,
    Committing,
    Pushing,
    Failed(ErrorKind),
}

/// Outcome of [`SyncOrchestrator::startup`].
#[derive(Debug)]
pub struct Startup {
    /// The opened repository; `None` when sync is disabled or setup failed.
    pub handle: Option<RepositoryHandle>,
    pub result: SyncResult,
}

/// Commit message used when a push is requested without one.
pub fn default_push_message() -> String {
    format!("Data update {}", Local::now().format(TIMESTAMP_FORMAT))
}

/// Drives fetch, branch resolution, reconciliation, commit and push.
#[derive(Debug)]
pub struct SyncOrchestrator {
    scheme_policy: SchemePolicy,
    resolver: BranchResolver,
    state: Cell<SyncState>,
}

impl Default for SyncOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncOrchestrator {
    pub fn new() -> Self {
        Self {
            scheme_policy: SchemePolicy::HttpsOnly,
            resolver: BranchResolver::new(),
            state: Cell::new(SyncState::Idle),
        }
    }

    pub fn with_scheme_policy(mut self, policy: SchemePolicy) -> Self {
        self.scheme_policy = policy;
        self
    }

    pub fn with_resolver(mut self, resolver: BranchResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn scheme_policy(&self) -> SchemePolicy {
        self.scheme_policy
    }

    pub fn state(&self) -> SyncState {
        self.state.get()
    }

    fn transition(&self, next: SyncState) {
        tracing::debug!(from = ?self.state.get(), to = ?next, "Sync state");
        self.state.set(next);
    }

    fn manager(&self, reconciler: &FileReconciler) -> RepositoryManager {
        RepositoryManager::new(reconciler.clone()).with_scheme_policy(self.scheme_policy)
    }

    fn finish(&self, outcome: Result<SyncResult>) -> SyncResult {
        match outcome {
            Ok(result) => {
                self.transition(SyncState::Idle);
                tracing::info!(
                    branch = result.branch_used.as_deref().unwrap_or("-"),
                    changed = result.files_changed.len(),
                    "{}",
                    result.message
                );
                result
            }
            Err(e) => {
                let kind = e.kind();
                self.transition(SyncState::Failed(kind));
                tracing::warn!(error = %e, ?kind, "Sync call failed");
                SyncResult::failed(&e)
            }
        }
    }

    /// Open (or create and seed) the repository and force pull.
    ///
    /// With sync disabled only first-run seeding of the user root happens.
    pub fn startup(&self, settings: &SyncSettings) -> Startup {
        let prepared = settings.user_root().and_then(|root| {
            let reconciler = FileReconciler::new(settings.file_set()?);
            Ok((root, reconciler))
        });
        let (user_root, reconciler) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                return Startup {
                    handle: None,
                    result: self.finish(Err(e)),
                };
            }
        };
        let bundled = settings.bundled_root();

        if !settings.enabled() {
            let result = match reconciler.seed_if_missing(&user_root, bundled.as_ref()) {
                Ok(_) => SyncResult::disabled(),
                Err(e) => self.finish(Err(e)),
            };
            return Startup {
                handle: None,
                result,
            };
        }

        match self
            .manager(&reconciler)
            .ensure_repository(&user_root, bundled.as_ref())
        {
            Ok(handle) => {
                let result = self.pull(&handle, settings, PullPolicy::Force);
                Startup {
                    handle: Some(handle),
                    result,
                }
            }
            Err(e) => Startup {
                handle: None,
                result: self.finish(Err(e)),
            },
        }
    }

    /// Bring local data up to date with the remote.
    pub fn pull(
        &self,
        handle: &RepositoryHandle,
        settings: &SyncSettings,
        policy: PullPolicy,
    ) -> SyncResult {
        if !settings.enabled() {
            tracing::debug!("Sync disabled, skipping pull");
            return SyncResult::disabled();
        }
        let span = tracing::info_span!("pull", ?policy, root = %handle.root());
        let _guard = span.enter();
        self.finish(self.run_pull(handle, settings, policy))
    }

    /// Commit the sync files and publish them.
    ///
    /// An empty `message` is replaced by [`default_push_message`].
    pub fn push(&self, handle: &RepositoryHandle, settings: &SyncSettings, message: &str) -> SyncResult {
        if !settings.enabled() {
            tracing::debug!("Sync disabled, skipping push");
            return SyncResult::disabled();
        }
        let span = tracing::info_span!("push", root = %handle.root());
        let _guard = span.enter();
        self.finish(self.run_push(handle, settings, message))
    }

    fn run_pull(
        &self,
        handle: &RepositoryHandle,
        settings: &SyncSettings,
        policy: PullPolicy,
    ) -> Result<SyncResult> {
        let reconciler = FileReconciler::new(settings.file_set()?);
        let cfg = settings.remote_config();
        self.prepare_remote(handle, &reconciler, &cfg)?;

        self.transition(SyncState::Fetching);
        let mut warnings = Vec::new();
        let advertised = self.fetch_refs(handle, &cfg, policy, &mut warnings)?;

        self.transition(SyncState::ResolvingBranch);
        let branch = self
            .resolver
            .resolve_default_branch(&advertised)
            .map_err(|e| match e {
                datasync_git::Error::NoBranches => Error::RemoteEmpty,
                other => other.into(),
            })?;

        self.transition(SyncState::Reconciling);
        let before = snapshot(handle.root(), reconciler.files());
        let (branch_used, message) = match policy {
            PullPolicy::Merge => {
                let (merged, outcome) =
                    self.merge_pull(handle, &reconciler, settings, &cfg, &branch)?;
                let message = match outcome {
                    MergeOutcome::UpToDate => format!("Already up to date with origin/{merged}"),
                    MergeOutcome::FastForward => format!("Fast-forwarded to origin/{merged}"),
                    MergeOutcome::Merged => format!("Merged origin/{merged}"),
                    MergeOutcome::Adopted => format!("Checked out origin/{merged}"),
                };
                (merged, message)
            }
            PullPolicy::Force => {
                self.force_pull(handle, &reconciler, settings, &cfg, &branch, &mut warnings)?;
                let message = format!("Replaced local data with origin/{branch}");
                (branch, message)
            }
        };
        let changed = changed_between(&before, &snapshot(handle.root(), reconciler.files()));

        Ok(SyncResult::completed(branch_used, changed, message).with_warnings(warnings))
    }

    /// Check scheme and credentials, then wire `origin`. No network I/O.
    fn prepare_remote(
        &self,
        handle: &RepositoryHandle,
        reconciler: &FileReconciler,
        cfg: &RemoteConfig,
    ) -> Result<()> {
        self.scheme_policy.validate(&cfg.url)?;
        cfg.require_credentials()?;
        self.manager(reconciler).configure_remote(handle, cfg)
    }

    /// Fetch, then list the remote's branches.
    ///
    /// A force pull tolerates a network or auth failure when earlier
    /// fetches left remote-tracking refs behind; those stand in for the
    /// live listing. A merge pull reports the failure.
    fn fetch_refs(
        &self,
        handle: &RepositoryHandle,
        cfg: &RemoteConfig,
        policy: PullPolicy,
        warnings: &mut Vec<String>,
    ) -> Result<AdvertisedRefs> {
        match datasync_git::fetch(handle, cfg, self.scheme_policy) {
            Ok(()) => match datasync_git::advertised_refs(handle, cfg, self.scheme_policy) {
                Ok(live) => Ok(live),
                Err(e) => {
                    tracing::debug!(error = %e, "Live ref listing failed, using tracking refs");
                    Ok(datasync_git::tracking_refs(handle)?)
                }
            },
            Err(e @ (datasync_git::Error::Transport { .. } | datasync_git::Error::Auth { .. }))
                if policy == PullPolicy::Force =>
            {
                let tracked = datasync_git::tracking_refs(handle)?;
                if tracked.refs.is_empty() {
                    return Err(e.into());
                }
                tracing::warn!(error = %e, "Fetch failed, continuing with last fetched refs");
                warnings.push(format!("Fetch failed, using last fetched remote state: {e}"));
                Ok(tracked)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Merge the remote into the local branch, then mirror to the bundled root.
    ///
    /// The checked-out branch is merged from its namesake on the remote;
    /// when the remote has no such branch (or HEAD is unborn or detached)
    /// the resolved default branch is used instead.
    fn merge_pull(
        &self,
        handle: &RepositoryHandle,
        reconciler: &FileReconciler,
        settings: &SyncSettings,
        cfg: &RemoteConfig,
        resolved: &str,
    ) -> Result<(String, MergeOutcome)> {
        let target = match (handle.head_commit()?.is_some(), handle.current_branch()?) {
            (true, Some(current)) => current,
            _ => resolved.to_string(),
        };

        let merged = match datasync_git::merge_remote_branch(handle, &target, &cfg.username) {
            Ok(outcome) => (target, outcome),
            Err(datasync_git::Error::BranchNotFound { .. }) if target != resolved => {
                tracing::debug!(
                    current = %target,
                    resolved,
                    "Current branch not on remote, merging resolved branch"
                );
                let outcome = datasync_git::merge_remote_branch(handle, resolved, &cfg.username)?;
                (resolved.to_string(), outcome)
            }
            Err(e) => return Err(e.into()),
        };

        self.mirror_to_bundled(handle, reconciler, settings)?;
        Ok(merged)
    }

    /// Overwrite, commit, absorb remote history, and always mirror.
    fn force_pull(
        &self,
        handle: &RepositoryHandle,
        reconciler: &FileReconciler,
        settings: &SyncSettings,
        cfg: &RemoteConfig,
        branch: &str,
        warnings: &mut Vec<String>,
    ) -> Result<()> {
        let outcome = self.overwrite_and_commit(handle, reconciler, cfg, branch, warnings);
        let mirrored = self.mirror_to_bundled(handle, reconciler, settings);
        outcome?;
        mirrored?;
        Ok(())
    }

    fn overwrite_and_commit(
        &self,
        handle: &RepositoryHandle,
        reconciler: &FileReconciler,
        cfg: &RemoteConfig,
        branch: &str,
        warnings: &mut Vec<String>,
    ) -> Result<()> {
        let mut written: Vec<&str> = Vec::new();
        for name in reconciler.files().iter() {
            match reconciler.overwrite_from_remote_content(handle, branch, name, handle.root()) {
                Ok(()) => written.push(name),
                Err(Error::Git(datasync_git::Error::FileNotInCommit { .. })) => {
                    tracing::warn!(file = name, branch, "File absent on remote, left untouched");
                    warnings.push(format!("{name} does not exist on origin/{branch}; left untouched"));
                }
                Err(e) => return Err(e),
            }
        }

        self.transition(SyncState::Committing);
        if handle.head_commit()?.is_none() {
            datasync_git::adopt_remote_branch(handle, branch)?;
            return Ok(());
        }

        handle.stage_existing(written.iter().copied())?;
        if !handle.staged_changes(written.iter().copied())?.is_empty() {
            let message = format!(
                "{FORCE_PULL_MESSAGE_PREFIX} {}",
                Local::now().format(TIMESTAMP_FORMAT)
            );
            handle.commit_paths(written.iter().copied(), &message, &cfg.username)?;
        }

        match datasync_git::merge_remote_branch(handle, branch, &cfg.username) {
            Ok(outcome) => tracing::debug!(?outcome, "Absorbed remote history after force pull"),
            Err(e) => {
                tracing::warn!(error = %e, "Merge after force pull failed");
                warnings.push(format!("Could not merge remote history: {e}"));
            }
        }
        Ok(())
    }

    fn mirror_to_bundled(
        &self,
        handle: &RepositoryHandle,
        reconciler: &FileReconciler,
        settings: &SyncSettings,
    ) -> Result<MirrorReport> {
        match settings.bundled_root() {
            Some(bundled) => reconciler.mirror_all(handle.root(), &bundled),
            None => Ok(MirrorReport::default()),
        }
    }

    fn run_push(
        &self,
        handle: &RepositoryHandle,
        settings: &SyncSettings,
        message: &str,
    ) -> Result<SyncResult> {
        let reconciler = FileReconciler::new(settings.file_set()?);
        let names: Vec<&str> = reconciler.files().iter().collect();

        self.transition(SyncState::Reconciling);
        if let Some(bundled) = settings.bundled_root() {
            reconciler.mirror_all(&bundled, handle.root())?;
        }

        handle.stage_existing(names.iter().copied())?;
        let changed = handle.staged_changes(names.iter().copied())?;
        if changed.is_empty() {
            return Ok(SyncResult::nothing_to_do(handle.current_branch()?));
        }

        let cfg = settings.remote_config();
        self.prepare_remote(handle, &reconciler, &cfg)?;
        let branch = handle.current_branch()?.ok_or(Error::DetachedHead)?;

        self.transition(SyncState::Committing);
        let message = if message.trim().is_empty() {
            default_push_message()
        } else {
            message.to_string()
        };
        handle.commit_paths(names.iter().copied(), &message, &cfg.username)?;

        self.transition(SyncState::Pushing);
        datasync_git::push_branch(handle, &cfg, self.scheme_policy, &branch)?;

        let summary = format!("Pushed {} file(s) to origin/{branch}", changed.len());
        Ok(SyncResult::completed(branch, changed, summary))
    }
}

/// Checksum of every sync file under `root`; `None` when absent.
fn snapshot(root: &NormalizedPath, files: &SyncFileSet) -> BTreeMap<String, Option<String>> {
    files
        .iter()
        .map(|name| {
            let sum = checksum::compute_file_checksum(&root.join(name).to_native()).ok();
            (name.to_string(), sum)
        })
        .collect()
}

fn changed_between(
    before: &BTreeMap<String, Option<String>>,
    after: &BTreeMap<String, Option<String>>,
) -> BTreeSet<String> {
    after
        .iter()
        .filter(|(name, sum)| before.get(*name) != Some(*sum))
        .map(|(name, _)| name.clone())
        .collect()
}
