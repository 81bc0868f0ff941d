//! Running one sync call on a dedicated background thread.
//!
//! The repository handle is moved into the worker and handed back when it
//! is joined, so two sync calls can never touch the same handle at once.
//! Dropping a [`SyncWorker`] without joining it detaches the thread; the
//! repository mutation still runs to completion.

use std::thread::{self, JoinHandle};

use datasync_git::RepositoryHandle;

use crate::config::SyncSettings;
use crate::sync::orchestrator::{PullPolicy, SyncOrchestrator};
use crate::sync::result::SyncResult;
use crate::{Error, Result};

/// The call a worker performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncJob {
    Pull(PullPolicy),
    Push { message: String },
}

/// A sync call in flight.
#[derive(Debug)]
pub struct SyncWorker {
    thread: JoinHandle<(RepositoryHandle, SyncResult)>,
}

impl SyncWorker {
    /// Start `job` on a new thread named `datasync-sync`.
    pub fn spawn(
        orchestrator: SyncOrchestrator,
        handle: RepositoryHandle,
        settings: SyncSettings,
        job: SyncJob,
    ) -> Result<Self> {
        let thread = thread::Builder::new()
            .name("datasync-sync".to_string())
            .spawn(move || {
                let result = match &job {
                    SyncJob::Pull(policy) => orchestrator.pull(&handle, &settings, *policy),
                    SyncJob::Push { message } => orchestrator.push(&handle, &settings, message),
                };
                (handle, result)
            })
            .map_err(Error::WorkerSpawn)?;
        Ok(Self { thread })
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the call and take the handle back.
    pub fn join(self) -> Result<(RepositoryHandle, SyncResult)> {
        self.thread.join().map_err(|_| Error::WorkerPanicked)
    }
}

pub fn spawn_pull(
    orchestrator: SyncOrchestrator,
    handle: RepositoryHandle,
    settings: SyncSettings,
    policy: PullPolicy,
) -> Result<SyncWorker> {
    SyncWorker::spawn(orchestrator, handle, settings, SyncJob::Pull(policy))
}

pub fn spawn_push(
    orchestrator: SyncOrchestrator,
    handle: RepositoryHandle,
    settings: SyncSettings,
    message: impl Into<String>,
) -> Result<SyncWorker> {
    SyncWorker::spawn(
        orchestrator,
        handle,
        settings,
        SyncJob::Push {
            message: message.into(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use datasync_fs::NormalizedPath;
    use datasync_test_utils::SyncFixture;

    #[test]
    fn worker_returns_handle_and_result() {
        let fx = SyncFixture::new();
        let (handle, _) = RepositoryHandle::open_or_init(NormalizedPath::new(fx.user_root())).unwrap();
        let mut settings = SyncSettings::default();
        settings.git.enabled = false;

        let worker = spawn_push(SyncOrchestrator::new(), handle, settings, "msg").unwrap();
        let (handle, result) = worker.join().unwrap();

        assert!(result.success);
        assert_eq!(handle.root().as_str(), NormalizedPath::new(fx.user_root()).as_str());
    }
}
