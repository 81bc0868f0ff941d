//! Sync orchestration: pull and push calls, their results, and the
//! background worker that runs them off the caller's thread.

pub mod orchestrator;
pub mod result;
pub mod worker;

pub use orchestrator::{
    FORCE_PULL_MESSAGE_PREFIX, PullPolicy, Startup, SyncOrchestrator, SyncState,
    default_push_message,
};
pub use result::{ErrorKind, SyncResult};
pub use worker::{SyncJob, SyncWorker, spawn_pull, spawn_push};
