//! Data synchronization core for datasync
//!
//! Keeps a small whitelisted set of data files consistent between a local
//! git working tree (the user-data root) and a single shared remote:
//!
//! - **Settings**: [`SyncSettings`] loaded from TOML, JSON or YAML
//! - **File reconciliation**: atomic, whitelist-enforcing copies between the
//!   user-data root and the optional bundled root
//! - **Repository management**: open or initialize the working tree, wire
//!   the `origin` remote
//! - **Sync orchestration**: merge pull, force pull and push, reported as a
//!   [`SyncResult`]
//!
//! # Architecture
//!
//! ```text
//!          CLI / presentation layer
//!                     |
//!               datasync-core
//!                 |        |
//!        datasync-git  datasync-fs
//! ```

pub mod config;
pub mod error;
pub mod file_set;
pub mod manager;
pub mod reconcile;
pub mod sync;

pub use config::{DataSettings, GitSettings, PathSettings, RemoteSettings, SyncSettings};
pub use error::{Error, Result};
pub use file_set::{DEFAULT_SYNC_FILES, SyncFileSet};
pub use manager::RepositoryManager;
pub use reconcile::{FileReconciler, MirrorReport};
pub use sync::{
    ErrorKind, PullPolicy, Startup, SyncJob, SyncOrchestrator, SyncResult, SyncState, SyncWorker,
    default_push_message, spawn_pull, spawn_push,
};
