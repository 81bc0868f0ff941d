//! Error types for datasync-core

use crate::sync::ErrorKind;

/// Result type for datasync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in datasync-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A file outside the sync set was handed to the reconciler
    #[error("'{name}' is not in the sync file set")]
    NotWhitelisted { name: String },

    /// Settings are present but unusable
    #[error("Invalid settings: {message}")]
    InvalidConfig { message: String },

    /// The remote advertised no branches at all
    #[error("Remote repository is empty (no branches advertised)")]
    RemoteEmpty,

    /// HEAD is detached, so there is no branch to push
    #[error("HEAD is detached; check out a branch before pushing")]
    DetachedHead,

    /// The background sync thread could not be started
    #[error("Failed to start sync worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// The background sync thread panicked
    #[error("Sync worker panicked")]
    WorkerPanicked,

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from datasync-fs
    #[error(transparent)]
    Fs(#[from] datasync_fs::Error),

    /// Git error from datasync-git
    #[error(transparent)]
    Git(#[from] datasync_git::Error),
}

impl Error {
    /// Caller-facing classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotWhitelisted { .. } => ErrorKind::NotWhitelisted,
            Self::InvalidConfig { .. } => ErrorKind::InvalidConfig,
            Self::RemoteEmpty => ErrorKind::RemoteEmpty,
            Self::DetachedHead | Self::WorkerPanicked => ErrorKind::VcsFailure,
            Self::WorkerSpawn(_) => ErrorKind::IoFailure,
            Self::Fs(e) => fs_kind(e),
            Self::Git(e) => git_kind(e),
        }
    }
}

fn fs_kind(error: &datasync_fs::Error) -> ErrorKind {
    use datasync_fs::Error as FsError;
    match error {
        FsError::Io { .. } | FsError::LockFailed { .. } => ErrorKind::IoFailure,
        FsError::ConfigParse { .. }
        | FsError::ConfigSerialize { .. }
        | FsError::UnsupportedFormat { .. }
        | FsError::InvalidFileName { .. } => ErrorKind::InvalidConfig,
    }
}

fn git_kind(error: &datasync_git::Error) -> ErrorKind {
    use datasync_git::Error as GitError;
    match error {
        GitError::InvalidScheme { .. } => ErrorKind::InvalidScheme,
        GitError::MissingCredentials | GitError::Auth { .. } => ErrorKind::AuthFailure,
        GitError::Transport { .. } => ErrorKind::TransportFailure,
        GitError::NoBranches => ErrorKind::RemoteEmpty,
        GitError::BranchNotFound { .. } => ErrorKind::NoBranches,
        GitError::FileNotInCommit { .. } => ErrorKind::FileNotInCommit,
        GitError::MergeConflict { .. } => ErrorKind::MergeConflict,
        GitError::PushRejected { .. } => ErrorKind::PushRejected,
        GitError::PushFailed { .. } => ErrorKind::PushFailed,
        GitError::Fs(e) => fs_kind(e),
        GitError::Git(_)
        | GitError::Init { .. }
        | GitError::ConfigSave { .. }
        | GitError::RemoteNotFound { .. } => ErrorKind::VcsFailure,
    }
}
