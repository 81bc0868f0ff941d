//! Error types for datasync-git

use std::path::PathBuf;

/// Result type for datasync-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in datasync-git operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Filesystem error: {0}")]
    Fs(#[from] datasync_fs::Error),

    #[error("Failed to initialize repository at {path}: {source}")]
    Init {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("Remote URL '{url}' is not allowed: {reason}")]
    InvalidScheme { url: String, reason: String },

    #[error("Failed to save remote configuration: {message}")]
    ConfigSave { message: String },

    #[error("Git credentials are not configured (username and password are required)")]
    MissingCredentials,

    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Transport failure: {message}")]
    Transport { message: String },

    #[error("Remote '{name}' not found")]
    RemoteNotFound { name: String },

    #[error("Remote advertises no branches")]
    NoBranches,

    #[error("Branch '{name}' not found")]
    BranchNotFound { name: String },

    #[error("File '{name}' does not exist in the tip of '{branch}'")]
    FileNotInCommit { name: String, branch: String },

    #[error("Merge of '{branch}' refused: {message}")]
    MergeConflict { branch: String, message: String },

    #[error("Push of {refname} rejected by remote: {message}")]
    PushRejected { refname: String, message: String },

    #[error("Push of {refname} failed: {message}")]
    PushFailed { refname: String, message: String },
}
