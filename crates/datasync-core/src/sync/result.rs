//! Per-call outcome reported to the presentation layer.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Caller-facing failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidScheme,
    AuthFailure,
    TransportFailure,
    RemoteEmpty,
    NoBranches,
    FileNotInCommit,
    PushRejected,
    PushFailed,
    MergeConflict,
    IoFailure,
    VcsFailure,
    NotWhitelisted,
    InvalidConfig,
}

impl ErrorKind {
    /// Network or credential problem the user can fix by checking settings
    /// or connectivity.
    pub fn is_connectivity(self) -> bool {
        matches!(self, Self::AuthFailure | Self::TransportFailure)
    }

    fn headline(self) -> &'static str {
        match self {
            Self::AuthFailure => "Authentication failed",
            Self::TransportFailure => "Network failure",
            Self::InvalidScheme => "Remote URL rejected",
            Self::RemoteEmpty | Self::NoBranches => "Remote has no usable branch",
            Self::FileNotInCommit => "File missing on remote",
            Self::PushRejected => "Rejected by remote policy",
            Self::PushFailed => "Push failed",
            Self::MergeConflict => "Local and remote changes conflict",
            Self::IoFailure => "File system error",
            Self::VcsFailure => "Repository error",
            Self::NotWhitelisted => "File not in sync set",
            Self::InvalidConfig => "Invalid settings",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Outcome of one pull or push. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub success: bool,
    /// Branch the call synced against, when one was resolved.
    pub branch_used: Option<String>,
    /// Sync files whose content changed (pull) or that were committed (push).
    pub files_changed: BTreeSet<String>,
    pub error_kind: Option<ErrorKind>,
    /// One human-readable line for the user.
    pub message: String,
    /// Tolerated problems, such as a failed best-effort fetch.
    pub warnings: Vec<String>,
}

impl SyncResult {
    fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            branch_used: None,
            files_changed: BTreeSet::new(),
            error_kind: None,
            message: message.into(),
            warnings: Vec::new(),
        }
    }

    /// Sync is switched off in settings.
    pub fn disabled() -> Self {
        Self::success("Sync is disabled")
    }

    /// Nothing needed doing; not an error.
    pub fn nothing_to_do(branch: Option<String>) -> Self {
        Self {
            branch_used: branch,
            ..Self::success("Nothing to do")
        }
    }

    /// A call that finished its work.
    pub fn completed(
        branch: impl Into<String>,
        files_changed: BTreeSet<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            branch_used: Some(branch.into()),
            files_changed,
            ..Self::success(message)
        }
    }

    /// A call aborted by `error`.
    pub fn failed(error: &Error) -> Self {
        let kind = error.kind();
        Self {
            success: false,
            branch_used: None,
            files_changed: BTreeSet::new(),
            error_kind: Some(kind),
            message: format!("{}: {}", kind.headline(), error),
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    /// Whether the call succeeded without changing anything.
    pub fn is_noop(&self) -> bool {
        self.success && self.files_changed.is_empty()
    }
}
