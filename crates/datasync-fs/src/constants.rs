//! Well-known names inside a datasync user-data root.

use std::path::Path;

/// Fixed filesystem names used by the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPath {
    /// The `.git` metadata directory of the working tree
    GitDir,
    /// Default user-data directory name under the home directory
    UserDataDir,
    /// Suffix of in-flight temp files written by [`crate::io::write_atomic`]
    TempSuffix,
}

impl SyncPath {
    /// Get the string representation of the path.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GitDir => ".git",
            Self::UserDataDir => ".bangumi-menu",
            Self::TempSuffix => ".tmp",
        }
    }
}

impl AsRef<Path> for SyncPath {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl AsRef<str> for SyncPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for SyncPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
