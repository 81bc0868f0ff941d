//! The allow-list of files the engine may stage, commit or overwrite.

use datasync_fs::validate_file_name;

use crate::{Error, Result};

/// Files synced when settings do not name any.
pub const DEFAULT_SYNC_FILES: &[&str] = &["bangumi.json", "current_bangumi.json"];

/// Ordered, deduplicated set of top-level file names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFileSet {
    names: Vec<String>,
}

impl Default for SyncFileSet {
    fn default() -> Self {
        Self {
            names: DEFAULT_SYNC_FILES.iter().map(|n| n.to_string()).collect(),
        }
    }
}

impl SyncFileSet {
    /// Build a set from names, keeping first occurrences in order.
    ///
    /// Every name must be a plain file name; an empty set is rejected.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref();
            validate_file_name(name)?;
            if !unique.iter().any(|n| n == name) {
                unique.push(name.to_string());
            }
        }
        if unique.is_empty() {
            return Err(Error::InvalidConfig {
                message: "sync file list is empty".to_string(),
            });
        }
        Ok(Self { names: unique })
    }

    /// Parse a comma-separated list such as `"a.json, b.json"`.
    pub fn parse(list: &str) -> Result<Self> {
        Self::new(list.split(',').map(str::trim).filter(|n| !n.is_empty()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl std::fmt::Display for SyncFileSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.names.join(","))
    }
}
