//! Copying sync files between the user-data root and the bundled root.
//!
//! Every write goes through [`datasync_fs::io::write_atomic`], so a reader
//! looking at either root mid-operation sees the old file or the new one,
//! never a truncated one.

use datasync_fs::io::{self, RobustnessConfig};
use datasync_fs::{NormalizedPath, checksum};
use datasync_git::RepositoryHandle;

use crate::file_set::SyncFileSet;
use crate::{Error, Result};

/// What a [`FileReconciler::mirror_all`] pass did, per file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorReport {
    /// Files written to the destination
    pub copied: Vec<String>,
    /// Files already identical in both roots
    pub unchanged: Vec<String>,
    /// Files with no source copy
    pub skipped: Vec<String>,
}

/// Whitelist-enforcing file copier.
#[derive(Debug, Clone)]
pub struct FileReconciler {
    files: SyncFileSet,
    robustness: RobustnessConfig,
}

impl FileReconciler {
    pub fn new(files: SyncFileSet) -> Self {
        Self {
            files,
            robustness: RobustnessConfig::default(),
        }
    }

    pub fn with_robustness(mut self, robustness: RobustnessConfig) -> Self {
        self.robustness = robustness;
        self
    }

    pub fn files(&self) -> &SyncFileSet {
        &self.files
    }

    fn ensure_whitelisted(&self, name: &str) -> Result<()> {
        if self.files.contains(name) {
            Ok(())
        } else {
            Err(Error::NotWhitelisted {
                name: name.to_string(),
            })
        }
    }

    /// Copy bundled defaults into `user_root` for files it does not have yet.
    ///
    /// Existing user files are never overwritten. A missing bundled root or
    /// bundled file is skipped. Returns the names that were seeded.
    pub fn seed_if_missing(
        &self,
        user_root: &NormalizedPath,
        bundled_root: Option<&NormalizedPath>,
    ) -> Result<Vec<String>> {
        let Some(bundled_root) = bundled_root else {
            tracing::debug!("No bundled defaults configured, nothing to seed");
            return Ok(Vec::new());
        };

        let mut seeded = Vec::new();
        for name in self.files.iter() {
            let target = user_root.join(name);
            let source = bundled_root.join(name);
            if target.exists() || !source.is_file() {
                continue;
            }
            io::copy_atomic(&source, &target, self.robustness)?;
            tracing::info!(file = name, "Seeded user data from bundled defaults");
            seeded.push(name.to_string());
        }
        Ok(seeded)
    }

    /// Copy `src_root/name` to `dst_root/name`.
    ///
    /// Returns `false` when the destination already held identical bytes and
    /// nothing was written. A missing source is an I/O error.
    pub fn mirror(
        &self,
        src_root: &NormalizedPath,
        dst_root: &NormalizedPath,
        name: &str,
    ) -> Result<bool> {
        self.ensure_whitelisted(name)?;
        let source = src_root.join(name);
        let target = dst_root.join(name);

        let content = io::read_bytes(&source)?;
        if target.is_file()
            && checksum::compute_file_checksum(&target.to_native()).ok()
                == Some(checksum::compute_bytes_checksum(&content))
        {
            return Ok(false);
        }

        io::write_atomic(&target, &content, self.robustness)?;
        tracing::debug!(file = name, from = %src_root, to = %dst_root, "Mirrored file");
        Ok(true)
    }

    /// [`mirror`](Self::mirror) every sync file; missing sources are skipped.
    pub fn mirror_all(
        &self,
        src_root: &NormalizedPath,
        dst_root: &NormalizedPath,
    ) -> Result<MirrorReport> {
        let mut report = MirrorReport::default();
        for name in self.files.iter() {
            match self.mirror(src_root, dst_root, name) {
                Ok(true) => report.copied.push(name.to_string()),
                Ok(false) => report.unchanged.push(name.to_string()),
                Err(Error::Fs(e)) if e.is_not_found() => {
                    tracing::debug!(file = name, root = %src_root, "Source missing, skipping");
                    report.skipped.push(name.to_string());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    /// Replace `dest_root/name` with its content at the tip of `origin/<branch>`.
    ///
    /// Reads from the object database, so uncommitted local edits never
    /// block it.
    pub fn overwrite_from_remote_content(
        &self,
        handle: &RepositoryHandle,
        branch: &str,
        name: &str,
        dest_root: &NormalizedPath,
    ) -> Result<()> {
        self.ensure_whitelisted(name)?;
        let content = datasync_git::read_remote_file(handle, branch, name)?;
        io::write_atomic(&dest_root.join(name), &content, self.robustness)?;
        tracing::debug!(file = name, branch, "Overwrote file from remote tip");
        Ok(())
    }
}
