//! Atomic I/O operations with file locking
//!
//! Readers of a synchronized data file must only ever observe the complete
//! old content or the complete new content. All writes go to a temp file in
//! the destination directory and are renamed into place.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use backoff::ExponentialBackoff;
use fs2::FileExt;

use crate::constants::SyncPath;
use crate::{Error, NormalizedPath, Result};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Tuning for [`write_atomic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobustnessConfig {
    /// fsync the temp file before renaming it into place.
    pub fsync: bool,
    /// Upper bound on time spent retrying a rename that failed transiently.
    pub max_retry_elapsed: Duration,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            fsync: true,
            max_retry_elapsed: Duration::from_secs(2),
        }
    }
}

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename strategy to prevent partial writes.
/// Acquires an advisory lock on the temp file while writing. A rename that
/// fails with a transient OS error (e.g. a scanner holding the destination
/// open) is retried with exponential backoff.
pub fn write_atomic(path: &NormalizedPath, content: &[u8], config: RobustnessConfig) -> Result<()> {
    let native_path = path.to_native();

    if let Some(parent) = native_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    // Same directory as the destination so the rename never crosses filesystems
    let temp_name = format!(
        ".{}.{}.{}{}",
        native_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed),
        SyncPath::TempSuffix
    );
    let temp_path = native_path.with_file_name(&temp_name);

    let written = write_temp(&temp_path, content, config);
    let renamed = written.and_then(|()| rename_with_retry(&temp_path, &native_path, config));

    if renamed.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    renamed
}

fn write_temp(temp_path: &Path, content: &[u8], config: RobustnessConfig) -> Result<()> {
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)
        .map_err(|e| Error::io(temp_path, e))?;

    temp_file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: temp_path.to_path_buf(),
    })?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(temp_path, e))?;

    if config.fsync {
        temp_file.sync_all().map_err(|e| Error::io(temp_path, e))?;
    }

    temp_file.unlock().map_err(|_| Error::LockFailed {
        path: temp_path.to_path_buf(),
    })?;

    Ok(())
}

fn rename_with_retry(from: &Path, to: &Path, config: RobustnessConfig) -> Result<()> {
    let policy = ExponentialBackoff {
        initial_interval: Duration::from_millis(20),
        max_elapsed_time: Some(config.max_retry_elapsed),
        ..Default::default()
    };

    backoff::retry(policy, || {
        fs::rename(from, to).map_err(|e| {
            if is_transient(e.kind()) {
                tracing::debug!(path = %to.display(), error = %e, "Retrying rename");
                backoff::Error::transient(e)
            } else {
                backoff::Error::permanent(e)
            }
        })
    })
    .map_err(|e| {
        let source = match e {
            backoff::Error::Permanent(err) => err,
            backoff::Error::Transient { err, .. } => err,
        };
        Error::io(to, source)
    })
}

fn is_transient(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::PermissionDenied | ErrorKind::Interrupted | ErrorKind::WouldBlock
    )
}

/// Copy `src` over `dst` atomically.
///
/// The destination directory is created if needed.
pub fn copy_atomic(src: &NormalizedPath, dst: &NormalizedPath, config: RobustnessConfig) -> Result<()> {
    let content = read_bytes(src)?;
    write_atomic(dst, &content, config)
}

/// Read raw bytes from a file.
pub fn read_bytes(path: &NormalizedPath) -> Result<Vec<u8>> {
    let native_path = path.to_native();
    fs::read(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Read text content from a file.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Write text content to a file atomically with default robustness.
pub fn write_text(path: &NormalizedPath, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes(), RobustnessConfig::default())
}
