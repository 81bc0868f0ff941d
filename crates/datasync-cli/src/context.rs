//! Settings lookup and repository access shared by the commands.

use std::path::{Path, PathBuf};

use datasync_core::{FileReconciler, RepositoryManager, SyncSettings};
use datasync_fs::{NormalizedPath, SyncPath};
use datasync_git::RepositoryHandle;

use crate::error::{CliError, Result};

/// Settings file used when neither `--config` nor `DATASYNC_CONFIG` is set.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("datasync").join("config.toml"))
}

/// Everything a command needs, read fresh for each invocation.
#[derive(Debug)]
pub struct Context {
    pub config_path: Option<PathBuf>,
    pub settings: SyncSettings,
}

impl Context {
    /// Load settings from `explicit`, or the default location.
    ///
    /// A missing default file yields default settings; a missing explicit
    /// file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit
            && !path.exists()
        {
            return Err(CliError::user(format!(
                "Settings file not found: {}",
                path.display()
            )));
        }
        let config_path = explicit.map(Path::to_path_buf).or_else(default_config_path);
        let settings = match &config_path {
            Some(path) => SyncSettings::load(&NormalizedPath::new(path))?,
            None => SyncSettings::default(),
        };
        tracing::debug!(config = ?config_path, "Loaded settings");
        Ok(Self {
            config_path,
            settings,
        })
    }

    pub fn user_root(&self) -> Result<NormalizedPath> {
        Ok(self.settings.user_root()?)
    }

    /// Open the user-data repository, creating and seeding it on first use.
    pub fn ensure_repository(&self) -> Result<RepositoryHandle> {
        let reconciler = FileReconciler::new(self.settings.file_set()?);
        let handle = RepositoryManager::new(reconciler)
            .ensure_repository(&self.user_root()?, self.settings.bundled_root().as_ref())?;
        Ok(handle)
    }

    /// Open the user-data repository if it exists, never creating it.
    pub fn existing_repository(&self) -> Result<Option<RepositoryHandle>> {
        let root = self.user_root()?;
        if !root.join(SyncPath::GitDir.as_str()).exists() {
            return Ok(None);
        }
        RepositoryHandle::open(root)
            .map(Some)
            .map_err(CliError::from)
    }
}
