//! Sync settings
//!
//! Settings are read from a TOML, JSON or YAML file through
//! [`datasync_fs::ConfigStore`]. Every field has a default, so a missing
//! file yields a usable (if remote-less) configuration. Callers re-read the
//! file per operation; credentials may change between calls.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use datasync_fs::{ConfigStore, NormalizedPath, SyncPath};
use datasync_git::RemoteConfig;

use crate::file_set::{DEFAULT_SYNC_FILES, SyncFileSet};
use crate::{Error, Result};

/// Top-level settings document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub git: GitSettings,
    pub paths: PathSettings,
}

/// The `[git]` table.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitSettings {
    /// When false every sync entry point is a no-op success.
    pub enabled: bool,
    pub username: String,
    pub password: String,
    pub remote: RemoteSettings,
    pub data: DataSettings,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            username: String::new(),
            password: String::new(),
            remote: RemoteSettings::default(),
            data: DataSettings::default(),
        }
    }
}

impl std::fmt::Debug for GitSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitSettings")
            .field("enabled", &self.enabled)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("remote", &self.remote)
            .field("data", &self.data)
            .finish()
    }
}

/// `git.remote.*`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    pub url: String,
}

/// `git.data.*`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Comma-separated sync file names.
    pub files: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            files: DEFAULT_SYNC_FILES.join(","),
        }
    }
}

/// The `[paths]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Working tree root; defaults to `~/.bangumi-menu`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<PathBuf>,
    /// Root the presentation layer edits; absent in packaged installs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundled_defaults: Option<PathBuf>,
}

impl SyncSettings {
    /// Load settings from `path`, falling back to defaults when it is missing.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        Ok(ConfigStore::new().load_or_default(path)?)
    }

    /// Write settings to `path` atomically.
    pub fn save(&self, path: &NormalizedPath) -> Result<()> {
        Ok(ConfigStore::new().save(path, self)?)
    }

    pub fn enabled(&self) -> bool {
        self.git.enabled
    }

    /// The allow-list parsed from `git.data.files`.
    pub fn file_set(&self) -> Result<SyncFileSet> {
        SyncFileSet::parse(&self.git.data.files)
    }

    /// Immutable remote snapshot for one sync call.
    pub fn remote_config(&self) -> RemoteConfig {
        RemoteConfig::new(
            self.git.remote.url.trim(),
            self.git.username.as_str(),
            self.git.password.as_str(),
        )
    }

    /// Working-tree root: `paths.user_data`, or `~/.bangumi-menu`.
    pub fn user_root(&self) -> Result<NormalizedPath> {
        if let Some(path) = &self.paths.user_data {
            return Ok(NormalizedPath::new(path));
        }
        let home = dirs::home_dir().ok_or_else(|| Error::InvalidConfig {
            message: "cannot determine home directory; set paths.user_data".to_string(),
        })?;
        Ok(NormalizedPath::new(home.join(SyncPath::UserDataDir.as_str())))
    }

    /// Bundled/project root, when one is configured.
    pub fn bundled_root(&self) -> Option<NormalizedPath> {
        self.paths.bundled_defaults.as_ref().map(NormalizedPath::new)
    }
}
