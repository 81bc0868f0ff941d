//! [`SyncFixture`] builder for sync scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temp dir holding a user-data root and a bundled-defaults root.
///
/// Neither root is created until something is written into it, so tests
/// can exercise the "directory absent" paths.
pub struct SyncFixture {
    temp_dir: TempDir,
}

impl Default for SyncFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncFixture {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Working-tree root of the local repository.
    pub fn user_root(&self) -> PathBuf {
        self.root().join("user")
    }

    /// Root the presentation layer edits.
    pub fn bundled_root(&self) -> PathBuf {
        self.root().join("bundled")
    }

    pub fn write_user(&self, name: &str, content: &str) {
        write_into(&self.user_root(), name, content);
    }

    pub fn write_bundled(&self, name: &str, content: &str) {
        write_into(&self.bundled_root(), name, content);
    }

    pub fn read_user(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.user_root().join(name)).ok()
    }

    pub fn read_bundled(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.bundled_root().join(name)).ok()
    }

    /// Assert that `name` in the user root holds exactly `expected`.
    ///
    /// # Panics
    /// Panics if the file is missing or differs.
    pub fn assert_user_file(&self, name: &str, expected: &str) {
        let path = self.user_root().join(name);
        let actual = fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", path.display()));
        assert_eq!(actual, expected, "unexpected content in {}", path.display());
    }

    /// Assert that `name` in the bundled root holds exactly `expected`.
    ///
    /// # Panics
    /// Panics if the file is missing or differs.
    pub fn assert_bundled_file(&self, name: &str, expected: &str) {
        let path = self.bundled_root().join(name);
        let actual = fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", path.display()));
        assert_eq!(actual, expected, "unexpected content in {}", path.display());
    }
}

fn write_into(dir: &Path, name: &str, content: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), content).unwrap();
}
