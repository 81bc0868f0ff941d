//! Git fixtures built with `git2`, no `git` binary required.

use std::path::Path;

use git2::{Oid, Repository, Signature};
use tempfile::TempDir;

fn fixture_signature() -> Signature<'static> {
    Signature::now("Fixture", "fixture@example.com")
        .unwrap_or_else(|e| panic!("fixture signature: {e}"))
}

/// A bare repository in a temp dir standing in for the shared remote.
///
/// Commits are written straight into the object database, so tests can
/// script remote history without a second working copy.
pub struct RemoteFixture {
    dir: TempDir,
    repo: Repository,
}

impl Default for RemoteFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteFixture {
    /// Empty bare remote whose HEAD points at (unborn) `main`.
    pub fn new() -> Self {
        Self::with_head("main")
    }

    /// Empty bare remote whose HEAD points at `branch`.
    pub fn with_head(branch: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init_bare(dir.path().join("remote.git"))
            .unwrap_or_else(|e| panic!("RemoteFixture: init_bare failed: {e}"));
        repo.set_head(&format!("refs/heads/{branch}"))
            .unwrap_or_else(|e| panic!("RemoteFixture: set_head failed: {e}"));
        Self { dir, repo }
    }

    pub fn path(&self) -> std::path::PathBuf {
        self.dir.path().join("remote.git")
    }

    /// `file://` URL of the bare repository.
    pub fn url(&self) -> String {
        format!("file://{}", self.path().display())
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Point the remote's symbolic HEAD at `branch`.
    pub fn set_head(&self, branch: &str) {
        self.repo
            .set_head(&format!("refs/heads/{branch}"))
            .unwrap_or_else(|e| panic!("RemoteFixture::set_head: {e}"));
    }

    /// Tip of `branch`, if it exists.
    pub fn tip(&self, branch: &str) -> Option<Oid> {
        self.repo
            .find_reference(&format!("refs/heads/{branch}"))
            .ok()
            .and_then(|r| r.target())
    }

    /// Commit top-level `files` on top of `branch` (creating it if needed).
    ///
    /// Files not named keep their content from the parent commit.
    pub fn commit_files(&self, branch: &str, files: &[(&str, &str)], message: &str) -> Oid {
        let parent = self
            .tip(branch)
            .map(|oid| self.repo.find_commit(oid).unwrap());
        let base_tree = parent.as_ref().map(|c| c.tree().unwrap());

        let mut builder = self.repo.treebuilder(base_tree.as_ref()).unwrap();
        for (name, content) in files {
            let blob = self.repo.blob(content.as_bytes()).unwrap();
            builder.insert(name, blob, 0o100644).unwrap();
        }
        let tree = self.repo.find_tree(builder.write().unwrap()).unwrap();

        let sig = fixture_signature();
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        self.repo
            .commit(
                Some(&format!("refs/heads/{branch}")),
                &sig,
                &sig,
                message,
                &tree,
                &parents,
            )
            .unwrap_or_else(|e| panic!("RemoteFixture::commit_files: {e}"))
    }

    /// Content of `name` at the tip of `branch`.
    pub fn file_at_tip(&self, branch: &str, name: &str) -> Option<Vec<u8>> {
        let tip = self.tip(branch)?;
        let tree = self.repo.find_commit(tip).ok()?.tree().ok()?;
        let entry = tree.get_path(Path::new(name)).ok()?;
        let blob = self.repo.find_blob(entry.id()).ok()?;
        Some(blob.content().to_vec())
    }

    /// Top-level file names at the tip of `branch`, sorted.
    pub fn files_at_tip(&self, branch: &str) -> Vec<String> {
        let Some(tip) = self.tip(branch) else {
            return Vec::new();
        };
        let tree = self.repo.find_commit(tip).unwrap().tree().unwrap();
        let mut names: Vec<String> = tree
            .iter()
            .filter_map(|entry| entry.name().map(str::to_string))
            .collect();
        names.sort();
        names
    }

    /// Number of commits reachable from `branch`; zero when it does not exist.
    pub fn commit_count(&self, branch: &str) -> usize {
        let Some(tip) = self.tip(branch) else {
            return 0;
        };
        let mut walk = self.repo.revwalk().unwrap();
        walk.push(tip).unwrap();
        walk.count()
    }
}
