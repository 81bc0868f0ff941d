//! Owned handle to the on-disk working tree and its git metadata.

use std::collections::BTreeSet;
use std::path::Path;

use git2::{Commit, Oid, Repository, Signature, Status, StatusOptions, Tree};

use datasync_fs::{NormalizedPath, SyncPath};

use crate::{Error, Result};

/// Email used when no git identity is configured on the machine.
pub const FALLBACK_EMAIL: &str = "datasync@localhost";

const STAGED: Status = Status::INDEX_NEW
    .union(Status::INDEX_MODIFIED)
    .union(Status::INDEX_DELETED)
    .union(Status::INDEX_RENAMED)
    .union(Status::INDEX_TYPECHANGE);

/// A git working tree rooted at the user-data directory.
///
/// Created once per process by the repository manager and passed by
/// reference into every sync call. `git2::Repository` is `Send` but not
/// `Sync`, so a handle can be moved to a worker thread but never shared.
pub struct RepositoryHandle {
    root: NormalizedPath,
    repo: Repository,
}

impl std::fmt::Debug for RepositoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryHandle")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl RepositoryHandle {
    /// Open the repository at `root`, initializing it if no `.git` exists.
    ///
    /// Returns the handle and whether it was freshly created. The root
    /// directory is created when missing.
    pub fn open_or_init(root: NormalizedPath) -> Result<(Self, bool)> {
        let native = root.to_native();
        if root.join(SyncPath::GitDir.as_str()).exists() {
            let repo = Repository::open(&native)?;
            tracing::debug!(root = %root, "Opened existing repository");
            return Ok((Self { root, repo }, false));
        }

        std::fs::create_dir_all(&native).map_err(|e| datasync_fs::Error::io(&native, e))?;
        let repo = Repository::init(&native).map_err(|source| Error::Init {
            path: native.clone(),
            source,
        })?;
        tracing::info!(root = %root, "Initialized new repository");
        Ok((Self { root, repo }, true))
    }

    /// Open an existing repository without creating anything.
    pub fn open(root: NormalizedPath) -> Result<Self> {
        let repo = Repository::open(root.to_native())?;
        Ok(Self { root, repo })
    }

    /// Working tree root.
    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    /// Underlying git2 repository.
    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Name of the checked-out branch, including an unborn one.
    ///
    /// Returns `None` for a detached HEAD.
    pub fn current_branch(&self) -> Result<Option<String>> {
        match self.repo.head() {
            Ok(head) if head.is_branch() => Ok(head.shorthand().map(str::to_string)),
            Ok(_) => Ok(None),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => {
                let head = self.repo.find_reference("HEAD")?;
                Ok(head
                    .symbolic_target()
                    .and_then(|target| target.strip_prefix("refs/heads/"))
                    .map(str::to_string))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Commit HEAD points at, or `None` when HEAD is unborn.
    pub fn head_commit(&self) -> Result<Option<Commit<'_>>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(None),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Number of commits reachable from HEAD.
    pub fn commit_count(&self) -> Result<usize> {
        let Some(head) = self.head_commit()? else {
            return Ok(0);
        };
        let mut revwalk = self.repo.revwalk()?;
        revwalk.push(head.id())?;
        Ok(revwalk.count())
    }

    /// Add every named file that exists in the working tree to the index.
    ///
    /// Names that are absent on disk are skipped. Returns the names staged.
    pub fn stage_existing<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<Vec<String>> {
        let mut index = self.repo.index()?;
        let mut staged = Vec::new();
        for name in names {
            if !self.root.join(name).is_file() {
                tracing::debug!(file = name, "Not on disk, skipping stage");
                continue;
            }
            index.add_path(Path::new(name))?;
            staged.push(name.to_string());
        }
        index.write()?;
        Ok(staged)
    }

    /// Names from `names` whose index entry differs from HEAD.
    pub fn staged_changes<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<BTreeSet<String>> {
        self.filtered_statuses(names, |status| status.intersects(STAGED))
    }

    /// Names from `names` with any uncommitted change, staged or not.
    pub fn local_changes<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<BTreeSet<String>> {
        self.filtered_statuses(names, |status| {
            !status.is_empty() && !status.contains(Status::IGNORED)
        })
    }

    /// Whether any of `names` has uncommitted changes.
    pub fn has_local_changes<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<bool> {
        Ok(!self.local_changes(names)?.is_empty())
    }

    fn filtered_statuses<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
        keep: impl Fn(Status) -> bool,
    ) -> Result<BTreeSet<String>> {
        let wanted: BTreeSet<&str> = names.into_iter().collect();
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(false)
            .include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        Ok(statuses
            .iter()
            .filter(|entry| keep(entry.status()))
            .filter_map(|entry| entry.path().map(str::to_string))
            .filter(|path| wanted.contains(path.as_str()))
            .collect())
    }

    /// Signature for commits made by the engine.
    ///
    /// Uses the configured git identity when there is one, otherwise
    /// `fallback_name <datasync@localhost>`.
    pub fn signature(&self, fallback_name: &str) -> Result<Signature<'static>> {
        match self.repo.signature() {
            Ok(sig) => Ok(sig.to_owned()),
            Err(_) => {
                let name = if fallback_name.is_empty() {
                    "datasync"
                } else {
                    fallback_name
                };
                Ok(Signature::now(name, FALLBACK_EMAIL)?)
            }
        }
    }

    /// Commit the current index on top of HEAD.
    ///
    /// On an unborn HEAD this creates the root commit of the branch HEAD
    /// names.
    pub fn commit_index(&self, message: &str, fallback_name: &str) -> Result<Oid> {
        let mut index = self.repo.index()?;
        let tree = self.repo.find_tree(index.write_tree()?)?;
        self.commit_tree(&tree, message, fallback_name)
    }

    /// Commit only `names`, taking their content from the index.
    ///
    /// Every other path keeps HEAD's version in the new commit, and index
    /// entries outside `names` stay exactly as they were. Names must be
    /// top-level files.
    pub fn commit_paths<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
        message: &str,
        fallback_name: &str,
    ) -> Result<Oid> {
        let index = self.repo.index()?;
        let base = match self.head_commit()? {
            Some(head) => Some(head.tree()?),
            None => None,
        };

        let mut builder = self.repo.treebuilder(base.as_ref())?;
        for name in names {
            if let Some(entry) = index.get_path(Path::new(name), 0) {
                builder.insert(name, entry.id, entry.mode as i32)?;
            }
        }
        let tree = self.repo.find_tree(builder.write()?)?;
        self.commit_tree(&tree, message, fallback_name)
    }

    fn commit_tree(&self, tree: &Tree<'_>, message: &str, fallback_name: &str) -> Result<Oid> {
        let sig = self.signature(fallback_name)?;
        let parent = self.head_commit()?;
        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, tree, &parents)?;

        tracing::debug!(commit = %oid, "Created commit");
        Ok(oid)
    }
}
