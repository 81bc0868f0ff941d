//! Opening the local repository and wiring its remote.

use datasync_fs::NormalizedPath;
use datasync_git::{RemoteConfig, RepositoryHandle, SchemePolicy};

use crate::reconcile::FileReconciler;
use crate::Result;

/// Creates the [`RepositoryHandle`] the rest of the engine borrows.
#[derive(Debug, Clone)]
pub struct RepositoryManager {
    reconciler: FileReconciler,
    scheme_policy: SchemePolicy,
}

impl RepositoryManager {
    pub fn new(reconciler: FileReconciler) -> Self {
        Self {
            reconciler,
            scheme_policy: SchemePolicy::HttpsOnly,
        }
    }

    /// Accept additional URL schemes, e.g. `file://` mirrors.
    pub fn with_scheme_policy(mut self, policy: SchemePolicy) -> Self {
        self.scheme_policy = policy;
        self
    }

    pub fn scheme_policy(&self) -> SchemePolicy {
        self.scheme_policy
    }

    /// Open the repository at `user_root`, initializing it on first run.
    ///
    /// Only a freshly initialized repository is seeded from `bundled_root`.
    pub fn ensure_repository(
        &self,
        user_root: &NormalizedPath,
        bundled_root: Option<&NormalizedPath>,
    ) -> Result<RepositoryHandle> {
        let (handle, created) = RepositoryHandle::open_or_init(user_root.clone())?;
        if created {
            let seeded = self.reconciler.seed_if_missing(user_root, bundled_root)?;
            tracing::info!(root = %user_root, seeded = seeded.len(), "Created user data repository");
        }
        Ok(handle)
    }

    /// Point `origin` at `cfg.url` after checking the scheme.
    pub fn configure_remote(&self, handle: &RepositoryHandle, cfg: &RemoteConfig) -> Result<()> {
        datasync_git::configure_remote(handle, cfg, self.scheme_policy)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_set::SyncFileSet;
    use datasync_test_utils::SyncFixture;

    fn manager() -> RepositoryManager {
        RepositoryManager::new(FileReconciler::new(SyncFileSet::parse("a.json").unwrap()))
    }

    #[test]
    fn first_run_initializes_and_seeds() {
        let fx = SyncFixture::new();
        fx.write_bundled("a.json", "seed");
        let user = NormalizedPath::new(fx.user_root());
        let bundled = NormalizedPath::new(fx.bundled_root());

        manager().ensure_repository(&user, Some(&bundled)).unwrap();

        assert!(fx.user_root().join(".git").is_dir());
        fx.assert_user_file("a.json", "seed");
    }

    #[test]
    fn existing_repository_is_not_reseeded() {
        let fx = SyncFixture::new();
        let user = NormalizedPath::new(fx.user_root());
        let bundled = NormalizedPath::new(fx.bundled_root());
        manager().ensure_repository(&user, None).unwrap();

        fx.write_bundled("a.json", "seed");
        manager().ensure_repository(&user, Some(&bundled)).unwrap();

        assert!(fx.read_user("a.json").is_none());
    }

    #[test]
    fn configure_remote_rejects_ssh() {
        let fx = SyncFixture::new();
        let user = NormalizedPath::new(fx.user_root());
        let handle = manager().ensure_repository(&user, None).unwrap();
        let cfg = RemoteConfig::new("ssh://example.com/repo.git", "u", "p");

        let err = manager().configure_remote(&handle, &cfg).unwrap_err();

        assert_eq!(err.kind(), crate::ErrorKind::InvalidScheme);
        assert!(handle.repo().find_remote("origin").is_err());
    }
}
