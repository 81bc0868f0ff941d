//! Effective default-branch resolution.

use crate::remote::ORIGIN;
use crate::{Error, Result};

/// Conventional default-branch names, highest priority first.
pub const DEFAULT_BRANCH_CANDIDATES: &[&str] = &["main", "master", "develop", "trunk", "default"];

/// Branch refs a remote advertises, in transport order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvertisedRefs {
    /// Target of the remote's symbolic HEAD, when known.
    pub head_target: Option<String>,
    /// Full or short ref names, e.g. `refs/heads/main` or `origin/main`.
    pub refs: Vec<String>,
}

impl AdvertisedRefs {
    pub fn new<I, S>(refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            head_target: None,
            refs: refs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_head(mut self, target: impl Into<String>) -> Self {
        self.head_target = Some(target.into());
        self
    }

    /// Short names of every advertised branch, excluding HEAD.
    pub fn branch_names(&self) -> impl Iterator<Item = &str> {
        self.refs
            .iter()
            .map(|r| short_branch_name(r))
            .filter(|name| !name.is_empty() && *name != "HEAD")
    }

    /// Whether `branch` (short name) is among the advertised branches.
    pub fn contains(&self, branch: &str) -> bool {
        self.branch_names().any(|name| name == branch)
    }
}

/// Strip `refs/heads/`, `refs/remotes/origin/` or `origin/` from a ref name.
pub fn short_branch_name(reference: &str) -> &str {
    let remote_prefix = format!("refs/remotes/{ORIGIN}/");
    let short_prefix = format!("{ORIGIN}/");
    reference
        .strip_prefix("refs/heads/")
        .or_else(|| reference.strip_prefix(remote_prefix.as_str()))
        .or_else(|| reference.strip_prefix(short_prefix.as_str()))
        .unwrap_or(reference)
}

/// Picks the branch a sync should track from a remote's advertisement.
#[derive(Debug, Clone)]
pub struct BranchResolver {
    candidates: Vec<String>,
}

impl Default for BranchResolver {
    fn default() -> Self {
        Self::with_candidates(DEFAULT_BRANCH_CANDIDATES.iter().copied())
    }
}

impl BranchResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver with a custom candidate order.
    pub fn with_candidates<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Resolve the effective default branch, returned as a short name.
    ///
    /// Order: symbolic HEAD target (when it names an advertised branch),
    /// then the first candidate present, then the first non-HEAD ref.
    ///
    /// Candidates must equal the whole short branch name: `x/master` does
    /// not count as `master`. The returned name is later looked up as
    /// `origin/<name>`, so a partial match would name a branch the remote
    /// does not have.
    pub fn resolve_default_branch(&self, advertised: &AdvertisedRefs) -> Result<String> {
        let Some(first) = advertised.branch_names().next() else {
            return Err(Error::NoBranches);
        };

        if let Some(target) = &advertised.head_target {
            let target = short_branch_name(target);
            if advertised.contains(target) {
                tracing::debug!(branch = target, "Resolved branch from symbolic HEAD");
                return Ok(target.to_string());
            }
            tracing::debug!(target, "Symbolic HEAD names an unadvertised branch, ignoring");
        }

        if let Some(candidate) = self
            .candidates
            .iter()
            .find(|candidate| advertised.contains(candidate))
        {
            tracing::debug!(branch = %candidate, "Resolved branch from candidate list");
            return Ok(candidate.clone());
        }

        tracing::debug!(branch = first, "Resolved branch as first advertised ref");
        Ok(first.to_string())
    }
}
