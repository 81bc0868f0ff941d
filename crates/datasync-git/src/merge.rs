//! Merge-style pull of a fetched remote branch into the local branch.
//!
//! Checkouts are always `safe`: libgit2 computes every action up front and
//! refuses the whole checkout when a modified or untracked file would be
//! clobbered, so a refused merge leaves the working tree as it was.

use git2::build::CheckoutBuilder;
use git2::{Commit, ErrorCode, Oid};

use crate::handle::RepositoryHandle;
use crate::remote::ORIGIN;
use crate::{Error, Result};

/// What a merge pull did to the local branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Local branch already contains the remote tip.
    UpToDate,
    /// Local branch moved forward to the remote tip.
    FastForward,
    /// A merge commit joining local and remote history was created.
    Merged,
    /// HEAD was unborn; the local branch now starts at the remote tip.
    Adopted,
}

/// Full name of the remote-tracking ref for `branch`.
pub fn tracking_ref_name(branch: &str) -> String {
    format!("refs/remotes/{ORIGIN}/{branch}")
}

fn remote_tip<'r>(handle: &'r RepositoryHandle, branch: &str) -> Result<Commit<'r>> {
    let reference = handle
        .repo()
        .find_reference(&tracking_ref_name(branch))
        .map_err(|e| match e.code() {
            ErrorCode::NotFound | ErrorCode::InvalidSpec => Error::BranchNotFound {
                name: tracking_ref_name(branch),
            },
            _ => Error::Git(e),
        })?;
    Ok(reference.peel_to_commit()?)
}

fn refused(branch: &str, error: git2::Error) -> Error {
    if error.code() == ErrorCode::Conflict || error.class() == git2::ErrorClass::Checkout {
        Error::MergeConflict {
            branch: branch.to_string(),
            message: error.message().to_string(),
        }
    } else {
        Error::Git(error)
    }
}

/// Merge `origin/<branch>` into the checked-out branch.
pub fn merge_remote_branch(
    handle: &RepositoryHandle,
    branch: &str,
    fallback_name: &str,
) -> Result<MergeOutcome> {
    let repo = handle.repo();
    let theirs = remote_tip(handle, branch)?;

    let Some(ours) = handle.head_commit()? else {
        adopt_remote_branch(handle, branch)?;
        return Ok(MergeOutcome::Adopted);
    };

    let annotated = repo.find_annotated_commit(theirs.id())?;
    let (analysis, _) = repo.merge_analysis(&[&annotated])?;

    if analysis.is_up_to_date() {
        tracing::debug!(branch, "Local branch is up to date");
        return Ok(MergeOutcome::UpToDate);
    }

    if analysis.is_fast_forward() {
        let mut checkout = CheckoutBuilder::new();
        checkout.safe();
        repo.checkout_tree(theirs.as_object(), Some(&mut checkout))
            .map_err(|e| refused(branch, e))?;

        let mut head = repo.head()?;
        head.set_target(theirs.id(), &format!("pull: fast-forward to {ORIGIN}/{branch}"))?;
        tracing::debug!(branch, to = %theirs.id(), "Fast-forwarded");
        return Ok(MergeOutcome::FastForward);
    }

    let mut merged = repo.merge_commits(&ours, &theirs, None)?;
    if merged.has_conflicts() {
        return Err(Error::MergeConflict {
            branch: branch.to_string(),
            message: "local and remote histories changed the same content".to_string(),
        });
    }

    let tree_id = merged.write_tree_to(repo)?;
    let tree = repo.find_tree(tree_id)?;
    let mut checkout = CheckoutBuilder::new();
    checkout.safe();
    repo.checkout_tree(tree.as_object(), Some(&mut checkout))
        .map_err(|e| refused(branch, e))?;

    let sig = handle.signature(fallback_name)?;
    let message = format!("Merge {ORIGIN}/{branch}");
    let oid = repo.commit(Some("HEAD"), &sig, &sig, &message, &tree, &[&ours, &theirs])?;
    tracing::debug!(branch, commit = %oid, "Created merge commit");
    Ok(MergeOutcome::Merged)
}

/// Start the local `branch` at `origin/<branch>` and check it out.
///
/// Used when HEAD is unborn. The index is set to the remote tree and only
/// missing files are written; files already present in the working tree
/// are kept and show up as local modifications when they differ.
pub fn adopt_remote_branch(handle: &RepositoryHandle, branch: &str) -> Result<Oid> {
    let repo = handle.repo();
    let theirs = remote_tip(handle, branch)?;
    let local_ref = format!("refs/heads/{branch}");

    repo.reference(
        &local_ref,
        theirs.id(),
        true,
        &format!("pull: adopt {ORIGIN}/{branch}"),
    )?;
    repo.set_head(&local_ref)?;

    let mut index = repo.index()?;
    index.read_tree(&theirs.tree()?)?;
    index.write()?;

    let mut checkout = CheckoutBuilder::new();
    checkout.safe().recreate_missing(true);
    repo.checkout_head(Some(&mut checkout))
        .map_err(|e| refused(branch, e))?;

    tracing::debug!(branch, commit = %theirs.id(), "Adopted remote branch");
    Ok(theirs.id())
}
