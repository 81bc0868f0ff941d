//! Reading file content straight from a branch tip without a checkout.

use std::path::Path;

use git2::ErrorCode;

use crate::handle::RepositoryHandle;
use crate::merge::tracking_ref_name;
use crate::{Error, Result};

/// Bytes of `name` as of the tip of `origin/<branch>`.
pub fn read_remote_file(handle: &RepositoryHandle, branch: &str, name: &str) -> Result<Vec<u8>> {
    let repo = handle.repo();
    let reference = repo
        .find_reference(&tracking_ref_name(branch))
        .map_err(|e| match e.code() {
            ErrorCode::NotFound | ErrorCode::InvalidSpec => Error::BranchNotFound {
                name: tracking_ref_name(branch),
            },
            _ => Error::Git(e),
        })?;
    let tree = reference.peel_to_commit()?.tree()?;

    let not_found = || Error::FileNotInCommit {
        name: name.to_string(),
        branch: branch.to_string(),
    };
    let entry = match tree.get_path(Path::new(name)) {
        Ok(entry) => entry,
        Err(e) if e.code() == ErrorCode::NotFound => return Err(not_found()),
        Err(e) => return Err(e.into()),
    };
    if entry.kind() != Some(git2::ObjectType::Blob) {
        return Err(not_found());
    }

    let blob = repo.find_blob(entry.id())?;
    Ok(blob.content().to_vec())
}
