//! Git layer for datasync
//!
//! Wraps `git2` with the handful of operations the sync engine needs:
//! an owned repository handle, remote wiring with credentials and scheme
//! policy, default-branch resolution, merge pulls, and reading file content
//! from a branch tip without a checkout.

pub mod blob;
pub mod branch;
pub mod commits;
pub mod error;
pub mod handle;
pub mod merge;
pub mod remote;

pub use blob::read_remote_file;
pub use branch::{AdvertisedRefs, BranchResolver, DEFAULT_BRANCH_CANDIDATES, short_branch_name};
pub use commits::{CommitInfo, list_recent_commits};
pub use error::{Error, Result};
pub use handle::RepositoryHandle;
pub use merge::{MergeOutcome, adopt_remote_branch, merge_remote_branch, tracking_ref_name};
pub use remote::{
    FETCH_REFSPEC, ORIGIN, RemoteConfig, SchemePolicy, advertised_refs, configure_remote, fetch,
    push_branch, tracking_refs,
};
