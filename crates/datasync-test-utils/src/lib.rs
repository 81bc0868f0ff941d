//! Shared test utilities for the datasync workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`git`]: bare remotes with scripted history
//! - [`repo`]: [`SyncFixture`](repo::SyncFixture) with user and bundled roots

pub mod git;
pub mod repo;

pub use git::RemoteFixture;
pub use repo::SyncFixture;
