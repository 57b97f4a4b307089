//! Git snapshot access for gitmerge.

pub mod provider;
pub mod repository;

pub use provider::{RawAction, RawChange, SnapshotProvider};
pub use repository::{BranchSnapshot, GitRepository};
