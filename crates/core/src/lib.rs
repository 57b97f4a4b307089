//! gitmerge core library.
//!
//! This crate compares two branches of a Git repository and reports what
//! changed, renders changed files as conflict-marker text, and writes the
//! target-side content of changed files into a local directory. Everything
//! is reached through a caller-owned [`Session`], or through the free
//! functions in [`compare`], [`conflict`] and [`materialize`] against any
//! [`SnapshotProvider`](git::SnapshotProvider).

pub mod compare;
pub mod config;
pub mod conflict;
pub mod errors;
pub mod git;
pub mod materialize;
pub mod models;
pub mod session;

#[cfg(test)]
mod test_support;

// Re-exports for convenience.
pub use config::AppConfig;
pub use errors::{CompareError, ConfigError, CoreError, MaterializeError, RepositoryError};
pub use git::GitRepository;
pub use models::{BranchScope, Change, ChangeAction, ChangeFilter, ChangeSummary};
pub use session::Session;
