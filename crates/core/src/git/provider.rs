//! The snapshot capability the comparison engine is written against.
//!
//! A provider resolves branch names to immutable tree snapshots, reads file
//! content out of a snapshot and reports the raw differences between two
//! snapshots. [`GitRepository`](super::GitRepository) is the `git2`-backed
//! implementation; the engine never touches `git2` directly.

use crate::errors::RepositoryError;
use crate::models::BranchScope;

/// Action tag on a raw change record, relative to moving from the base
/// snapshot to the target snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawAction {
    Insert,
    Modify,
    Delete,
}

/// One record from a snapshot diff, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChange {
    /// `None` when the provider could not determine what happened.
    pub action: Option<RawAction>,
    /// Path on the base side, if any.
    pub old_path: Option<String>,
    /// Path on the target side, if any.
    pub new_path: Option<String>,
}

impl RawChange {
    pub fn insert(path: impl Into<String>) -> Self {
        Self {
            action: Some(RawAction::Insert),
            old_path: None,
            new_path: Some(path.into()),
        }
    }

    pub fn modify(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            action: Some(RawAction::Modify),
            old_path: Some(path.clone()),
            new_path: Some(path),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            action: Some(RawAction::Delete),
            old_path: Some(path.into()),
            new_path: None,
        }
    }
}

/// Read-only access to branch snapshots.
pub trait SnapshotProvider {
    /// An immutable tree snapshot. Cheap to hold; never mutated.
    type Snapshot;

    /// Resolve a branch name to its commit's tree snapshot.
    ///
    /// Returns [`RepositoryError::RefNotFound`] when no branch has that name.
    fn resolve_branch(&self, name: &str) -> Result<Self::Snapshot, RepositoryError>;

    /// Read a file out of a snapshot. `Ok(None)` means the path is not
    /// present; `Err` means it could not be read.
    fn read_file(
        &self,
        snapshot: &Self::Snapshot,
        path: &str,
    ) -> Result<Option<Vec<u8>>, RepositoryError>;

    /// Diff two snapshots, reporting what moving from `base` to `target`
    /// changes.
    fn diff(
        &self,
        base: &Self::Snapshot,
        target: &Self::Snapshot,
    ) -> Result<Vec<RawChange>, RepositoryError>;

    /// Every file path tracked in a snapshot, forward-slash separated.
    fn list_files(&self, snapshot: &Self::Snapshot) -> Result<Vec<String>, RepositoryError>;

    /// Branch names visible in the repository, sorted.
    fn list_branches(&self, scope: BranchScope) -> Result<Vec<String>, RepositoryError>;
}
