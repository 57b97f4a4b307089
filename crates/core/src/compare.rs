//! Branch comparison: resolve two branches and classify their differences.
//!
//! Every query shape (modified paths, all changed paths, path + action pairs,
//! and the single-file diff in [`crate::conflict`]) goes through
//! [`resolve_and_classify`], so they always agree on classification.
//!
//! | Raw record | Classified as | Path reported |
//! |------------|---------------|---------------|
//! | Insert     | `Added`       | new path      |
//! | Modify     | `Modified`    | new path      |
//! | Delete     | `Deleted`     | old path      |
//! | unknown    | skipped       | -             |

use tracing::{debug, info, instrument};

use crate::errors::{CompareError, RepositoryError};
use crate::git::provider::{RawAction, RawChange, SnapshotProvider};
use crate::models::{BranchSide, Change, ChangeAction, ChangeFilter, ChangeSummary};

/// Two resolved snapshots and the classified changes between them.
#[derive(Debug, Clone)]
pub struct Comparison<S> {
    pub target_branch: String,
    pub base_branch: String,
    pub target: S,
    pub base: S,
    changes: Vec<Change>,
}

impl<S> Comparison<S> {
    /// Classified changes accepted by `filter`, in provider order.
    pub fn changes(&self, filter: ChangeFilter) -> impl Iterator<Item = &Change> + '_ {
        self.changes.iter().filter(move |c| filter.accepts(c))
    }

    pub fn into_changes(self, filter: ChangeFilter) -> Vec<Change> {
        self.changes
            .into_iter()
            .filter(|c| filter.accepts(c))
            .collect()
    }

    /// The classified change for `path`, if it differs between the branches.
    pub fn find(&self, path: &str) -> Option<&Change> {
        self.changes.iter().find(|c| c.path == path)
    }
}

/// Resolve a branch for one side of a comparison, naming the side on failure.
pub(crate) fn resolve_side<P: SnapshotProvider>(
    provider: &P,
    name: &str,
    side: BranchSide,
) -> Result<P::Snapshot, CompareError> {
    provider.resolve_branch(name).map_err(|e| match e {
        RepositoryError::RefNotFound(_) => CompareError::BranchNotFound {
            name: name.to_string(),
            side,
        },
        other => CompareError::Repository(other),
    })
}

/// Turn a raw record into a [`Change`]. Records whose action or relevant
/// path is unknown yield `None`.
pub fn classify(raw: RawChange) -> Option<Change> {
    let (path, action) = match raw.action? {
        RawAction::Insert => (raw.new_path?, ChangeAction::Added),
        RawAction::Modify => (raw.new_path?, ChangeAction::Modified),
        RawAction::Delete => (raw.old_path?, ChangeAction::Deleted),
    };
    Some(Change { path, action })
}

/// Resolve `target` and `base`, diff base -> target, and classify.
///
/// Undeterminable records are skipped and logged, never surfaced as errors.
#[instrument(skip(provider))]
pub fn resolve_and_classify<P: SnapshotProvider>(
    provider: &P,
    target: &str,
    base: &str,
) -> Result<Comparison<P::Snapshot>, CompareError> {
    let target_snapshot = resolve_side(provider, target, BranchSide::Target)?;
    let base_snapshot = resolve_side(provider, base, BranchSide::Base)?;

    let raw = provider.diff(&base_snapshot, &target_snapshot)?;
    let raw_count = raw.len();
    let mut changes = Vec::with_capacity(raw_count);
    for record in raw {
        match classify(record.clone()) {
            Some(change) => changes.push(change),
            None => debug!(?record, "skipping change record with undetermined action"),
        }
    }

    info!(raw = raw_count, classified = changes.len(), "compared branches");
    Ok(Comparison {
        target_branch: target.to_string(),
        base_branch: base.to_string(),
        target: target_snapshot,
        base: base_snapshot,
        changes,
    })
}

/// Classified changes between `target` and `base`, filtered.
pub fn compare_branches<P: SnapshotProvider>(
    provider: &P,
    target: &str,
    base: &str,
    filter: ChangeFilter,
) -> Result<Vec<Change>, CompareError> {
    Ok(resolve_and_classify(provider, target, base)?.into_changes(filter))
}

/// Paths added or modified on `target` relative to `base`.
pub fn modified_files<P: SnapshotProvider>(
    provider: &P,
    target: &str,
    base: &str,
) -> Result<Vec<String>, CompareError> {
    let changes = compare_branches(provider, target, base, ChangeFilter::AddedOrModified)?;
    Ok(paths(changes))
}

/// Paths added, modified or deleted on `target` relative to `base`.
pub fn all_changed_files<P: SnapshotProvider>(
    provider: &P,
    target: &str,
    base: &str,
) -> Result<Vec<String>, CompareError> {
    Ok(paths(compare_branches(provider, target, base, ChangeFilter::All)?))
}

/// Path + action pairs for every change.
pub fn file_changes<P: SnapshotProvider>(
    provider: &P,
    target: &str,
    base: &str,
) -> Result<Vec<Change>, CompareError> {
    compare_branches(provider, target, base, ChangeFilter::All)
}

/// Per-action counts for every change.
pub fn summarize<P: SnapshotProvider>(
    provider: &P,
    target: &str,
    base: &str,
) -> Result<ChangeSummary, CompareError> {
    let changes = file_changes(provider, target, base)?;
    Ok(ChangeSummary::from_changes(&changes))
}

fn paths(changes: Vec<Change>) -> Vec<String> {
    changes.into_iter().map(|c| c.path).collect()
}
