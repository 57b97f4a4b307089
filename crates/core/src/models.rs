//! Domain model types used throughout gitmerge.
//!
//! These types bridge the comparison engine, the session boundary and the
//! command-line front end.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Changes
// ---------------------------------------------------------------------------

/// How a path differs on the target branch relative to the base branch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    /// Present on the target branch only.
    Added,
    /// Present on both branches with different content.
    Modified,
    /// Present on the base branch only.
    Deleted,
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Modified => write!(f, "modified"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

/// A classified change between two tree snapshots.
///
/// For `Added` and `Modified` the path is the target-side path; for
/// `Deleted` it is the base-side path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Change {
    pub path: String,
    pub action: ChangeAction,
}

impl Change {
    pub fn new(path: impl Into<String>, action: ChangeAction) -> Self {
        Self {
            path: path.into(),
            action,
        }
    }

    /// `true` if the target branch holds content for this path.
    pub fn has_target_content(&self) -> bool {
        !matches!(self.action, ChangeAction::Deleted)
    }
}

/// Which classified changes a query keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChangeFilter {
    /// Drop deletions.
    #[default]
    AddedOrModified,
    /// Keep everything.
    All,
}

impl ChangeFilter {
    pub fn accepts(&self, change: &Change) -> bool {
        match self {
            Self::AddedOrModified => change.has_target_content(),
            Self::All => true,
        }
    }
}

/// Per-action counts over a change list.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeSummary {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
}

impl ChangeSummary {
    pub fn from_changes(changes: &[Change]) -> Self {
        changes.iter().fold(Self::default(), |mut acc, c| {
            match c.action {
                ChangeAction::Added => acc.added += 1,
                ChangeAction::Modified => acc.modified += 1,
                ChangeAction::Deleted => acc.deleted += 1,
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.added + self.modified + self.deleted
    }
}

// ---------------------------------------------------------------------------
// Branches
// ---------------------------------------------------------------------------

/// Which branch names an enumeration returns.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BranchScope {
    Local,
    Remote,
    #[default]
    All,
}

impl BranchScope {
    pub fn includes_local(&self) -> bool {
        matches!(self, Self::Local | Self::All)
    }

    pub fn includes_remote(&self) -> bool {
        matches!(self, Self::Remote | Self::All)
    }
}

impl std::fmt::Display for BranchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
            Self::All => write!(f, "all"),
        }
    }
}

/// Which side of a comparison a branch plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchSide {
    /// The branch under review ("ours").
    Target,
    /// The branch compared against ("theirs").
    Base,
}

impl std::fmt::Display for BranchSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Target => write!(f, "target"),
            Self::Base => write!(f, "base"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_serializes_lowercase() {
        let change = Change::new("src/main.rs", ChangeAction::Modified);
        let json = serde_json::to_string(&change).unwrap();
        assert_eq!(json, r#"{"path":"src/main.rs","action":"modified"}"#);
    }

    #[test]
    fn test_filter() {
        let added = Change::new("a", ChangeAction::Added);
        let deleted = Change::new("d", ChangeAction::Deleted);
        assert!(ChangeFilter::AddedOrModified.accepts(&added));
        assert!(!ChangeFilter::AddedOrModified.accepts(&deleted));
        assert!(ChangeFilter::All.accepts(&deleted));
    }

    #[test]
    fn test_summary_counts() {
        let changes = vec![
            Change::new("a", ChangeAction::Added),
            Change::new("b", ChangeAction::Added),
            Change::new("m", ChangeAction::Modified),
            Change::new("d", ChangeAction::Deleted),
        ];
        let summary = ChangeSummary::from_changes(&changes);
        assert_eq!(summary.added, 2);
        assert_eq!(summary.modified, 1);
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.total(), 4);
    }

    #[test]
    fn test_scope_parse() {
        let scope: BranchScope = serde_json::from_str(r#""remote""#).unwrap();
        assert_eq!(scope, BranchScope::Remote);
        assert!(!scope.includes_local());
        assert!(BranchScope::All.includes_local() && BranchScope::All.includes_remote());
    }
}
