//! Error types for the gitmerge core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::BranchSide;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Compare(#[from] CompareError),

    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Repository (snapshot provider) errors
// ---------------------------------------------------------------------------

/// Errors from opening a repository or reading its snapshots.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The path to bind does not exist on disk.
    #[error("path not found: '{0}'")]
    PathNotFound(String),

    /// The path exists but holds no git repository.
    #[error("not a git repository: '{0}' (make sure the directory is a valid git repository)")]
    NotAGitRepo(String),

    /// A branch name could not be resolved to a commit.
    #[error("git ref not found: {0}")]
    RefNotFound(String),

    /// Cloning a remote repository failed.
    #[error("failed to clone '{url}': {detail}")]
    CloneFailed {
        url: String,
        detail: String,
    },

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// Generic I/O wrapper.
    #[error("repository I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Comparison errors
// ---------------------------------------------------------------------------

/// Errors from branch comparison, file diffing and materialization.
#[derive(Debug, Error)]
pub enum CompareError {
    /// A query was issued before any repository was bound to the session.
    #[error("repository not initialized: bind a repository before querying it")]
    RepositoryNotInitialized,

    /// Resolving the target or base branch failed.
    #[error("{side} branch '{name}' not found")]
    BranchNotFound {
        name: String,
        side: BranchSide,
    },

    /// The requested file is not among the changes between the two branches.
    #[error("file '{0}' not found in the differences between the branches")]
    FileNotInDiff(String),

    /// The requested file was deleted on the target branch, so it has no
    /// target-side content to diff.
    #[error("file '{0}' was deleted or not modified")]
    FileDeletedOrUnchanged(String),

    /// Content could not be read for a path expected to exist.
    #[error("failed to read '{path}' on branch '{branch}': {detail}")]
    ReadError {
        path: String,
        branch: String,
        detail: String,
    },

    /// Reading, writing or clearing a local filesystem path failed.
    #[error("I/O error at '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The destination directory is the repository or one of its ancestors,
    /// so clearing it would destroy the repository.
    #[error("refusing to clear '{}': it contains the repository", .0.display())]
    UnsafeDestination(PathBuf),

    /// Walking a local directory failed.
    #[error("failed to walk '{path}': {detail}")]
    WalkError {
        path: String,
        detail: String,
    },

    /// Underlying repository error (tree walk, diff).
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

// ---------------------------------------------------------------------------
// Materialization errors
// ---------------------------------------------------------------------------

/// A failed materialization, together with every file written before the
/// failure. Partial output is left on disk.
#[derive(Debug, Error)]
#[error("materialization stopped after {} file(s): {source}", .written.len())]
pub struct MaterializeError {
    /// Destination paths written before the failure, in write order.
    pub written: Vec<PathBuf>,
    /// What stopped the materialization.
    pub source: CompareError,
}

impl MaterializeError {
    pub(crate) fn new(written: Vec<PathBuf>, source: impl Into<CompareError>) -> Self {
        Self {
            written,
            source: source.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
