//! The caller-owned handle every query goes through.
//!
//! A [`Session`] starts unbound. Binding it to a repository (an existing
//! local clone or a fresh clone of a remote) makes the query methods
//! available; before that they fail with
//! [`CompareError::RepositoryNotInitialized`]. Rebinding replaces the
//! previous repository. Sessions are plain values, so independent sessions
//! can serve independent repositories side by side.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::compare;
use crate::conflict::{self, LineAlignment, PositionalAlignment};
use crate::errors::{CompareError, MaterializeError, RepositoryError};
use crate::git::{GitRepository, SnapshotProvider};
use crate::materialize;
use crate::models::{BranchScope, BranchSide, Change, ChangeFilter, ChangeSummary};

pub struct Session {
    repo: Option<GitRepository>,
    alignment: Box<dyn LineAlignment>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("repo", &self.repo.as_ref().map(|r| r.repo_path().to_path_buf()))
            .field("alignment", &self.alignment.name())
            .finish()
    }
}

impl Session {
    /// An unbound session using positional alignment.
    pub fn new() -> Self {
        Self {
            repo: None,
            alignment: Box::new(PositionalAlignment),
        }
    }

    /// Bind to the existing repository at `path`, replacing any prior binding.
    pub fn bind<P: AsRef<Path>>(&mut self, path: P) -> Result<(), RepositoryError> {
        let repo = GitRepository::open(path)?;
        info!(path = %repo.repo_path().display(), "session bound");
        self.repo = Some(repo);
        Ok(())
    }

    /// Clone `url` into `path` and bind to the clone.
    pub fn bind_remote(
        &mut self,
        url: &str,
        path: &Path,
        token: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let repo = GitRepository::clone_repo(url, path, token)?;
        info!(url, path = %path.display(), "session bound to fresh clone");
        self.repo = Some(repo);
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.repo.is_some()
    }

    pub fn repo_path(&self) -> Option<PathBuf> {
        self.repo.as_ref().map(|r| r.repo_path().to_path_buf())
    }

    /// Replace the line alignment used by the diff operations.
    pub fn set_alignment(&mut self, alignment: Box<dyn LineAlignment>) {
        self.alignment = alignment;
    }

    pub fn alignment(&self) -> &dyn LineAlignment {
        self.alignment.as_ref()
    }

    fn repo(&self) -> Result<&GitRepository, CompareError> {
        self.repo.as_ref().ok_or(CompareError::RepositoryNotInitialized)
    }

    /// Branch names in `scope`, sorted.
    pub fn list_branches(&self, scope: BranchScope) -> Result<Vec<String>, CompareError> {
        Ok(self.repo()?.list_branches(scope)?)
    }

    /// The checked-out branch, if HEAD points at one.
    pub fn current_branch(&self) -> Result<Option<String>, CompareError> {
        Ok(self.repo()?.head_branch()?)
    }

    /// Every file path on `branch`, sorted.
    pub fn list_files(&self, branch: &str) -> Result<Vec<String>, CompareError> {
        let repo = self.repo()?;
        let snapshot = compare::resolve_side(repo, branch, BranchSide::Target)?;
        Ok(repo.list_files(&snapshot)?)
    }

    pub fn compare_branches(
        &self,
        target: &str,
        base: &str,
        filter: ChangeFilter,
    ) -> Result<Vec<Change>, CompareError> {
        compare::compare_branches(self.repo()?, target, base, filter)
    }

    pub fn modified_files(&self, target: &str, base: &str) -> Result<Vec<String>, CompareError> {
        compare::modified_files(self.repo()?, target, base)
    }

    pub fn all_changed_files(&self, target: &str, base: &str) -> Result<Vec<String>, CompareError> {
        compare::all_changed_files(self.repo()?, target, base)
    }

    pub fn file_changes(&self, target: &str, base: &str) -> Result<Vec<Change>, CompareError> {
        compare::file_changes(self.repo()?, target, base)
    }

    pub fn summarize(&self, target: &str, base: &str) -> Result<ChangeSummary, CompareError> {
        compare::summarize(self.repo()?, target, base)
    }

    /// Conflict-marker text for one changed file.
    pub fn diff_file(&self, target: &str, base: &str, path: &str) -> Result<String, CompareError> {
        let mut rendered =
            conflict::diff_file(self.repo()?, target, base, path, self.alignment.as_ref())?;
        rendered
            .remove(path)
            .ok_or_else(|| CompareError::FileNotInDiff(path.to_string()))
    }

    /// Clear `dest` and write every added or modified file into it.
    ///
    /// A `dest` that is the repository or one of its ancestors is rejected
    /// with [`CompareError::UnsafeDestination`] before anything is removed.
    pub fn download_changed_files(
        &self,
        target: &str,
        base: &str,
        dest: &Path,
    ) -> Result<Vec<PathBuf>, MaterializeError> {
        let repo = self
            .repo()
            .map_err(|e| MaterializeError::new(Vec::new(), e))?;
        if materialize::overlaps_repository(dest, repo.repo_path()) {
            let err = CompareError::UnsafeDestination(dest.to_path_buf());
            return Err(MaterializeError::new(Vec::new(), err));
        }
        materialize::download_changed_files(repo, target, base, dest)
    }

    /// Conflict-marker text for each local file under `dir` that differs
    /// from `branch`.
    pub fn diff_directory(
        &self,
        branch: &str,
        dir: &Path,
    ) -> Result<BTreeMap<String, String>, CompareError> {
        conflict::diff_directory(self.repo()?, branch, dir, self.alignment.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_session_rejects_queries() {
        let session = Session::new();
        assert!(!session.is_bound());
        assert!(matches!(
            session.modified_files("feature", "main"),
            Err(CompareError::RepositoryNotInitialized)
        ));
        assert!(matches!(
            session.list_branches(BranchScope::All),
            Err(CompareError::RepositoryNotInitialized)
        ));
        assert!(matches!(
            session.diff_file("feature", "main", "a.txt"),
            Err(CompareError::RepositoryNotInitialized)
        ));
        let dir = tempfile::tempdir().unwrap();
        let err = session
            .download_changed_files("feature", "main", &dir.path().join("out"))
            .unwrap_err();
        assert!(matches!(err.source, CompareError::RepositoryNotInitialized));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_failed_bind_keeps_session_unbound() {
        let mut session = Session::new();
        assert!(session.bind("/nonexistent/gitmerge-repo").is_err());
        assert!(!session.is_bound());
    }

    #[test]
    fn test_set_alignment() {
        let mut session = Session::default();
        session.set_alignment(Box::new(PositionalAlignment));
        assert_eq!(session.alignment().name(), "positional");
    }
}
