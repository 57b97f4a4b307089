//! Local Git repository access via `git2`.

use std::path::{Path, PathBuf};

use git2::{
    BranchType, Cred, Delta, ErrorCode, FetchOptions, FileMode, ObjectType, Oid, RemoteCallbacks,
    Repository, TreeWalkMode, TreeWalkResult,
};
use tracing::{debug, info, instrument};

use crate::errors::RepositoryError;
use crate::git::provider::{RawAction, RawChange, SnapshotProvider};
use crate::models::BranchScope;

/// Read-only view over a `git2::Repository` bound to one on-disk location.
pub struct GitRepository {
    repo: Repository,
    repo_path: PathBuf,
}

/// The tree of the commit a branch pointed at when it was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchSnapshot {
    pub branch: String,
    pub commit: Oid,
    pub tree: Oid,
}

impl GitRepository {
    /// Open an existing Git repository at `repo_path`.
    pub fn open<P: AsRef<Path>>(repo_path: P) -> Result<Self, RepositoryError> {
        let path = repo_path.as_ref();
        info!(path = %path.display(), "opening git repository");
        if !path.exists() {
            return Err(RepositoryError::PathNotFound(path.display().to_string()));
        }
        let repo = Repository::open(path)
            .map_err(|_| RepositoryError::NotAGitRepo(path.display().to_string()))?;
        Ok(Self {
            repo,
            repo_path: path.to_path_buf(),
        })
    }

    /// Clone a remote repository to `path`, optionally authenticating with an
    /// HTTPS token.
    #[instrument(skip(token), fields(url = %url, path = %path.display()))]
    pub fn clone_repo(url: &str, path: &Path, token: Option<&str>) -> Result<Self, RepositoryError> {
        info!("cloning git repository");
        let mut callbacks = RemoteCallbacks::new();
        if let Some(tok) = token {
            let tok = tok.to_string();
            callbacks.credentials(move |_url, _username, _allowed| {
                Cred::userpass_plaintext("x-access-token", &tok)
            });
        }
        let mut fetch_opts = FetchOptions::new();
        fetch_opts.remote_callbacks(callbacks);
        let mut builder = git2::build::RepoBuilder::new();
        builder.fetch_options(fetch_opts);
        let repo = builder
            .clone(url, path)
            .map_err(|e| RepositoryError::CloneFailed {
                url: url.to_string(),
                detail: e.message().to_string(),
            })?;
        info!("clone completed");
        Ok(Self {
            repo,
            repo_path: path.to_path_buf(),
        })
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Name of the checked-out branch, or `None` for a detached or unborn HEAD.
    pub fn head_branch(&self) -> Result<Option<String>, RepositoryError> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        if !head.is_branch() {
            return Ok(None);
        }
        Ok(head.shorthand().map(str::to_string))
    }

    fn find_branch(&self, name: &str) -> Result<git2::Branch<'_>, RepositoryError> {
        for kind in [BranchType::Local, BranchType::Remote] {
            match self.repo.find_branch(name, kind) {
                Ok(branch) => return Ok(branch),
                Err(e) if matches!(e.code(), ErrorCode::NotFound | ErrorCode::InvalidSpec) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Err(RepositoryError::RefNotFound(name.to_string()))
    }

    fn collect_branches(&self, kind: BranchType, out: &mut Vec<String>) -> Result<(), RepositoryError> {
        for branch_result in self.repo.branches(Some(kind))? {
            let (branch, _) = branch_result?;
            let Some(name) = branch.name()? else {
                continue;
            };
            // `origin/HEAD` is a symbolic pointer, not a branch of its own.
            if matches!(kind, BranchType::Remote) && name.ends_with("/HEAD") {
                continue;
            }
            out.push(name.to_string());
        }
        Ok(())
    }
}

fn path_string(path: Option<&Path>) -> Option<String> {
    path.map(|p| p.to_string_lossy().into_owned())
}

impl SnapshotProvider for GitRepository {
    type Snapshot = BranchSnapshot;

    #[instrument(skip(self))]
    fn resolve_branch(&self, name: &str) -> Result<BranchSnapshot, RepositoryError> {
        let branch = self.find_branch(name)?;
        let commit = branch.get().peel_to_commit()?;
        debug!(commit = %commit.id(), "resolved branch");
        Ok(BranchSnapshot {
            branch: name.to_string(),
            commit: commit.id(),
            tree: commit.tree_id(),
        })
    }

    fn read_file(
        &self,
        snapshot: &BranchSnapshot,
        path: &str,
    ) -> Result<Option<Vec<u8>>, RepositoryError> {
        let tree = self.repo.find_tree(snapshot.tree)?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if entry.kind() != Some(ObjectType::Blob) {
            return Ok(None);
        }
        let blob = self.repo.find_blob(entry.id())?;
        Ok(Some(blob.content().to_vec()))
    }

    fn diff(
        &self,
        base: &BranchSnapshot,
        target: &BranchSnapshot,
    ) -> Result<Vec<RawChange>, RepositoryError> {
        let base_tree = self.repo.find_tree(base.tree)?;
        let target_tree = self.repo.find_tree(target.tree)?;
        let diff = self
            .repo
            .diff_tree_to_tree(Some(&base_tree), Some(&target_tree), None)?;

        let records = diff
            .deltas()
            .map(|delta| {
                // Submodule entries have no blob content on either side.
                let gitlink = matches!(delta.old_file().mode(), FileMode::Commit)
                    || matches!(delta.new_file().mode(), FileMode::Commit);
                let action = match delta.status() {
                    _ if gitlink => None,
                    Delta::Added => Some(RawAction::Insert),
                    Delta::Modified | Delta::Typechange => Some(RawAction::Modify),
                    Delta::Deleted => Some(RawAction::Delete),
                    _ => None,
                };
                RawChange {
                    action,
                    old_path: path_string(delta.old_file().path()),
                    new_path: path_string(delta.new_file().path()),
                }
            })
            .collect::<Vec<_>>();
        debug!(count = records.len(), "diffed trees");
        Ok(records)
    }

    fn list_files(&self, snapshot: &BranchSnapshot) -> Result<Vec<String>, RepositoryError> {
        let tree = self.repo.find_tree(snapshot.tree)?;
        let mut files = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                if let Some(name) = entry.name() {
                    files.push(format!("{}{}", root, name));
                }
            }
            TreeWalkResult::Ok
        })?;
        files.sort();
        Ok(files)
    }

    fn list_branches(&self, scope: BranchScope) -> Result<Vec<String>, RepositoryError> {
        let mut names = Vec::new();
        if scope.includes_local() {
            self.collect_branches(BranchType::Local, &mut names)?;
        }
        if scope.includes_remote() {
            self.collect_branches(BranchType::Remote, &mut names)?;
        }
        names.sort();
        names.dedup();
        Ok(names)
    }
}
