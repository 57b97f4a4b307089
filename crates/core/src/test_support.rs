//! In-memory snapshot provider for unit tests.

use std::collections::BTreeMap;

use crate::errors::RepositoryError;
use crate::git::provider::{RawChange, SnapshotProvider};
use crate::models::BranchScope;

type Tree = BTreeMap<String, Vec<u8>>;

#[derive(Default)]
pub(crate) struct MemoryProvider {
    branches: BTreeMap<String, Tree>,
    /// Records appended verbatim to every diff result.
    pub(crate) extra_records: Vec<RawChange>,
    /// Paths whose reads fail on every branch.
    pub(crate) unreadable: Vec<String>,
}

impl MemoryProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn branch(mut self, name: &str, files: &[(&str, &str)]) -> Self {
        let tree = files
            .iter()
            .map(|(path, content)| (path.to_string(), content.as_bytes().to_vec()))
            .collect();
        self.branches.insert(name.to_string(), tree);
        self
    }
}

impl SnapshotProvider for MemoryProvider {
    type Snapshot = Tree;

    fn resolve_branch(&self, name: &str) -> Result<Tree, RepositoryError> {
        self.branches
            .get(name)
            .cloned()
            .ok_or_else(|| RepositoryError::RefNotFound(name.to_string()))
    }

    fn read_file(&self, snapshot: &Tree, path: &str) -> Result<Option<Vec<u8>>, RepositoryError> {
        if self.unreadable.iter().any(|p| p == path) {
            return Err(RepositoryError::IoError(std::io::Error::other(format!(
                "object for {} is corrupt",
                path
            ))));
        }
        Ok(snapshot.get(path).cloned())
    }

    fn diff(&self, base: &Tree, target: &Tree) -> Result<Vec<RawChange>, RepositoryError> {
        let mut records = Vec::new();
        for (path, content) in target {
            match base.get(path) {
                None => records.push(RawChange::insert(path.clone())),
                Some(old) if old != content => records.push(RawChange::modify(path.clone())),
                Some(_) => {}
            }
        }
        for path in base.keys() {
            if !target.contains_key(path) {
                records.push(RawChange::delete(path.clone()));
            }
        }
        records.sort_by(|a, b| {
            let ka = a.new_path.as_ref().or(a.old_path.as_ref());
            let kb = b.new_path.as_ref().or(b.old_path.as_ref());
            ka.cmp(&kb)
        });
        records.extend(self.extra_records.iter().cloned());
        Ok(records)
    }

    fn list_files(&self, snapshot: &Tree) -> Result<Vec<String>, RepositoryError> {
        Ok(snapshot.keys().cloned().collect())
    }

    fn list_branches(&self, scope: BranchScope) -> Result<Vec<String>, RepositoryError> {
        Ok(self
            .branches
            .keys()
            .filter(|name| {
                let remote = name.contains('/');
                (remote && scope.includes_remote()) || (!remote && scope.includes_local())
            })
            .cloned()
            .collect())
    }
}
