//! Write the target-side content of changed files into a local directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::compare::resolve_and_classify;
use crate::errors::{CompareError, MaterializeError};
use crate::git::provider::SnapshotProvider;
use crate::models::ChangeFilter;

/// A destination directory that has been emptied and recreated.
#[derive(Debug)]
pub struct DestinationDir {
    root: PathBuf,
}

impl DestinationDir {
    /// Remove everything under `path` (if it exists) and recreate it empty.
    pub fn clear<P: AsRef<Path>>(path: P) -> Result<Self, CompareError> {
        let root = path.as_ref().to_path_buf();
        let io_err = |source| CompareError::Io {
            path: root.clone(),
            source,
        };
        match fs::symlink_metadata(&root) {
            Ok(meta) if meta.is_dir() => {
                debug!(path = %root.display(), "removing existing destination");
                fs::remove_dir_all(&root).map_err(io_err)?;
            }
            Ok(_) => {
                debug!(path = %root.display(), "removing file in place of destination");
                fs::remove_file(&root).map_err(io_err)?;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(e)),
        }
        fs::create_dir_all(&root).map_err(io_err)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` at the `/`-separated repository path `rel`, creating
    /// intermediate directories. Returns the full destination path.
    ///
    /// Only plain name components are kept, so `..`, `.` and absolute
    /// prefixes in `rel` can never lead outside the root.
    pub fn write(&self, rel: &str, bytes: &[u8]) -> Result<PathBuf, CompareError> {
        let dest = rel
            .split('/')
            .flat_map(|part| Path::new(part).components())
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name),
                _ => None,
            })
            .fold(self.root.clone(), |acc, part| acc.join(part));
        if dest == self.root {
            return Err(CompareError::Io {
                path: dest,
                source: std::io::Error::new(ErrorKind::InvalidInput, format!("no file name in '{rel}'")),
            });
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|source| CompareError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&dest, bytes).map_err(|source| CompareError::Io {
            path: dest.clone(),
            source,
        })?;
        Ok(dest)
    }
}

/// True when clearing `dest` would remove `repo`: `dest` is the repository
/// directory itself or one of its ancestors.
///
/// Paths are compared after canonicalization; a path that does not exist yet
/// is made absolute against the current directory instead.
pub fn overlaps_repository(dest: &Path, repo: &Path) -> bool {
    let dest = normalize(dest);
    let repo = normalize(repo);
    repo.starts_with(&dest)
}

fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    absolute.components().fold(PathBuf::new(), |mut acc, c| {
        match c {
            Component::CurDir => {}
            Component::ParentDir => {
                acc.pop();
            }
            other => acc.push(other),
        }
        acc
    })
}

/// Clear `dest`, then write every file added or modified on `target`
/// relative to `base` beneath it, mirroring repository paths.
///
/// Deleted files are not written. On failure the files already written stay
/// on disk and are listed in the returned [`MaterializeError`].
#[instrument(skip(provider), fields(dest = %dest.display()))]
pub fn download_changed_files<P: SnapshotProvider>(
    provider: &P,
    target: &str,
    base: &str,
    dest: &Path,
) -> Result<Vec<PathBuf>, MaterializeError> {
    let out = DestinationDir::clear(dest).map_err(|e| MaterializeError::new(Vec::new(), e))?;
    let comparison =
        resolve_and_classify(provider, target, base).map_err(|e| MaterializeError::new(Vec::new(), e))?;

    let mut written = Vec::new();
    for change in comparison.changes(ChangeFilter::AddedOrModified) {
        let bytes = match provider.read_file(&comparison.target, &change.path) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                let err = CompareError::ReadError {
                    path: change.path.clone(),
                    branch: target.to_string(),
                    detail: "file is missing from the branch".into(),
                };
                return Err(MaterializeError::new(written, err));
            }
            Err(e) => {
                let err = CompareError::ReadError {
                    path: change.path.clone(),
                    branch: target.to_string(),
                    detail: e.to_string(),
                };
                return Err(MaterializeError::new(written, err));
            }
        };
        match out.write(&change.path, &bytes) {
            Ok(path) => {
                debug!(path = %path.display(), action = %change.action, "wrote file");
                written.push(path);
            }
            Err(e) => return Err(MaterializeError::new(written, e)),
        }
    }

    info!(count = written.len(), "materialized changed files");
    Ok(written)
}
