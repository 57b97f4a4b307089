//! Single-file and directory diffs rendered with conflict markers.

use std::collections::BTreeMap;
use std::path::{Component, Path};

use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use super::markers::{decode_text, LineAlignment};
use crate::compare::{resolve_and_classify, resolve_side};
use crate::errors::CompareError;
use crate::git::provider::SnapshotProvider;
use crate::models::BranchSide;

/// Render the file at `path` as it differs between `target` (ours) and
/// `base` (theirs).
///
/// The path must be among the changes between the branches and must still
/// exist on `target`. When the base branch has no such file its side is
/// empty, so an added file renders as its full content with no markers.
/// The result holds exactly one entry, keyed by `path`.
#[instrument(skip(provider, alignment))]
pub fn diff_file<P: SnapshotProvider>(
    provider: &P,
    target: &str,
    base: &str,
    path: &str,
    alignment: &dyn LineAlignment,
) -> Result<BTreeMap<String, String>, CompareError> {
    let comparison = resolve_and_classify(provider, target, base)?;
    let change = comparison
        .find(path)
        .ok_or_else(|| CompareError::FileNotInDiff(path.to_string()))?;
    if !change.has_target_content() {
        return Err(CompareError::FileDeletedOrUnchanged(path.to_string()));
    }

    let read_error = |branch: &str, detail: String| CompareError::ReadError {
        path: path.to_string(),
        branch: branch.to_string(),
        detail,
    };

    let theirs = match provider.read_file(&comparison.base, path) {
        Ok(Some(bytes)) => decode_text(path, &bytes),
        Ok(None) => String::new(),
        Err(e) => return Err(read_error(base, e.to_string())),
    };
    let ours = match provider.read_file(&comparison.target, path) {
        Ok(Some(bytes)) => decode_text(path, &bytes),
        Ok(None) => return Err(read_error(target, "file is missing from the branch".into())),
        Err(e) => return Err(read_error(target, e.to_string())),
    };

    let rendered = alignment.render(&theirs, &ours);
    let mut result = BTreeMap::new();
    result.insert(path.to_string(), rendered);
    Ok(result)
}

/// Render every file under the local directory `dir` against the same path
/// on `branch`.
///
/// The branch version is "theirs" and the local file is "ours". Files the
/// branch does not have and files whose bytes are identical are skipped.
/// Keys are paths relative to `dir` with `/` separators. `.git` directories
/// are not walked.
#[instrument(skip(provider, alignment), fields(dir = %dir.display()))]
pub fn diff_directory<P: SnapshotProvider>(
    provider: &P,
    branch: &str,
    dir: &Path,
    alignment: &dyn LineAlignment,
) -> Result<BTreeMap<String, String>, CompareError> {
    let snapshot = resolve_side(provider, branch, BranchSide::Base)?;
    let mut result = BTreeMap::new();

    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git");
    for entry in walker {
        let entry = entry.map_err(|e| CompareError::WalkError {
            path: dir.display().to_string(),
            detail: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(rel) = relative_key(dir, entry.path()) else {
            continue;
        };

        let theirs_bytes = match provider.read_file(&snapshot, &rel) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(path = %rel, "not on branch, skipping");
                continue;
            }
            Err(e) => {
                return Err(CompareError::ReadError {
                    path: rel,
                    branch: branch.to_string(),
                    detail: e.to_string(),
                })
            }
        };
        let ours_bytes = std::fs::read(entry.path()).map_err(|source| CompareError::Io {
            path: entry.path().to_path_buf(),
            source,
        })?;
        if ours_bytes == theirs_bytes {
            continue;
        }

        let rendered = alignment.render(
            &decode_text(&rel, &theirs_bytes),
            &decode_text(&rel, &ours_bytes),
        );
        result.insert(rel, rendered);
    }

    info!(differing = result.len(), "diffed directory against branch");
    Ok(result)
}

fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::markers::PositionalAlignment;
    use crate::test_support::MemoryProvider;

    fn provider() -> MemoryProvider {
        MemoryProvider::new()
            .branch("main", &[("a.txt", "x\ny\n"), ("gone.txt", "old\n"), ("same.txt", "s")])
            .branch("feature", &[("a.txt", "x\nz\n"), ("b.txt", "hello\n"), ("same.txt", "s")])
    }

    #[test]
    fn test_modified_file() {
        let out = diff_file(&provider(), "feature", "main", "a.txt", &PositionalAlignment).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out["a.txt"], "x\n<<<<<<< HEAD\nz\n=======\ny\n>>>>>>> branch\n");
    }

    #[test]
    fn test_added_file_has_no_markers() {
        let out = diff_file(&provider(), "feature", "main", "b.txt", &PositionalAlignment).unwrap();
        assert_eq!(out["b.txt"], "hello\n");
    }

    #[test]
    fn test_deleted_file_is_rejected() {
        let err = diff_file(&provider(), "feature", "main", "gone.txt", &PositionalAlignment)
            .unwrap_err();
        assert!(matches!(err, CompareError::FileDeletedOrUnchanged(p) if p == "gone.txt"));
    }

    #[test]
    fn test_unchanged_or_unknown_file_is_not_in_diff() {
        for path in ["same.txt", "nowhere.txt"] {
            let err =
                diff_file(&provider(), "feature", "main", path, &PositionalAlignment).unwrap_err();
            assert!(matches!(err, CompareError::FileNotInDiff(p) if p == path));
        }
    }

    #[test]
    fn test_unreadable_target_content() {
        let mut p = provider();
        p.unreadable.push("a.txt".into());
        let err = diff_file(&p, "feature", "main", "a.txt", &PositionalAlignment).unwrap_err();
        assert!(matches!(err, CompareError::ReadError { .. }));
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let p = MemoryProvider::new()
            .branch("main", &[])
            .branch("feature", &[("bin.dat", "ok")]);
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bin.dat"), [0x6f, 0xff, 0x6b]).unwrap();
        let out = diff_directory(&p, "feature", dir.path(), &PositionalAlignment).unwrap();
        assert!(out["bin.dat"].contains('\u{FFFD}'));
    }

    #[test]
    fn test_directory_diff() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join("a.txt"), "x\nlocal\n").unwrap();
        std::fs::write(dir.path().join("same.txt"), "s").unwrap();
        std::fs::write(dir.path().join("sub").join("only-local.txt"), "l").unwrap();
        std::fs::write(dir.path().join(".git").join("a.txt"), "ignored").unwrap();

        let out = diff_directory(&provider(), "feature", dir.path(), &PositionalAlignment).unwrap();
        assert_eq!(out.keys().collect::<Vec<_>>(), vec!["a.txt"]);
        assert_eq!(out["a.txt"], "x\n<<<<<<< HEAD\nlocal\n=======\nz\n>>>>>>> branch\n");
    }

    #[test]
    fn test_directory_diff_unknown_branch() {
        let dir = tempfile::tempdir().unwrap();
        let err = diff_directory(&provider(), "nope", dir.path(), &PositionalAlignment).unwrap_err();
        assert!(matches!(err, CompareError::BranchNotFound { side: BranchSide::Base, .. }));
    }
}
