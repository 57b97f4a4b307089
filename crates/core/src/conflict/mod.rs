//! Conflict-marker diffs.
//!
//! Two versions of a file are laid out as one text where differing lines
//! are wrapped in `<<<<<<< HEAD` / `=======` / `>>>>>>> branch` markers.
//! The target branch (or local file) is "ours" and the base branch is
//! "theirs".

pub mod file_diff;
pub mod markers;

pub use file_diff::{diff_directory, diff_file};
pub use markers::{
    alignment_by_name, generate_conflict_diff, ConflictBlock, LineAlignment, PositionalAlignment,
};
