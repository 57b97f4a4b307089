//! Conflict-marker rendering of two versions of a file.
//!
//! The shipped strategy, [`PositionalAlignment`], pairs lines by index only.
//! It does not look for a common subsequence, so a single inserted or deleted
//! line shifts every later line and each shifted index becomes its own
//! conflict block. Adjacent differing lines are never merged into one block.
//! Other strategies plug in through [`LineAlignment`].

use tracing::warn;

/// Opens the "ours" (target branch) half of a conflict block.
pub const OURS_MARKER: &str = "<<<<<<< HEAD";
/// Separates "ours" from "theirs".
pub const SEPARATOR_MARKER: &str = "=======";
/// Closes the "theirs" (base branch) half of a conflict block.
pub const THEIRS_MARKER: &str = ">>>>>>> branch";

/// A strategy for laying two file versions side by side as one text with
/// conflict markers.
pub trait LineAlignment: Send + Sync {
    /// Stable identifier, as used in configuration.
    fn name(&self) -> &'static str;

    /// Render `theirs` (base branch) against `ours` (target branch).
    fn render(&self, theirs: &str, ours: &str) -> String;
}

/// Index-by-index line pairing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalAlignment;

impl LineAlignment for PositionalAlignment {
    fn name(&self) -> &'static str {
        "positional"
    }

    fn render(&self, theirs: &str, ours: &str) -> String {
        let theirs_lines = split_lines(theirs);
        let ours_lines = split_lines(ours);
        let len = theirs_lines.len().max(ours_lines.len());

        let mut segments = Vec::with_capacity(len);
        for i in 0..len {
            match (theirs_lines.get(i), ours_lines.get(i)) {
                (None, Some(ours_line)) => segments.push((*ours_line).to_string()),
                (Some(theirs_line), None) => segments.push((*theirs_line).to_string()),
                (Some(theirs_line), Some(ours_line)) if theirs_line == ours_line => {
                    segments.push((*ours_line).to_string())
                }
                (Some(theirs_line), Some(ours_line)) => segments.push(format!(
                    "{}\n{}\n{}\n{}\n{}",
                    OURS_MARKER, ours_line, SEPARATOR_MARKER, theirs_line, THEIRS_MARKER
                )),
                (None, None) => {}
            }
        }
        segments.join("\n")
    }
}

/// Split on `\n`, keeping the empty element after a trailing newline.
/// Empty content has no lines at all.
fn split_lines(content: &str) -> Vec<&str> {
    if content.is_empty() {
        Vec::new()
    } else {
        content.split('\n').collect()
    }
}

/// Render with the positional strategy.
pub fn generate_conflict_diff(theirs: &str, ours: &str) -> String {
    PositionalAlignment.render(theirs, ours)
}

/// Look up a shipped strategy by its configured name.
pub fn alignment_by_name(name: &str) -> Option<Box<dyn LineAlignment>> {
    match name {
        "positional" => Some(Box::new(PositionalAlignment)),
        _ => None,
    }
}

/// Decode file content as text, replacing invalid UTF-8.
pub(crate) fn decode_text(path: &str, bytes: &[u8]) -> String {
    match String::from_utf8_lossy(bytes) {
        std::borrow::Cow::Borrowed(text) => text.to_string(),
        std::borrow::Cow::Owned(text) => {
            warn!(path, "content is not valid UTF-8, decoding lossily");
            text
        }
    }
}

/// A marker-delimited region inside rendered conflict text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictBlock {
    /// Line number (1-indexed) of the opening marker.
    pub start_line: usize,
    /// Line number (1-indexed) of the closing marker.
    pub end_line: usize,
}

impl ConflictBlock {
    /// Find every complete conflict block in `text`.
    pub fn scan(text: &str) -> Vec<ConflictBlock> {
        let mut blocks = Vec::new();
        let mut open: Option<usize> = None;
        let mut separated = false;
        for (idx, line) in text.split('\n').enumerate() {
            let line_no = idx + 1;
            match line {
                OURS_MARKER => {
                    open = Some(line_no);
                    separated = false;
                }
                SEPARATOR_MARKER if open.is_some() => separated = true,
                THEIRS_MARKER => {
                    if let (Some(start_line), true) = (open, separated) {
                        blocks.push(ConflictBlock {
                            start_line,
                            end_line: line_no,
                        });
                    }
                    open = None;
                    separated = false;
                }
                _ => {}
            }
        }
        blocks
    }
}
