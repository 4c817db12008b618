use similar::{ChangeTag, TextDiff};
use std::fmt;

use crate::plan::FileChange;

const BINARY_SNIFF_BYTES: usize = 1024;
const CONTEXT_LINES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    New { path: String, content: String },
    Deleted { path: String },
    Binary { path: String },
    Modified { path: String, diff: String },
    Unchanged { path: String },
    Unavailable { path: String, reason: String },
}

impl Preview {
    /// Build a preview from the current bytes (`None` if the file is absent)
    /// and the proposed content.
    pub fn build(path: &str, original: Option<&[u8]>, proposed: &[u8]) -> Self {
        let path = path.to_string();
        if original.is_some_and(is_binary) || is_binary(proposed) {
            return Preview::Binary { path };
        }
        let proposed = String::from_utf8_lossy(proposed);
        let Some(original) = original else {
            return Preview::New {
                path,
                content: proposed.into_owned(),
            };
        };
        if proposed.trim().is_empty() {
            return Preview::Deleted { path };
        }
        let original = String::from_utf8_lossy(original);
        if original == proposed {
            return Preview::Unchanged { path };
        }
        Preview::Modified {
            diff: unified_diff(&original, &proposed),
            path,
        }
    }
}

/// Preview what applying `change` would do to the file's current bytes.
pub fn preview_change(change: &FileChange, original: Option<&[u8]>) -> Preview {
    let Some(bytes) = original else {
        return Preview::build(&change.file, None, change.additions().as_bytes());
    };
    if is_binary(bytes) {
        return Preview::Binary {
            path: change.file.clone(),
        };
    }
    match change.apply_to(&String::from_utf8_lossy(bytes)) {
        Some(proposed) => Preview::build(&change.file, Some(bytes), proposed.as_bytes()),
        None => Preview::Unavailable {
            path: change.file.clone(),
            reason: "hunks do not match the current file".to_string(),
        },
    }
}

impl fmt::Display for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preview::New { path, content } => write!(f, "New file: {path}\n\n{content}"),
            Preview::Deleted { path } => write!(f, "File will be removed: {path}"),
            Preview::Binary { path } => {
                write!(f, "Binary file: {path}\nContent cannot be displayed.")
            }
            Preview::Modified { path, diff } => write!(f, "Changes to {path}:\n{diff}"),
            Preview::Unchanged { path } => write!(f, "No content changes for {path}"),
            Preview::Unavailable { path, reason } => {
                write!(f, "Preview unavailable for {path}: {reason}")
            }
        }
    }
}

/// A NUL byte within the first 1024 bytes marks content as binary.
pub fn is_binary(content: &[u8]) -> bool {
    content
        .iter()
        .take(BINARY_SNIFF_BYTES)
        .any(|byte| *byte == 0)
}

fn unified_diff(old: &str, new: &str) -> String {
    let diff = TextDiff::configure()
        .algorithm(similar::Algorithm::Myers)
        .diff_lines(old, new);

    let mut out = String::new();
    for (idx, group) in diff.grouped_ops(CONTEXT_LINES).iter().enumerate() {
        if idx > 0 {
            out.push_str("...\n");
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let sign = match change.tag() {
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                    ChangeTag::Equal => ' ',
                };
                out.push(sign);
                out.push_str(change.value());
                if change.missing_newline() {
                    out.push('\n');
                }
            }
        }
    }
    out
}
