use serde::Serialize;

use crate::diff::{ChangeKind, FileDiff, RootFileSet, UnifiedDiff};
use crate::rewrite::Placeholders;

/// Ordered steps derived 1:1 from the diff's file sections.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpgradePlan {
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub description: String,
    pub file_changes: Vec<FileChange>,
}

/// A rewritten file section with paths relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub file: String,
    pub source: String,
    pub kind: ChangeKind,
    pub hunk_lines: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HunkCounts {
    pub context: usize,
    pub removed: usize,
    pub added: usize,
}

impl HunkCounts {
    pub fn old_len(&self) -> usize {
        self.context + self.removed
    }

    pub fn new_len(&self) -> usize {
        self.context + self.added
    }
}

impl UpgradePlan {
    pub fn build(diff: &UnifiedDiff, placeholders: &Placeholders) -> Self {
        let steps = diff
            .files
            .iter()
            .map(|file| {
                let change = FileChange::from_diff(file, &diff.roots, placeholders);
                Step {
                    description: change.describe(),
                    file_changes: vec![change],
                }
            })
            .collect();
        Self { steps }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn changes(&self) -> impl Iterator<Item = &FileChange> {
        self.steps.iter().flat_map(|step| step.file_changes.iter())
    }

    pub fn change_count(&self) -> usize {
        self.changes().count()
    }

    pub fn outline(&self) -> Vec<String> {
        outline(self.changes())
    }
}

/// One numbered line per change with its added and removed line counts.
pub fn outline<'a, I>(changes: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a FileChange>,
{
    changes
        .into_iter()
        .enumerate()
        .map(|(idx, change)| {
            let counts = change.counts();
            format!(
                "{:>3}. {} (+{} -{})",
                idx + 1,
                change.describe(),
                counts.added,
                counts.removed
            )
        })
        .collect()
}

impl FileChange {
    pub fn from_diff(file: &FileDiff, roots: &RootFileSet, placeholders: &Placeholders) -> Self {
        let target = resolve_target_path(&file.target_path, roots, placeholders);
        let source = resolve_target_path(&file.source_path, roots, placeholders);
        Self {
            file: target,
            source,
            kind: file.kind,
            hunk_lines: placeholders.rewrite_all(&file.hunk_lines),
        }
    }

    pub fn describe(&self) -> String {
        if self.file.is_empty() {
            return "Unreadable diff header".to_string();
        }
        match self.kind {
            ChangeKind::Added => format!("Add {}", self.file),
            ChangeKind::Modified => format!("Update {}", self.file),
            ChangeKind::Deleted => format!("Remove {}", self.file),
            ChangeKind::Renamed => format!("Rename {} to {}", self.source, self.file),
        }
    }

    pub fn content(&self) -> String {
        self.hunk_lines.join("\n")
    }

    pub fn counts(&self) -> HunkCounts {
        let mut counts = HunkCounts::default();
        for line in &self.hunk_lines {
            match line.as_bytes().first() {
                Some(b'+') => counts.added += 1,
                Some(b'-') => counts.removed += 1,
                _ => counts.context += 1,
            }
        }
        counts
    }

    /// Added lines with their prefix stripped, each newline-terminated.
    pub fn additions(&self) -> String {
        let mut content = String::new();
        for line in &self.hunk_lines {
            if let Some(added) = line.strip_prefix('+') {
                content.push_str(added);
                content.push('\n');
            }
        }
        content
    }

    /// Apply the hunk lines to `original` in memory.
    ///
    /// Context and removed lines are matched in order, scanning forward from
    /// the previous match. Returns `None` when a line cannot be found.
    pub fn apply_to(&self, original: &str) -> Option<String> {
        let lines: Vec<&str> = original.lines().collect();
        let mut output: Vec<&str> = Vec::with_capacity(lines.len());
        let mut cursor = 0;

        for line in &self.hunk_lines {
            if let Some(added) = line.strip_prefix('+') {
                output.push(added);
                continue;
            }
            let (keep, body) = match (line.strip_prefix(' '), line.strip_prefix('-')) {
                (Some(body), _) => (true, body),
                (None, Some(body)) => (false, body),
                (None, None) => return None,
            };
            let offset = lines[cursor..].iter().position(|candidate| *candidate == body)?;
            output.extend_from_slice(&lines[cursor..cursor + offset]);
            if keep {
                output.push(body);
            }
            cursor += offset + 1;
        }
        output.extend_from_slice(&lines[cursor..]);

        let mut content = output.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        Some(content)
    }
}

/// Map a diff path onto the working tree.
///
/// Upstream diffs nest files under the app's directory; that leading segment is
/// dropped unless the path is already a root-level entry.
pub fn resolve_target_path(path: &str, roots: &RootFileSet, placeholders: &Placeholders) -> String {
    let rewritten = placeholders.rewrite(path);
    if roots.contains(path) || roots.contains(&rewritten) {
        return rewritten;
    }
    let prefix = format!("{}/", placeholders.app_name());
    match rewritten.strip_prefix(&prefix) {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => rewritten,
    }
}

/// Reject paths that would resolve outside the project directory.
///
/// `/` and `\\` both count as separators.
pub fn check_contained(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("diff header has no usable path".to_string());
    }
    if path.starts_with('/') || path.starts_with('\\') || has_drive_prefix(path) {
        return Err(format!("{path} is an absolute path"));
    }
    if path.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(format!("{path} points outside the project"));
    }
    Ok(())
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
