//! Splits raw unified diff text into per-file sections.
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::warn;

const FILE_HEADER: &str = "diff --git ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
}

/// One file section of a unified diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub source_path: String,
    pub target_path: String,
    pub kind: ChangeKind,
    /// `+`, `-` and ` ` prefixed lines in diff order.
    pub hunk_lines: Vec<String>,
}

impl FileDiff {
    /// Start a section. A header whose paths cannot be read still opens one,
    /// with empty paths, so its hunks never leak into the previous file.
    fn from_header(line: &str) -> Self {
        let (source_path, target_path) = parse_file_header(line).unwrap_or_else(|| {
            warn!(header = line, "unreadable diff header");
            (String::new(), String::new())
        });
        let kind = if source_path == target_path {
            ChangeKind::Modified
        } else {
            ChangeKind::Renamed
        };
        Self {
            source_path,
            target_path,
            kind,
            hunk_lines: Vec::new(),
        }
    }

    /// `false` when the header's paths could not be read.
    pub fn has_paths(&self) -> bool {
        !self.source_path.is_empty() && !self.target_path.is_empty()
    }
}

/// Top-level paths (no separator) named by a diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootFileSet(BTreeSet<String>);

impl RootFileSet {
    pub fn contains(&self, path: &str) -> bool {
        self.0.contains(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnifiedDiff {
    pub files: Vec<FileDiff>,
    pub roots: RootFileSet,
}

impl UnifiedDiff {
    pub fn parse(text: &str) -> Self {
        let files = partition(text);
        let roots = root_files(&files);
        Self { files, roots }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Partition raw diff text into one `FileDiff` per `diff --git` header.
///
/// The `---`/`+++` lines that open a section belong to the header. Lines that
/// are neither header nor hunk content (`@@`, `index`, `\ No newline`) are
/// skipped.
pub fn partition(text: &str) -> Vec<FileDiff> {
    let mut files: Vec<FileDiff> = Vec::new();
    let mut in_header = false;

    for raw in text.lines() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);

        if line.starts_with(FILE_HEADER) {
            files.push(FileDiff::from_header(line));
            in_header = true;
            continue;
        }

        let Some(current) = files.last_mut() else {
            continue;
        };

        if in_header {
            if line.starts_with("new file mode") {
                current.kind = ChangeKind::Added;
                continue;
            }
            if line.starts_with("deleted file mode") {
                current.kind = ChangeKind::Deleted;
                continue;
            }
            if line.starts_with("--- ") || line.starts_with("+++ ") {
                continue;
            }
        }

        if line.starts_with("@@") {
            in_header = false;
            continue;
        }

        if line.starts_with('+') || line.starts_with('-') || line.starts_with(' ') {
            in_header = false;
            current.hunk_lines.push(line.to_string());
        }
    }

    files
}

pub fn root_files(files: &[FileDiff]) -> RootFileSet {
    RootFileSet(
        files
            .iter()
            .map(|file| file.target_path.as_str())
            .filter(|path| !path.is_empty() && !path.contains('/'))
            .map(str::to_string)
            .collect(),
    )
}

/// Extract the `a/` and `b/` paths from a `diff --git a/X b/Y` line.
///
/// Paths git quotes (`"a/two words.txt"`) are unquoted.
pub fn parse_file_header(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix(FILE_HEADER)?.trim_end();
    let (source, target) = if rest.starts_with('"') {
        split_quoted(rest)?
    } else {
        let (source, target) = rest.strip_prefix("a/")?.split_once(" b/")?;
        (source.to_string(), target.to_string())
    };
    if source.is_empty() || target.is_empty() {
        return None;
    }
    Some((source, target))
}

fn split_quoted(rest: &str) -> Option<(String, String)> {
    let (source, rest) = take_quoted(rest)?;
    let rest = rest.strip_prefix(' ')?;
    let target = if rest.starts_with('"') {
        let (target, tail) = take_quoted(rest)?;
        if !tail.is_empty() {
            return None;
        }
        target
    } else {
        rest.to_string()
    };
    Some((
        source.strip_prefix("a/")?.to_string(),
        target.strip_prefix("b/")?.to_string(),
    ))
}

/// Read one C-style quoted string, returning it and the text after it.
fn take_quoted(text: &str) -> Option<(String, &str)> {
    let body = text.strip_prefix('"')?;
    let mut value = String::new();
    let mut chars = body.char_indices();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '"' => return Some((value, &body[idx + 1..])),
            '\\' => {
                let (_, escaped) = chars.next()?;
                value.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
            }
            other => value.push(other),
        }
    }
    None
}
