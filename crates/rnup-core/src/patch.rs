//! Stages one patch file per file change in the scratch directory.
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::plan::FileChange;

const PATCH_EXTENSION: &str = ".patch";
const TEMP_PREFIX: &str = "temp_";

#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error("failed to create scratch directory {path}: {source}")]
    CreateDir { path: PathBuf, source: std::io::Error },
    #[error("failed to write patch file {path}: {source}")]
    WriteFile { path: PathBuf, source: std::io::Error },
}

/// The directory patch files are staged in for a single run.
#[derive(Debug, Clone)]
pub struct Scratch {
    dir: PathBuf,
}

impl Scratch {
    /// Create the directory if needed; an existing directory is reused.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, MaterializeError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| MaterializeError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// The `temp_` copy of a staged patch handed to the patch tool.
    pub fn temp_path(&self, patch: &PatchFile) -> PathBuf {
        let name = patch
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| patch_file_name(&patch.file));
        self.dir.join(format!("{TEMP_PREFIX}{name}"))
    }

    pub fn materialize(&self, change: &FileChange) -> Result<PatchFile, MaterializeError> {
        self.write_patch(change, patch_file_name(&change.file))
    }

    /// Stage every change. Paths that flatten to the same name (`a_b.txt` and
    /// `a/b.txt`) get a numeric suffix so no patch overwrites another.
    pub fn materialize_all<'a, I>(&self, changes: I) -> Result<Vec<PatchFile>, MaterializeError>
    where
        I: IntoIterator<Item = &'a FileChange>,
    {
        let mut taken = HashSet::new();
        let mut patches = Vec::new();
        for change in changes {
            let name = unique_patch_name(&change.file, &mut taken);
            patches.push(self.write_patch(change, name)?);
        }
        Ok(patches)
    }

    fn write_patch(&self, change: &FileChange, name: String) -> Result<PatchFile, MaterializeError> {
        let path = self.dir.join(name);
        fs::write(&path, render_patch(change)).map_err(|source| MaterializeError::WriteFile {
            path: path.clone(),
            source,
        })?;
        debug!(file = %change.file, patch = %path.display(), "staged patch file");
        Ok(PatchFile {
            path,
            file: change.file.clone(),
        })
    }

    /// Names of the files currently staged, sorted.
    pub fn staged(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn remove(self) -> std::io::Result<()> {
        match fs::remove_dir_all(&self.dir) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

/// A staged patch on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchFile {
    pub path: PathBuf,
    pub file: String,
}

/// Flatten a relative path into a single file name.
pub fn patch_file_name(file: &str) -> String {
    let flat: String = file
        .chars()
        .map(|ch| if ch == '/' || ch == '\\' { '_' } else { ch })
        .collect();
    format!("{flat}{PATCH_EXTENSION}")
}

fn unique_patch_name(file: &str, taken: &mut HashSet<String>) -> String {
    let name = patch_file_name(file);
    if taken.insert(name.clone()) {
        return name;
    }
    let stem = name.strip_suffix(PATCH_EXTENSION).unwrap_or(&name);
    let mut index = 2;
    loop {
        let candidate = format!("{stem}-{index}{PATCH_EXTENSION}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        index += 1;
    }
}

/// Render a change as a minimal unified diff with one synthetic hunk.
pub fn render_patch(change: &FileChange) -> String {
    let counts = change.counts();
    let mut patch = format!(
        "--- a/{}\n+++ b/{}\n@@ -{} +{} @@\n",
        change.source,
        change.file,
        hunk_range(counts.old_len()),
        hunk_range(counts.new_len()),
    );
    for line in &change.hunk_lines {
        patch.push_str(line);
        patch.push('\n');
    }
    patch
}

fn hunk_range(len: usize) -> String {
    let start = if len == 0 { 0 } else { 1 };
    format!("{start},{len}")
}

/// Read the `--- a/` and `+++ b/` paths from the top of a patch.
pub fn read_patch_header(text: &str) -> Option<(String, String)> {
    let mut lines = text.lines();
    let source = lines.next()?.strip_prefix("--- ")?;
    let target = lines.next()?.strip_prefix("+++ ")?;
    let source = source.strip_prefix("a/").unwrap_or(source).trim_end();
    let target = target.strip_prefix("b/").unwrap_or(target).trim_end();
    if source.is_empty() || target.is_empty() {
        return None;
    }
    Some((source.to_string(), target.to_string()))
}

/// Replace the header paths of `text`, keeping the body verbatim.
pub fn rewrite_patch_header(text: &str, source: &str, target: &str) -> String {
    let body: Vec<&str> = text.lines().skip(2).collect();
    let mut patch = format!("--- a/{source}\n+++ b/{target}\n");
    for line in body {
        patch.push_str(line);
        patch.push('\n');
    }
    patch
}
