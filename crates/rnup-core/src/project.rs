use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const REQUIRED_FILES: [&str; 2] = ["package.json", "app.json"];
const FRAMEWORK_PACKAGE: &str = "react-native";

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("{dir} does not look like a React Native project: {reason}\ndirectory contents:\n{listing}")]
    NotAProject {
        dir: PathBuf,
        reason: String,
        listing: String,
    },
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
}

#[derive(Debug, Deserialize, Default)]
struct PackageManifest {
    #[serde(default)]
    dependencies: BTreeMap<String, serde_json::Value>,
}

/// Check that `dir` has the files and dependency an upgrade needs.
pub fn check_project(dir: &Path) -> Result<(), ProjectError> {
    for file in REQUIRED_FILES {
        if !dir.join(file).is_file() {
            return Err(not_a_project(dir, format!("missing {file}")));
        }
    }

    let manifest_path = dir.join("package.json");
    let contents = fs::read_to_string(&manifest_path).map_err(|source| ProjectError::Read {
        path: manifest_path.clone(),
        source,
    })?;
    let manifest: PackageManifest = serde_json::from_str(&contents)
        .map_err(|err| not_a_project(dir, format!("package.json is not valid: {err}")))?;

    if !manifest.dependencies.contains_key(FRAMEWORK_PACKAGE) {
        return Err(not_a_project(
            dir,
            format!("package.json has no {FRAMEWORK_PACKAGE} dependency"),
        ));
    }

    Ok(())
}

fn not_a_project(dir: &Path, reason: String) -> ProjectError {
    ProjectError::NotAProject {
        dir: dir.to_path_buf(),
        reason,
        listing: list_dir(dir),
    }
}

fn list_dir(dir: &Path) -> String {
    let Ok(entries) = fs::read_dir(dir) else {
        return "(unreadable)".to_string();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    if names.is_empty() {
        return "(empty)".to_string();
    }
    names.sort();
    names.join("\n")
}
