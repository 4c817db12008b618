use std::path::Path;
use std::process::Command;

use tracing::{info, warn};

const ALIGN_DEPS_PACKAGE: &str = "@rnx-kit/align-deps@latest";
const UNSUPPORTED_MARKER: &str = "No profiles could satisfy requirements";

#[derive(Debug, thiserror::Error)]
pub enum AlignError {
    #[error("target version {version} has no major.minor component")]
    InvalidVersion { version: String },
    #[error("align-deps does not support react-native {requirement}")]
    Unsupported { requirement: String },
    #[error("align-deps failed: {cmd}: {stderr}")]
    CommandFailed { cmd: String, stderr: String },
    #[error("align-deps io error: {cmd}: {source}")]
    CommandIo { cmd: String, source: std::io::Error },
}

/// `react-native@<major>.<minor>` for a full version string.
pub fn requirement(target_version: &str) -> Result<String, AlignError> {
    let mut parts = target_version.split('.');
    match (parts.next(), parts.next()) {
        (Some(major), Some(minor)) if !major.is_empty() && !minor.is_empty() => {
            let minor = minor.split('-').next().unwrap_or(minor);
            Ok(format!("react-native@{major}.{minor}"))
        }
        _ => Err(AlignError::InvalidVersion {
            version: target_version.to_string(),
        }),
    }
}

/// Align the project's dependencies with the target framework version.
pub fn align_deps(project_dir: &Path, target_version: &str) -> Result<String, AlignError> {
    let requirement = requirement(target_version)?;
    let args = [
        ALIGN_DEPS_PACKAGE,
        "--requirements",
        requirement.as_str(),
        "--write",
    ];
    let cmd_string = format!("npx {}", args.join(" "));
    info!(cmd = %cmd_string, "running align-deps");

    let output = Command::new("npx")
        .current_dir(project_dir)
        .args(args)
        .output()
        .map_err(|source| AlignError::CommandIo {
            cmd: cmd_string.clone(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if output.status.success() {
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    warn!(cmd = %cmd_string, %stderr, "align-deps failed");
    if stderr.contains(UNSUPPORTED_MARKER) || stdout.contains(UNSUPPORTED_MARKER) {
        return Err(AlignError::Unsupported { requirement });
    }
    Err(AlignError::CommandFailed {
        cmd: cmd_string,
        stderr,
    })
}
