use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("no editor could be started (tried: {tried})")]
    NoneAvailable { tried: String },
    #[error("editor `{editor}` exited with {status}")]
    Failed { editor: String, status: String },
    #[error("editor `{editor}` io error: {source}")]
    Io { editor: String, source: std::io::Error },
}

/// Launches the first editor command that starts and waits for it to exit.
#[derive(Debug, Clone)]
pub struct EditorLauncher {
    candidates: Vec<String>,
}

impl EditorLauncher {
    pub fn new(candidates: Vec<String>) -> Self {
        Self { candidates }
    }

    /// Returns the command that ran.
    pub fn edit(&self, path: &Path) -> Result<String, EditorError> {
        for candidate in &self.candidates {
            let mut parts = candidate.split_whitespace();
            let Some(program) = parts.next() else {
                continue;
            };
            let status = Command::new(program).args(parts).arg(path).status();
            match status {
                Ok(status) if status.success() => {
                    info!(editor = %candidate, file = %path.display(), "manual edit finished");
                    return Ok(candidate.clone());
                }
                Ok(status) => {
                    return Err(EditorError::Failed {
                        editor: candidate.clone(),
                        status: status.to_string(),
                    });
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    debug!(editor = %candidate, "editor not found");
                }
                Err(source) => {
                    return Err(EditorError::Io {
                        editor: candidate.clone(),
                        source,
                    });
                }
            }
        }

        Err(EditorError::NoneAvailable {
            tried: self.candidates.join(", "),
        })
    }
}
