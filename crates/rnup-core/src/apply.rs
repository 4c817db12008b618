//! Per-file patch application.
//!
//! Each entry moves through `Pending -> Confirmed -> Resolved`, detouring
//! through `Failed` when every strategy in the policy fails. The user is asked
//! at `Pending` (apply or skip) and at `Failed` (skip, edit or abort).
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::{debug, info, warn};

use crate::config::ResolvedConfig;
use crate::editor::EditorLauncher;
use crate::patch::{read_patch_header, rewrite_patch_header, PatchFile, Scratch};
use crate::plan::{check_contained, FileChange};
use crate::preview::{preview_change, Preview};
use crate::prompt::{PromptError, Prompter};

pub const CHOICE_SKIP: &str = "Skip this change";
pub const CHOICE_MANUAL_EDIT: &str = "Try manual edit";
pub const CHOICE_ABORT: &str = "Abort upgrade";

const FAILURE_CHOICES: [&str; 3] = [CHOICE_SKIP, CHOICE_MANUAL_EDIT, CHOICE_ABORT];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// All hunks apply cleanly or nothing is written.
    Plain,
    /// Apply what fits; rejected hunks go to `<file>.rej`.
    Rejects,
    /// Overwrite the file with the patch's added lines. Lossy.
    Additions,
}

impl Strategy {
    pub fn default_chain() -> Vec<Strategy> {
        vec![Strategy::Plain, Strategy::Rejects, Strategy::Additions]
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "plain" => Some(Strategy::Plain),
            "rejects" | "reject" | "with_rejects" => Some(Strategy::Rejects),
            "additions" | "reconstruct" => Some(Strategy::Additions),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Strategy::Plain => "patch",
            Strategy::Rejects => "patch with reject files",
            Strategy::Additions => "reconstruct from added lines",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    Applied,
    AppliedWithRejects,
    ReconstructedFromAdditions,
    Skipped,
    ManuallyEdited,
    Aborted,
}

impl ApplyOutcome {
    pub fn label(self) -> &'static str {
        match self {
            ApplyOutcome::Applied => "applied",
            ApplyOutcome::AppliedWithRejects => "applied with rejects",
            ApplyOutcome::ReconstructedFromAdditions => "reconstructed from additions",
            ApplyOutcome::Skipped => "skipped",
            ApplyOutcome::ManuallyEdited => "manually edited",
            ApplyOutcome::Aborted => "aborted",
        }
    }
}

/// Why one step of the fallback chain did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyFailure {
    /// `None` when the failure happened before any strategy ran.
    pub strategy: Option<Strategy>,
    pub reason: String,
}

impl StrategyFailure {
    fn setup(reason: impl Into<String>) -> Self {
        Self {
            strategy: None,
            reason: reason.into(),
        }
    }
}

#[derive(Debug)]
enum EntryState {
    Pending,
    Confirmed,
    Failed(Vec<StrategyFailure>),
    Resolved(ApplyOutcome),
}

#[derive(Debug, Clone)]
pub struct ApplySettings {
    pub patch_program: String,
    pub strategies: Vec<Strategy>,
    pub editors: Vec<String>,
}

impl ApplySettings {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            patch_program: config.patch_program.clone(),
            strategies: config.strategies.clone(),
            editors: config.editor_candidates(),
        }
    }
}

pub struct Applicator<'a> {
    project_dir: &'a Path,
    scratch: &'a Scratch,
    prompter: &'a dyn Prompter,
    patch_program: String,
    strategies: Vec<Strategy>,
    editor: EditorLauncher,
}

impl<'a> Applicator<'a> {
    pub fn new(
        project_dir: &'a Path,
        scratch: &'a Scratch,
        prompter: &'a dyn Prompter,
        settings: ApplySettings,
    ) -> Self {
        Self {
            project_dir,
            scratch,
            prompter,
            patch_program: settings.patch_program,
            strategies: settings.strategies,
            editor: EditorLauncher::new(settings.editors),
        }
    }

    /// Run one entry to a final outcome. The staged patch is removed either way.
    pub fn process(&self, change: &FileChange, patch: &PatchFile) -> Result<ApplyOutcome, PromptError> {
        let result = self.drive(change, patch);
        self.cleanup(patch);
        result
    }

    fn drive(&self, change: &FileChange, patch: &PatchFile) -> Result<ApplyOutcome, PromptError> {
        let target = self.project_dir.join(&change.file);
        let contained = check_contained(&change.file);
        let mut state = match &contained {
            Ok(()) => EntryState::Pending,
            Err(reason) => {
                warn!(file = %change.file, %reason, "refusing entry with an unusable path");
                EntryState::Failed(vec![StrategyFailure::setup(reason.clone())])
            }
        };

        loop {
            state = match state {
                EntryState::Pending => {
                    self.show_preview(change, &target);
                    let message = format!("Do you want to apply changes to {}?", change.file);
                    if self.prompter.confirm(&message, true)? {
                        EntryState::Confirmed
                    } else {
                        EntryState::Resolved(ApplyOutcome::Skipped)
                    }
                }
                EntryState::Confirmed => match self.run_strategies(change, patch, &target) {
                    Ok(outcome) => EntryState::Resolved(outcome),
                    Err(failures) => EntryState::Failed(failures),
                },
                EntryState::Failed(failures) => {
                    self.report_failures(change, &failures);
                    let choice = self
                        .prompter
                        .select("How would you like to proceed?", &FAILURE_CHOICES, 0)?;
                    match choice {
                        0 => EntryState::Resolved(ApplyOutcome::Skipped),
                        1 if contained.is_err() => EntryState::Failed(vec![StrategyFailure::setup(
                            "manual edit is only offered for files inside the project",
                        )]),
                        1 => match self.editor.edit(&target) {
                            Ok(_) => EntryState::Resolved(ApplyOutcome::ManuallyEdited),
                            Err(err) => {
                                warn!(file = %change.file, error = %err, "manual edit failed");
                                EntryState::Failed(vec![StrategyFailure::setup(err.to_string())])
                            }
                        },
                        _ => EntryState::Resolved(ApplyOutcome::Aborted),
                    }
                }
                EntryState::Resolved(outcome) => {
                    info!(file = %change.file, outcome = outcome.label(), "entry resolved");
                    if outcome == ApplyOutcome::Skipped {
                        self.prompter
                            .inform(&format!("Skipped changes to {}", change.file));
                    }
                    return Ok(outcome);
                }
            };
        }
    }

    fn show_preview(&self, change: &FileChange, target: &Path) {
        let preview = match fs::read(target) {
            Ok(bytes) => preview_change(change, Some(&bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => preview_change(change, None),
            Err(err) => Preview::Unavailable {
                path: change.file.clone(),
                reason: err.to_string(),
            },
        };
        self.prompter.inform(&format!("\n{preview}"));
    }

    fn run_strategies(
        &self,
        change: &FileChange,
        patch: &PatchFile,
        target: &Path,
    ) -> Result<ApplyOutcome, Vec<StrategyFailure>> {
        if change.hunk_lines.is_empty() {
            return Err(vec![StrategyFailure::setup(
                "diff has no text hunks for this file",
            )]);
        }
        ensure_target(target).map_err(|err| {
            vec![StrategyFailure::setup(format!(
                "cannot prepare {}: {err}",
                target.display()
            ))]
        })?;
        let staged = self
            .stage(patch)
            .map_err(|reason| vec![StrategyFailure::setup(reason)])?;

        let mut failures = Vec::new();
        for strategy in &self.strategies {
            debug!(file = %change.file, strategy = ?strategy, "trying strategy");
            match self.attempt(*strategy, change, &staged, target) {
                Ok(outcome) => return Ok(outcome),
                Err(reason) => {
                    warn!(file = %change.file, strategy = ?strategy, %reason, "strategy failed");
                    failures.push(StrategyFailure {
                        strategy: Some(*strategy),
                        reason,
                    });
                }
            }
        }
        Err(failures)
    }

    /// Write the normalized copy of the patch the patch tool consumes.
    fn stage(&self, patch: &PatchFile) -> Result<PathBuf, String> {
        let text = fs::read_to_string(&patch.path)
            .map_err(|err| format!("cannot read {}: {err}", patch.path.display()))?;
        let (source, target) = read_patch_header(&text)
            .ok_or_else(|| format!("{} has no unified diff header", patch.path.display()))?;
        let staged = self.scratch.temp_path(patch);
        let source = source.trim_start_matches("./");
        let target = target.trim_start_matches("./");
        fs::write(&staged, rewrite_patch_header(&text, source, target))
            .map_err(|err| format!("cannot write {}: {err}", staged.display()))?;
        Ok(staged)
    }

    fn attempt(
        &self,
        strategy: Strategy,
        change: &FileChange,
        staged: &Path,
        target: &Path,
    ) -> Result<ApplyOutcome, String> {
        match strategy {
            Strategy::Plain => {
                let check = self.run_patch(staged, target, &["--dry-run"])?;
                if !check.status.success() {
                    return Err(patch_failure("dry run", &check));
                }
                let output = self.run_patch(staged, target, &[])?;
                if !output.status.success() {
                    return Err(patch_failure("apply", &output));
                }
                self.prompter
                    .inform(&format!("Patch applied successfully to {}.", change.file));
                Ok(ApplyOutcome::Applied)
            }
            Strategy::Rejects => {
                let rejects = reject_path(target);
                match fs::remove_file(&rejects) {
                    Err(err) if err.kind() != ErrorKind::NotFound => {
                        return Err(format!("cannot clear {}: {err}", rejects.display()));
                    }
                    _ => {}
                }
                let rejects_arg = rejects.to_string_lossy().into_owned();
                let output = self.run_patch(staged, target, &["--reject-file", &rejects_arg])?;
                let partial = output.status.code() == Some(1) && rejects.exists();
                if !output.status.success() && !partial {
                    return Err(patch_failure("apply with rejects", &output));
                }
                self.prompter.inform(&format!(
                    "Patch applied to {} with reject files enabled. Check {} for hunks that need manual follow-up.",
                    change.file,
                    rejects.display()
                ));
                Ok(ApplyOutcome::AppliedWithRejects)
            }
            Strategy::Additions => {
                fs::write(target, change.additions())
                    .map_err(|err| format!("cannot write {}: {err}", target.display()))?;
                self.prompter.inform(&format!(
                    "Rebuilt {} from added lines only (lossy: removed and context lines were dropped). Review it carefully.",
                    change.file
                ));
                Ok(ApplyOutcome::ReconstructedFromAdditions)
            }
        }
    }

    fn run_patch(&self, staged: &Path, target: &Path, extra: &[&str]) -> Result<Output, String> {
        Command::new(&self.patch_program)
            .current_dir(self.project_dir)
            .args(["--batch", "--forward", "--silent"])
            .args(extra)
            .arg("--input")
            .arg(staged)
            .arg(target)
            .output()
            .map_err(|err| format!("failed to start `{}`: {err}", self.patch_program))
    }

    fn report_failures(&self, change: &FileChange, failures: &[StrategyFailure]) {
        let mut message = format!("Error applying change to {}:", change.file);
        for failure in failures {
            let label = failure.strategy.map_or("setup", Strategy::label);
            message.push_str(&format!("\n  - {label}: {}", failure.reason));
        }
        self.prompter.inform(&message);
    }

    fn cleanup(&self, patch: &PatchFile) {
        for path in [patch.path.clone(), self.scratch.temp_path(patch)] {
            match fs::remove_file(&path) {
                Err(err) if err.kind() != ErrorKind::NotFound => {
                    warn!(path = %path.display(), error = %err, "failed to remove staged patch");
                }
                _ => {}
            }
        }
    }
}

/// Create the target (and its parents) as an empty file when it does not exist.
fn ensure_target(target: &Path) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    if !target.exists() {
        fs::write(target, "")?;
        debug!(file = %target.display(), "created empty base file");
    }
    Ok(())
}

fn reject_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".rej");
    PathBuf::from(name)
}

fn patch_failure(stage: &str, output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let detail = [stderr.trim(), stdout.trim()]
        .into_iter()
        .find(|text| !text.is_empty())
        .unwrap_or("no output");
    format!("{stage} exited with {}: {detail}", output.status)
}
