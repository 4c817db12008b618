//! Runs an upgrade end to end.
//!
//! Run-level failures land in a single retry/abort decision. Work that already
//! finished (project check, branch, fetched plan, resolved entries) is kept in
//! [`RunState`] so a retry resumes where the previous attempt stopped.
use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, info_span, warn, Instrument};
use ulid::Ulid;

use crate::align::{align_deps, AlignError};
use crate::apply::{Applicator, ApplyOutcome, ApplySettings};
use crate::config::ResolvedConfig;
use crate::diff::UnifiedDiff;
use crate::fetch::{DiffFetcher, DiffSource, FetchError};
use crate::git::{checkout_upgrade_branch, upgrade_branch_name, BranchState, GitError};
use crate::hash::diff_hash;
use crate::patch::{MaterializeError, Scratch};
use crate::plan::UpgradePlan;
use crate::project::{check_project, ProjectError};
use crate::prompt::{PromptError, Prompter};
use crate::rewrite::Placeholders;
use crate::types::{EntryReport, PlanReport, RunSummary};

pub const CHOICE_RETRY: &str = "Retry upgrade";
pub const CHOICE_ABORT: &str = "Abort upgrade";

const RUN_CHOICES: [&str; 2] = [CHOICE_RETRY, CHOICE_ABORT];
const PROCEED_MESSAGE: &str = "Do you want to proceed with applying the upgrade changes?";

#[derive(Debug, thiserror::Error)]
pub enum UpgradeError {
    #[error("invalid {field} {value:?}: {reason}")]
    InvalidInput {
        field: &'static str,
        value: String,
        reason: &'static str,
    },
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Git(#[from] GitError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Materialize(#[from] MaterializeError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error("upgrade aborted while applying {file}")]
    FileAborted { file: String },
    #[error("upgrade aborted: {reason}")]
    Aborted { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRequest {
    pub app_name: String,
    pub app_package: String,
    pub from: String,
    pub to: String,
}

impl UpgradeRequest {
    pub fn validate(&self) -> Result<(), UpgradeError> {
        if self.app_name.is_empty() {
            return Err(invalid("app name", &self.app_name, "must not be empty"));
        }
        if self
            .app_name
            .chars()
            .any(|ch| ch == '/' || ch == '\\' || ch.is_whitespace())
        {
            return Err(invalid(
                "app name",
                &self.app_name,
                "must not contain path separators or whitespace",
            ));
        }
        if !is_package_identifier(&self.app_package) {
            return Err(invalid(
                "app package",
                &self.app_package,
                "expected a dotted identifier such as com.example.app",
            ));
        }
        for (field, value) in [("current version", &self.from), ("target version", &self.to)] {
            if !is_version(value) {
                return Err(invalid(field, value, "expected a version such as 0.72.4"));
            }
        }
        Ok(())
    }

    pub fn placeholders(&self) -> Placeholders {
        Placeholders::new(self.app_name.clone(), self.app_package.clone())
    }
}

fn invalid(field: &'static str, value: &str, reason: &'static str) -> UpgradeError {
    UpgradeError::InvalidInput {
        field,
        value: value.to_string(),
        reason,
    }
}

fn is_package_identifier(value: &str) -> bool {
    !value.is_empty()
        && value.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(first) if first.is_ascii_alphabetic() || first == '_')
                && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        })
}

fn is_version(value: &str) -> bool {
    let (core, suffix) = match value.split_once('-') {
        Some((core, suffix)) => (core, Some(suffix)),
        None => (value, None),
    };
    let parts: Vec<&str> = core.split('.').collect();
    parts.len() >= 2
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.chars().all(|ch| ch.is_ascii_digit()))
        && suffix.map_or(true, |suffix| !suffix.is_empty())
}

/// Web upgrade-helper page for the same version pair.
pub fn helper_url(base: &str, request: &UpgradeRequest) -> Result<String, UpgradeError> {
    let base = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{base}/")
    };
    let mut url = reqwest::Url::parse(&base).map_err(|_| UpgradeError::InvalidInput {
        field: "helper url",
        value: base.clone(),
        reason: "not an absolute url",
    })?;
    url.query_pairs_mut()
        .append_pair("from", &request.from)
        .append_pair("to", &request.to)
        .append_pair("name", &request.app_name)
        .append_pair("package", &request.app_package);
    Ok(url.to_string())
}

/// A plan built from a fetched diff.
#[derive(Debug, Clone)]
pub struct FetchedPlan {
    pub plan: UpgradePlan,
    pub diff_hash: String,
}

pub async fn fetch_plan(
    config: &ResolvedConfig,
    request: &UpgradeRequest,
    source: &DiffSource,
) -> Result<FetchedPlan, UpgradeError> {
    let fetcher = DiffFetcher::new(Duration::from_secs(config.http_timeout_secs));
    let text = fetcher.fetch(source, &request.from, &request.to).await?;
    let diff_hash = diff_hash(&text);
    let diff = UnifiedDiff::parse(&text);
    let plan = UpgradePlan::build(&diff, &request.placeholders());
    let unreadable = diff.files.iter().filter(|file| !file.has_paths()).count();
    if unreadable > 0 {
        warn!(unreadable, "diff has file headers without usable paths");
    }
    info!(
        diff_hash = %diff_hash,
        files = plan.change_count(),
        roots = diff.roots.len(),
        "built upgrade plan"
    );
    Ok(FetchedPlan { plan, diff_hash })
}

pub async fn plan_report(
    config: &ResolvedConfig,
    request: &UpgradeRequest,
    source: &DiffSource,
) -> Result<PlanReport, UpgradeError> {
    request.validate()?;
    let fetched = fetch_plan(config, request, source).await?;
    Ok(PlanReport {
        from: request.from.clone(),
        to: request.to.clone(),
        source: source.describe(&request.from, &request.to),
        diff_hash: fetched.diff_hash,
        change_count: fetched.plan.change_count(),
        steps: fetched.plan.steps,
    })
}

#[derive(Debug, Default)]
struct RunState {
    checked: bool,
    branch: Option<String>,
    aligned: bool,
    fetched: Option<FetchedPlan>,
    /// The user has seen the plan and agreed to apply it.
    confirmed: bool,
    cancelled: bool,
    /// One slot per plan entry; `None` until the entry resolves.
    outcomes: Vec<Option<ApplyOutcome>>,
}

pub struct Upgrade<'a> {
    config: ResolvedConfig,
    request: UpgradeRequest,
    project_dir: PathBuf,
    source: DiffSource,
    prompter: &'a dyn Prompter,
    run_id: String,
    state: RunState,
}

impl<'a> Upgrade<'a> {
    pub fn new(
        config: ResolvedConfig,
        request: UpgradeRequest,
        project_dir: impl Into<PathBuf>,
        source: DiffSource,
        prompter: &'a dyn Prompter,
    ) -> Self {
        Self {
            config,
            request,
            project_dir: project_dir.into(),
            source,
            prompter,
            run_id: Ulid::new().to_string(),
            state: RunState::default(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub async fn run(mut self) -> Result<RunSummary, UpgradeError> {
        self.request.validate()?;
        let span = info_span!(
            "upgrade",
            run_id = %self.run_id,
            from = %self.request.from,
            to = %self.request.to
        );
        async move {
            loop {
                let err = match self.attempt().await {
                    Ok(()) => break,
                    Err(err) => err,
                };
                warn!(error = %err, "upgrade attempt failed");
                self.prompter.inform(&format!("Error during upgrade: {err}"));
                let choice = self
                    .prompter
                    .select("What would you like to do?", &RUN_CHOICES, 1)?;
                if choice == 0 {
                    info!("retrying upgrade");
                    continue;
                }
                self.report_abort();
                return Err(UpgradeError::Aborted {
                    reason: err.to_string(),
                });
            }
            Ok::<_, UpgradeError>(self.finish())
        }
        .instrument(span)
        .await
    }

    async fn attempt(&mut self) -> Result<(), UpgradeError> {
        if self.config.check_project && !self.state.checked {
            check_project(&self.project_dir)?;
            info!(dir = %self.project_dir.display(), "project check passed");
        }
        self.state.checked = true;

        if self.config.create_branch && self.state.branch.is_none() {
            let branch = upgrade_branch_name(&self.request.from, &self.request.to);
            match checkout_upgrade_branch(&self.project_dir, &branch)? {
                BranchState::Created => self
                    .prompter
                    .inform(&format!("Created and switched to branch {branch}")),
                BranchState::Existing => self
                    .prompter
                    .inform(&format!("Switched to existing branch {branch}")),
            }
            self.state.branch = Some(branch);
        }

        if self.config.align_deps && !self.state.aligned {
            self.state.aligned = true;
            self.align();
        }

        if self.state.fetched.is_none() {
            self.prompter.inform(&format!(
                "Fetching upgrade diff from {}",
                self.source.describe(&self.request.from, &self.request.to)
            ));
            let fetched = fetch_plan(&self.config, &self.request, &self.source).await?;
            self.state.outcomes = vec![None; fetched.plan.change_count()];
            self.state.fetched = Some(fetched);
        }

        if !self.state.confirmed && !self.confirm_plan()? {
            self.state.cancelled = true;
            info!("upgrade cancelled before applying changes");
            self.prompter.inform("Upgrade process cancelled by user.");
            return Ok(());
        }
        self.state.confirmed = true;

        self.apply_pending()
    }

    /// Show the plan and ask once whether to apply it. An empty plan needs no
    /// confirmation.
    fn confirm_plan(&self) -> Result<bool, PromptError> {
        let Some(fetched) = &self.state.fetched else {
            return Ok(true);
        };
        if fetched.plan.is_empty() {
            return Ok(true);
        }
        let mut listing = format!(
            "Upgrade plan {} -> {} ({} file changes)",
            self.request.from,
            self.request.to,
            fetched.plan.change_count()
        );
        for line in fetched.plan.outline() {
            listing.push('\n');
            listing.push_str(&line);
        }
        self.prompter.inform(&listing);
        self.prompter.confirm(PROCEED_MESSAGE, true)
    }

    fn align(&self) {
        self.prompter.inform("Aligning dependencies with align-deps");
        match align_deps(&self.project_dir, &self.request.to) {
            Ok(_) => self.prompter.inform("Dependencies aligned."),
            Err(AlignError::Unsupported { requirement }) => self.prompter.inform(&format!(
                "align-deps has no profile for {requirement} yet; dependencies were left unchanged."
            )),
            Err(err) => self
                .prompter
                .inform(&format!("Dependency alignment failed, continuing: {err}")),
        }
    }

    fn apply_pending(&mut self) -> Result<(), UpgradeError> {
        let RunState {
            fetched, outcomes, ..
        } = &mut self.state;
        let Some(fetched) = fetched.as_ref() else {
            return Ok(());
        };
        if fetched.plan.is_empty() {
            self.prompter
                .inform("The upgrade diff contains no file changes. Nothing to do.");
            return Ok(());
        }

        let changes: Vec<_> = fetched.plan.changes().collect();
        let pending: Vec<usize> = (0..changes.len())
            .filter(|&index| {
                matches!(outcomes[index], None | Some(ApplyOutcome::Aborted))
            })
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        let scratch = Scratch::create(self.project_dir.join(&self.config.scratch_dir))?;
        let patches = scratch.materialize_all(pending.iter().map(|&index| changes[index]))?;
        info!(
            scratch = %scratch.path().display(),
            staged = patches.len(),
            "materialized patches"
        );

        let applicator = Applicator::new(
            &self.project_dir,
            &scratch,
            self.prompter,
            ApplySettings::from_config(&self.config),
        );
        for (&index, patch) in pending.iter().zip(&patches) {
            let change = changes[index];
            let outcome = applicator.process(change, patch)?;
            outcomes[index] = Some(outcome);
            if outcome == ApplyOutcome::Aborted {
                return Err(UpgradeError::FileAborted {
                    file: change.file.clone(),
                });
            }
        }

        if let Err(err) = scratch.remove() {
            warn!(error = %err, "failed to remove scratch directory");
        }
        Ok(())
    }

    fn report_abort(&self) {
        self.prompter.inform("Upgrade aborted.");
        let staged = self.project_dir.join(&self.config.scratch_dir);
        if staged.exists() {
            self.prompter.inform(&format!(
                "Unapplied patches were left in {} for inspection.",
                staged.display()
            ));
        }
        match helper_url(&self.config.helper_url, &self.request) {
            Ok(url) => self.prompter.inform(&format!(
                "You can finish the upgrade manually with the Upgrade Helper: {url}"
            )),
            Err(err) => warn!(error = %err, "cannot build upgrade helper url"),
        }
    }

    fn finish(self) -> RunSummary {
        let (entries, diff_hash) = match &self.state.fetched {
            Some(fetched) => (
                fetched
                    .plan
                    .changes()
                    .zip(&self.state.outcomes)
                    .filter_map(|(change, outcome)| {
                        outcome.map(|outcome| EntryReport {
                            file: change.file.clone(),
                            outcome,
                        })
                    })
                    .collect(),
                Some(fetched.diff_hash.clone()),
            ),
            None => (Vec::new(), None),
        };

        if !self.state.cancelled {
            match &self.state.branch {
                Some(branch) => self.prompter.inform(&format!(
                    "Upgrade finished. Review the changes on branch {branch} before committing."
                )),
                None => self
                    .prompter
                    .inform("Upgrade finished. Review the changes before committing."),
            }
        }
        info!(
            entries = entries.len(),
            cancelled = self.state.cancelled,
            "upgrade finished"
        );

        RunSummary {
            run_id: self.run_id,
            app_name: self.request.app_name,
            app_package: self.request.app_package,
            from: self.request.from,
            to: self.request.to,
            branch: self.state.branch,
            diff_hash,
            cancelled: self.state.cancelled,
            entries,
        }
    }
}
