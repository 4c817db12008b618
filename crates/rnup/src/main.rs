mod cli;

use clap::Parser;
use cli::{Cli, Commands, HelperUrlArgs, LogFormat, OutputFormat, PlanArgs, RequestArgs, UpgradeArgs};
use rnup_core::apply::ApplyOutcome;
use rnup_core::config::{resolve_config, PartialConfig, ResolvedConfig};
use rnup_core::fetch::DiffSource;
use rnup_core::plan::outline;
use rnup_core::prompt::{AutoPrompter, ConsolePrompter, PromptError, Prompter};
use rnup_core::types::{PlanReport, RunSummary};
use rnup_core::upgrade::{helper_url, plan_report, Upgrade, UpgradeError, UpgradeRequest};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

const EXIT_FAILED: u8 = 1;
const EXIT_USAGE: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => code,
    }
}

fn init_tracing(cli: &Cli) {
    let filter = if cli.quiet {
        EnvFilter::new("error")
    } else {
        let default_level = cli.log_level.as_filter();
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let _ = match cli.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
}

async fn run(cli: Cli) -> Result<(), ExitCode> {
    let quiet = cli.quiet;
    let config_path = cli.config;
    match cli.command {
        Commands::Upgrade(args) => run_upgrade(config_path, args, quiet).await,
        Commands::Plan(args) => run_plan(config_path, args, quiet).await,
        Commands::HelperUrl(args) => run_helper_url(config_path, args, quiet),
    }
}

async fn run_upgrade(config_path: Option<PathBuf>, args: UpgradeArgs, quiet: bool) -> Result<(), ExitCode> {
    let overrides = PartialConfig {
        patch_program: args.patch_program.clone(),
        scratch_dir: args.scratch_dir.clone(),
        create_branch: args.no_branch.then_some(false),
        check_project: args.skip_project_check.then_some(false),
        align_deps: args.align_deps.then_some(true),
        ..PartialConfig::default()
    };
    let config = load_config(config_path, overrides)?;
    let prompter = select_prompter(args.yes, quiet || args.format == OutputFormat::Json);
    let request = resolve_request(&args.request, prompter.as_ref()).map_err(prompt_failed)?;
    let source = diff_source(&config, args.diff_file);

    let upgrade = Upgrade::new(config, request, args.project_dir, source, prompter.as_ref());
    match upgrade.run().await {
        Ok(summary) => {
            match args.format {
                OutputFormat::Json => print_json(&summary)?,
                OutputFormat::Human => print_summary(&summary),
            }
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "upgrade failed");
            eprintln!("rnup: {err}");
            Err(exit_code_for(&err))
        }
    }
}

async fn run_plan(config_path: Option<PathBuf>, args: PlanArgs, quiet: bool) -> Result<(), ExitCode> {
    let config = load_config(config_path, PartialConfig::default())?;
    let prompter = select_prompter(args.yes, quiet);
    let request = resolve_request(&args.request, prompter.as_ref()).map_err(prompt_failed)?;
    let source = diff_source(&config, args.diff_file);

    let report = plan_report(&config, &request, &source).await.map_err(|err| {
        eprintln!("rnup: {err}");
        exit_code_for(&err)
    })?;
    match args.format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Human => print_plan(&report),
    }
    Ok(())
}

fn run_helper_url(config_path: Option<PathBuf>, args: HelperUrlArgs, quiet: bool) -> Result<(), ExitCode> {
    let config = load_config(config_path, PartialConfig::default())?;
    let prompter = select_prompter(args.yes, quiet);
    let request = resolve_request(&args.request, prompter.as_ref()).map_err(prompt_failed)?;
    let url = request
        .validate()
        .and_then(|()| helper_url(&config.helper_url, &request))
        .map_err(|err| {
            eprintln!("rnup: {err}");
            exit_code_for(&err)
        })?;
    println!("{url}");
    Ok(())
}

fn load_config(path: Option<PathBuf>, overrides: PartialConfig) -> Result<ResolvedConfig, ExitCode> {
    resolve_config(path, overrides).map_err(|err| {
        eprintln!("rnup: {err}");
        ExitCode::from(EXIT_USAGE)
    })
}

fn select_prompter(yes: bool, quiet: bool) -> Box<dyn Prompter> {
    if yes {
        Box::new(AutoPrompter::new(quiet))
    } else {
        Box::new(ConsolePrompter)
    }
}

fn resolve_request(args: &RequestArgs, prompter: &dyn Prompter) -> Result<UpgradeRequest, PromptError> {
    Ok(UpgradeRequest {
        app_name: ask(prompter, args.app_name.as_deref(), "What is your app name?")?,
        app_package: ask(
            prompter,
            args.app_package.as_deref(),
            "What is your app package (e.g. com.example.app)?",
        )?,
        from: ask(prompter, args.from.as_deref(), "Which React Native version is the project on?")?,
        to: ask(prompter, args.to.as_deref(), "Which React Native version do you want to upgrade to?")?,
    })
}

fn ask(prompter: &dyn Prompter, given: Option<&str>, message: &str) -> Result<String, PromptError> {
    match given {
        Some(value) => Ok(value.trim().to_string()),
        None => Ok(prompter.input(message, None)?.trim().to_string()),
    }
}

fn prompt_failed(err: PromptError) -> ExitCode {
    eprintln!("rnup: {err}");
    ExitCode::from(EXIT_USAGE)
}

fn diff_source(config: &ResolvedConfig, diff_file: Option<PathBuf>) -> DiffSource {
    match diff_file {
        Some(path) => DiffSource::File(path),
        None => DiffSource::Remote {
            base_url: config.diff_base_url.clone(),
        },
    }
}

fn exit_code_for(err: &UpgradeError) -> ExitCode {
    match err {
        UpgradeError::InvalidInput { .. } => ExitCode::from(EXIT_USAGE),
        _ => ExitCode::from(EXIT_FAILED),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ExitCode> {
    let rendered = serde_json::to_string_pretty(value).map_err(|err| {
        eprintln!("rnup: failed to render json: {err}");
        ExitCode::from(EXIT_FAILED)
    })?;
    println!("{rendered}");
    Ok(())
}

fn print_plan(report: &PlanReport) {
    println!(
        "Upgrade plan {} -> {} ({} file changes)",
        report.from, report.to, report.change_count
    );
    println!("source: {}", report.source);
    println!("diff:   {}", report.diff_hash);
    for line in outline(report.steps.iter().flat_map(|step| step.file_changes.iter())) {
        println!("{line}");
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!(
        "Upgrade {} -> {} for {} (run {})",
        summary.from, summary.to, summary.app_name, summary.run_id
    );
    if let Some(branch) = &summary.branch {
        println!("branch: {branch}");
    }
    if summary.cancelled {
        println!("cancelled before any file was changed");
        return;
    }
    for entry in &summary.entries {
        println!("  {:<28} {}", entry.outcome.label(), entry.file);
    }
    let needs_review = summary.count(ApplyOutcome::AppliedWithRejects)
        + summary.count(ApplyOutcome::ReconstructedFromAdditions);
    if needs_review > 0 {
        println!("{needs_review} file(s) need manual review before committing.");
    }
}
