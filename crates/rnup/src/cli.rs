use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rnup")]
#[command(about = "Apply React Native template upgrades to a project, one file at a time")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
    /// Only errors are logged and informational messages are not printed.
    #[arg(long, global = true)]
    pub quiet: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch the upgrade diff and apply it to the project.
    Upgrade(UpgradeArgs),
    /// Print the steps an upgrade would take without touching the project.
    Plan(PlanArgs),
    /// Print the web Upgrade Helper link for a version pair.
    HelperUrl(HelperUrlArgs),
}

/// Inputs that are prompted for when not given.
#[derive(Args, Debug, Clone, Default)]
pub struct RequestArgs {
    #[arg(long)]
    pub app_name: Option<String>,
    #[arg(long = "package")]
    pub app_package: Option<String>,
    #[arg(long)]
    pub from: Option<String>,
    #[arg(long)]
    pub to: Option<String>,
}

#[derive(Args, Debug)]
pub struct UpgradeArgs {
    #[command(flatten)]
    pub request: RequestArgs,
    /// Read the diff from a file instead of downloading it.
    #[arg(long = "diff-file")]
    pub diff_file: Option<PathBuf>,
    #[arg(long, default_value = ".")]
    pub project_dir: PathBuf,
    /// Stay on the current git branch.
    #[arg(long)]
    pub no_branch: bool,
    #[arg(long)]
    pub skip_project_check: bool,
    #[arg(long)]
    pub align_deps: bool,
    #[arg(long)]
    pub patch_program: Option<String>,
    #[arg(long)]
    pub scratch_dir: Option<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
    /// Answer every question with its default.
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub request: RequestArgs,
    #[arg(long = "diff-file")]
    pub diff_file: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct HelperUrlArgs {
    #[command(flatten)]
    pub request: RequestArgs,
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Human,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}
