use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::apply::Strategy;

pub const DEFAULT_DIFF_BASE_URL: &str =
    "https://raw.githubusercontent.com/react-native-community/rn-diff-purge/diffs/diffs";
pub const DEFAULT_HELPER_URL: &str = "https://react-native-community.github.io/upgrade-helper";
pub const DEFAULT_SCRATCH_DIR: &str = ".upgrade-patches";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialConfig {
    pub diff_base_url: Option<String>,
    pub helper_url: Option<String>,
    pub http_timeout_secs: Option<u64>,
    pub patch_program: Option<String>,
    pub strategies: Option<Vec<Strategy>>,
    pub editor: Option<String>,
    pub editors: Option<Vec<String>>,
    pub scratch_dir: Option<String>,
    pub create_branch: Option<bool>,
    pub check_project: Option<bool>,
    pub align_deps: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub diff_base_url: String,
    pub helper_url: String,
    pub http_timeout_secs: u64,
    pub patch_program: String,
    pub strategies: Vec<Strategy>,
    /// Preferred editor, tried before `editors`.
    pub editor: Option<String>,
    pub editors: Vec<String>,
    pub scratch_dir: String,
    pub create_branch: bool,
    pub check_project: bool,
    pub align_deps: bool,
}

impl ResolvedConfig {
    pub fn defaults() -> Self {
        Self {
            diff_base_url: DEFAULT_DIFF_BASE_URL.to_string(),
            helper_url: DEFAULT_HELPER_URL.to_string(),
            http_timeout_secs: 60,
            patch_program: "patch".to_string(),
            strategies: Strategy::default_chain(),
            editor: None,
            editors: ["cursor --wait", "code --wait", "micro", "nano", "vim", "vi"]
                .iter()
                .map(|value| value.to_string())
                .collect(),
            scratch_dir: DEFAULT_SCRATCH_DIR.to_string(),
            create_branch: true,
            check_project: true,
            align_deps: false,
        }
    }

    /// Editor commands in launch order.
    pub fn editor_candidates(&self) -> Vec<String> {
        let mut candidates = Vec::with_capacity(self.editors.len() + 1);
        if let Some(editor) = &self.editor {
            candidates.push(editor.clone());
        }
        for editor in &self.editors {
            if !candidates.contains(editor) {
                candidates.push(editor.clone());
            }
        }
        candidates
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    MissingFile { path: PathBuf },
    #[error("config file read error: {path}: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("config file parse error: {path}: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("config path error: {0}")]
    Path(String),
    #[error("invalid env var {key}={value}")]
    InvalidEnv { key: String, value: String },
}

pub fn resolve_config(
    cli_path: Option<PathBuf>,
    overrides: PartialConfig,
) -> Result<ResolvedConfig, ConfigError> {
    let env_path = config_path_from_env();
    let required = cli_path.is_some() || env_path.is_some();
    let path = match cli_path.or(env_path) {
        Some(path) => path,
        None => default_config_path()?,
    };

    let file_config = load_config_file(&path, required)?;
    let env_config = load_env_config()?;

    let mut resolved = ResolvedConfig::defaults();
    // Precedence: defaults < config file < env vars < CLI overrides.
    file_config.apply_to(&mut resolved);
    env_config.apply_to(&mut resolved);
    overrides.apply_to(&mut resolved);

    Ok(resolved)
}

fn load_config_file(path: &Path, required: bool) -> Result<PartialConfig, ConfigError> {
    if !path.exists() {
        if required {
            return Err(ConfigError::MissingFile {
                path: path.to_path_buf(),
            });
        }
        return Ok(PartialConfig::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    let config = toml::from_str(&contents).map_err(|source| ConfigError::ParseFile {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(config)
}

fn load_env_config() -> Result<PartialConfig, ConfigError> {
    let mut config = PartialConfig::default();

    if let Some(value) = env("RNUP_DIFF_BASE_URL") {
        config.diff_base_url = Some(value);
    }
    if let Some(value) = env("RNUP_HELPER_URL") {
        config.helper_url = Some(value);
    }
    if let Some(value) = env("RNUP_HTTP_TIMEOUT_SECS") {
        config.http_timeout_secs = Some(parse_u64("RNUP_HTTP_TIMEOUT_SECS", &value)?);
    }
    if let Some(value) = env("RNUP_PATCH_PROGRAM") {
        config.patch_program = Some(value);
    }
    if let Some(value) = env("RNUP_STRATEGIES") {
        config.strategies = Some(parse_strategies("RNUP_STRATEGIES", &value)?);
    }
    if let Some(value) = env("EDITOR").filter(|value| !value.trim().is_empty()) {
        config.editor = Some(value);
    }
    if let Some(value) = env("RNUP_EDITOR") {
        config.editor = Some(value);
    }
    if let Some(value) = env("RNUP_EDITORS") {
        config.editors = Some(parse_list(&value));
    }
    if let Some(value) = env("RNUP_SCRATCH_DIR") {
        config.scratch_dir = Some(value);
    }
    if let Some(value) = env("RNUP_CREATE_BRANCH") {
        config.create_branch = Some(parse_bool("RNUP_CREATE_BRANCH", &value)?);
    }
    if let Some(value) = env("RNUP_CHECK_PROJECT") {
        config.check_project = Some(parse_bool("RNUP_CHECK_PROJECT", &value)?);
    }
    if let Some(value) = env("RNUP_ALIGN_DEPS") {
        config.align_deps = Some(parse_bool("RNUP_ALIGN_DEPS", &value)?);
    }

    Ok(config)
}

fn config_path_from_env() -> Option<PathBuf> {
    env_os("RNUP_CONFIG").map(PathBuf::from)
}

fn default_config_path() -> Result<PathBuf, ConfigError> {
    let base_dirs = directories::BaseDirs::new()
        .ok_or_else(|| ConfigError::Path("home directory not available".to_string()))?;

    if cfg!(target_os = "macos") {
        Ok(base_dirs
            .home_dir()
            .join("Library/Application Support/rnup/config.toml"))
    } else {
        Ok(base_dirs.home_dir().join(".config/rnup/config.toml"))
    }
}

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_os(key: &str) -> Option<OsString> {
    std::env::var_os(key)
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_strategies(key: &str, value: &str) -> Result<Vec<Strategy>, ConfigError> {
    let strategies = parse_list(value)
        .iter()
        .map(|item| {
            Strategy::parse(item).ok_or_else(|| ConfigError::InvalidEnv {
                key: key.to_string(),
                value: value.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if strategies.is_empty() {
        return Err(ConfigError::InvalidEnv {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    Ok(strategies)
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    })
}

impl PartialConfig {
    fn apply_to(self, resolved: &mut ResolvedConfig) {
        if let Some(value) = self.diff_base_url {
            resolved.diff_base_url = value;
        }
        if let Some(value) = self.helper_url {
            resolved.helper_url = value;
        }
        if let Some(value) = self.http_timeout_secs {
            resolved.http_timeout_secs = value;
        }
        if let Some(value) = self.patch_program {
            resolved.patch_program = value;
        }
        if let Some(value) = self.strategies {
            resolved.strategies = value;
        }
        if let Some(value) = self.editor {
            resolved.editor = Some(value);
        }
        if let Some(value) = self.editors {
            resolved.editors = value;
        }
        if let Some(value) = self.scratch_dir {
            resolved.scratch_dir = value;
        }
        if let Some(value) = self.create_branch {
            resolved.create_branch = value;
        }
        if let Some(value) = self.check_project {
            resolved.check_project = value;
        }
        if let Some(value) = self.align_deps {
            resolved.align_deps = value;
        }
    }
}
