use once_cell::sync::Lazy;
use rnup_core::apply::Strategy;
use rnup_core::config::{resolve_config, ConfigError, PartialConfig, ResolvedConfig};
use std::ffi::OsString;
use std::fs;
use std::sync::Mutex;
use tempfile::TempDir;

static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct EnvVarGuard {
    key: String,
    previous: Option<OsString>,
}

impl EnvVarGuard {
    fn set(key: &str, value: &str) -> Self {
        let previous = std::env::var_os(key);
        std::env::set_var(key, value);
        Self {
            key: key.to_string(),
            previous,
        }
    }

    fn remove(key: &str) -> Self {
        let previous = std::env::var_os(key);
        std::env::remove_var(key);
        Self {
            key: key.to_string(),
            previous,
        }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        if let Some(value) = &self.previous {
            std::env::set_var(&self.key, value);
        } else {
            std::env::remove_var(&self.key);
        }
    }
}

#[test]
fn resolve_config_defaults_from_empty_file() {
    let _lock = ENV_LOCK.lock().unwrap();
    let _patch = EnvVarGuard::remove("RNUP_PATCH_PROGRAM");
    let _strategies = EnvVarGuard::remove("RNUP_STRATEGIES");
    let _scratch = EnvVarGuard::remove("RNUP_SCRATCH_DIR");
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "# empty config\n").unwrap();

    let resolved = resolve_config(Some(path), PartialConfig::default()).unwrap();
    assert_eq!(resolved.patch_program, "patch");
    assert_eq!(resolved.scratch_dir, ".upgrade-patches");
    assert_eq!(resolved.strategies, Strategy::default_chain());
}

#[test]
fn resolve_config_applies_precedence() {
    let _lock = ENV_LOCK.lock().unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "patch_program = \"file-patch\"\nscratch_dir = \"file-scratch\"\nhttp_timeout_secs = 5\nstrategies = [\"additions\"]\n",
    )
    .unwrap();

    let _env_patch = EnvVarGuard::set("RNUP_PATCH_PROGRAM", "env-patch");
    let _env_scratch = EnvVarGuard::set("RNUP_SCRATCH_DIR", "env-scratch");
    let _env_timeout = EnvVarGuard::remove("RNUP_HTTP_TIMEOUT_SECS");
    let _env_strategies = EnvVarGuard::remove("RNUP_STRATEGIES");

    let overrides = PartialConfig {
        patch_program: Some("cli-patch".to_string()),
        ..PartialConfig::default()
    };

    let resolved = resolve_config(Some(path), overrides).unwrap();
    assert_eq!(resolved.patch_program, "cli-patch");
    assert_eq!(resolved.scratch_dir, "env-scratch");
    assert_eq!(resolved.http_timeout_secs, 5);
    assert_eq!(resolved.strategies, vec![Strategy::Additions]);
}

#[test]
fn resolve_config_rejects_invalid_env_values() {
    let _lock = ENV_LOCK.lock().unwrap();
    let _env_branch = EnvVarGuard::set("RNUP_CREATE_BRANCH", "sometimes");

    let result = resolve_config(None, PartialConfig::default());
    assert!(matches!(result, Err(ConfigError::InvalidEnv { key, .. }) if key == "RNUP_CREATE_BRANCH"));
}

#[test]
fn resolve_config_rejects_unknown_strategy() {
    let _lock = ENV_LOCK.lock().unwrap();
    let _env_strategies = EnvVarGuard::set("RNUP_STRATEGIES", "plain,guess");

    let result = resolve_config(None, PartialConfig::default());
    assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
}

#[test]
fn resolve_config_requires_explicit_file() {
    let _lock = ENV_LOCK.lock().unwrap();
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");

    let result = resolve_config(Some(missing), PartialConfig::default());
    assert!(matches!(result, Err(ConfigError::MissingFile { .. })));
}

#[test]
fn rnup_editor_wins_over_editor() {
    let _lock = ENV_LOCK.lock().unwrap();
    let _editor = EnvVarGuard::set("EDITOR", "nano");
    let _rnup_editor = EnvVarGuard::set("RNUP_EDITOR", "hx");

    let resolved = resolve_config(None, PartialConfig::default()).unwrap();
    assert_eq!(resolved.editor.as_deref(), Some("hx"));
    assert_eq!(resolved.editor_candidates()[0], "hx");
}

#[test]
fn editor_candidates_put_preferred_first_without_duplicates() {
    let mut config = ResolvedConfig::defaults();
    config.editor = Some("vim".to_string());

    let candidates = config.editor_candidates();
    assert_eq!(candidates[0], "vim");
    assert_eq!(candidates.iter().filter(|editor| *editor == "vim").count(), 1);
    assert_eq!(candidates.len(), config.editors.len());
}

#[test]
fn resolved_defaults_match_expected_values() {
    let defaults = ResolvedConfig::defaults();
    assert_eq!(
        defaults.diff_base_url,
        "https://raw.githubusercontent.com/react-native-community/rn-diff-purge/diffs/diffs"
    );
    assert_eq!(defaults.http_timeout_secs, 60);
    assert!(defaults.create_branch);
    assert!(defaults.check_project);
    assert!(!defaults.align_deps);
}
