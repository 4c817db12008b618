use axum::routing::get;
use axum::Router;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const FIXTURE: &str = "upgrade-0.71.0-0.72.0.diff";

const RNUP_ENV: [&str; 13] = [
    "RNUP_CONFIG",
    "RNUP_DIFF_BASE_URL",
    "RNUP_HELPER_URL",
    "RNUP_HTTP_TIMEOUT_SECS",
    "RNUP_PATCH_PROGRAM",
    "RNUP_STRATEGIES",
    "RNUP_EDITOR",
    "RNUP_EDITORS",
    "RNUP_SCRATCH_DIR",
    "RNUP_CREATE_BRANCH",
    "RNUP_CHECK_PROJECT",
    "RNUP_ALIGN_DEPS",
    "RUST_LOG",
];

pub struct MockDiffServer {
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl Drop for MockDiffServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn rnup_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_rnup"))
}

pub fn fixture_path(name: &str) -> PathBuf {
    workspace_root().join("tests/fixtures").join(name)
}

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .canonicalize()
        .expect("workspace root")
}

/// Serves the fixture diff at `/<from>..<to>.diff` for the fixture's versions.
pub async fn start_mock_diffs() -> MockDiffServer {
    let diff = std::fs::read_to_string(fixture_path(FIXTURE)).expect("fixture diff");
    let app = Router::new().route(
        "/0.71.0..0.72.0.diff",
        get(move || {
            let diff = diff.clone();
            async move { diff }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock");
    let addr = listener.local_addr().expect("mock addr");
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockDiffServer {
        base_url: format!("http://{addr}"),
        handle,
    }
}

/// Run the binary with a clean environment rooted at `home`.
pub fn run_rnup(args: &[&str], home: &Path, envs: &[(&str, &str)], input: Option<&str>) -> Output {
    let mut cmd = Command::new(rnup_bin());
    cmd.args(args)
        .current_dir(home)
        .env("HOME", home)
        .env_remove("EDITOR")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::piped());
    for key in RNUP_ENV {
        cmd.env_remove(key);
    }
    for (key, value) in envs {
        cmd.env(key, value);
    }

    let mut child = cmd.spawn().expect("spawn rnup");
    let mut stdin = child.stdin.take().expect("stdin");
    if let Some(payload) = input {
        stdin.write_all(payload.as_bytes()).expect("write stdin");
    }
    drop(stdin);
    child.wait_with_output().expect("rnup output")
}

pub fn stdout_of(output: &Output) -> String {
    assert!(
        output.status.success(),
        "rnup failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}
