use axum::http::StatusCode;
use axum::{extract::State, routing::get, Router};
use rnup_core::fetch::{diff_url, DiffFetcher, DiffSource, FetchError};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const DIFF: &str = "diff --git a/App.js b/App.js\n--- a/App.js\n+++ b/App.js\n@@ -1 +1 @@\n-old\n+new\n";

struct ServerState {
    status: StatusCode,
    body: String,
    delay: Option<Duration>,
}

async fn spawn_server(
    status: StatusCode,
    body: &str,
    delay: Option<Duration>,
) -> (String, oneshot::Sender<()>) {
    let state = Arc::new(ServerState {
        status,
        body: body.to_string(),
        delay,
    });
    let app = Router::new()
        .route(
            "/diffs/0.71.0..0.72.0.diff",
            get(|State(state): State<Arc<ServerState>>| async move {
                if let Some(delay) = state.delay {
                    tokio::time::sleep(delay).await;
                }
                (state.status, state.body.clone())
            }),
        )
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    (format!("http://{addr}/diffs"), shutdown_tx)
}

#[test]
fn diff_url_follows_the_versioned_template() {
    assert_eq!(
        diff_url("https://example.test/diffs/", "0.71.0", "0.72.0"),
        "https://example.test/diffs/0.71.0..0.72.0.diff"
    );
}

#[tokio::test]
async fn remote_diff_is_returned_verbatim() {
    let (base_url, shutdown) = spawn_server(StatusCode::OK, DIFF, None).await;
    let fetcher = DiffFetcher::new(Duration::from_secs(5));

    let text = fetcher
        .fetch(&DiffSource::Remote { base_url }, "0.71.0", "0.72.0")
        .await
        .unwrap();
    assert_eq!(text, DIFF);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn non_200_status_is_a_fetch_error() {
    let (base_url, shutdown) = spawn_server(StatusCode::NOT_FOUND, "404: Not Found", None).await;
    let fetcher = DiffFetcher::new(Duration::from_secs(5));

    let err = fetcher
        .fetch(&DiffSource::Remote { base_url }, "0.71.0", "0.72.0")
        .await
        .unwrap_err();
    match err {
        FetchError::Status { url, status } => {
            assert_eq!(status, 404);
            assert!(url.ends_with("/diffs/0.71.0..0.72.0.diff"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let _ = shutdown.send(());
}

#[tokio::test]
async fn slow_server_times_out() {
    let (base_url, shutdown) =
        spawn_server(StatusCode::OK, DIFF, Some(Duration::from_millis(500))).await;
    let fetcher = DiffFetcher::new(Duration::from_millis(50));

    let err = fetcher
        .fetch(&DiffSource::Remote { base_url }, "0.71.0", "0.72.0")
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Timeout { .. }));

    let _ = shutdown.send(());
}

#[tokio::test]
async fn unreachable_host_is_a_request_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let fetcher = DiffFetcher::new(Duration::from_secs(2));

    let err = fetcher
        .fetch(
            &DiffSource::Remote {
                base_url: format!("http://{addr}"),
            },
            "0.71.0",
            "0.72.0",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Request { .. }));
}

#[tokio::test]
async fn local_diff_file_is_read_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("upgrade.diff");
    std::fs::write(&path, DIFF).unwrap();
    let fetcher = DiffFetcher::new(Duration::from_secs(5));

    let text = fetcher
        .fetch(&DiffSource::File(path), "0.71.0", "0.72.0")
        .await
        .unwrap();
    assert_eq!(text, DIFF);

    let missing = fetcher
        .fetch(&DiffSource::File(dir.path().join("absent.diff")), "0.71.0", "0.72.0")
        .await
        .unwrap_err();
    assert!(matches!(missing, FetchError::ReadFile { .. }));
}
