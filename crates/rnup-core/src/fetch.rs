use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("diff request to {url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("diff request to {url} failed: {message}")]
    Request { url: String, message: String },
    #[error("diff request to {url} timed out")]
    Timeout { url: String },
    #[error("failed to read diff file {path}: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffSource {
    /// Versioned diffs served as `<base_url>/<from>..<to>.diff`.
    Remote { base_url: String },
    File(PathBuf),
}

impl DiffSource {
    pub fn describe(&self, from: &str, to: &str) -> String {
        match self {
            DiffSource::Remote { base_url } => diff_url(base_url, from, to),
            DiffSource::File(path) => path.display().to_string(),
        }
    }
}

pub fn diff_url(base_url: &str, from: &str, to: &str) -> String {
    format!("{}/{from}..{to}.diff", base_url.trim_end_matches('/'))
}

pub struct DiffFetcher {
    http: reqwest::Client,
    timeout: Duration,
}

impl DiffFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: HTTP_CLIENT.clone(),
            timeout,
        }
    }

    pub async fn fetch(&self, source: &DiffSource, from: &str, to: &str) -> Result<String, FetchError> {
        match source {
            DiffSource::Remote { base_url } => self.fetch_remote(&diff_url(base_url, from, to)).await,
            DiffSource::File(path) => {
                let text = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| FetchError::ReadFile {
                        path: path.clone(),
                        source,
                    })?;
                info!(path = %path.display(), bytes = text.len(), "read diff file");
                Ok(text)
            }
        }
    }

    async fn fetch_remote(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| map_reqwest_error(url, err))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|err| map_reqwest_error(url, err))?;
        info!(url, bytes = text.len(), "fetched upgrade diff");
        Ok(text)
    }
}

fn map_reqwest_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Request {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);
