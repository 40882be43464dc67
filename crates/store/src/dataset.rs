use std::path::PathBuf;

use corpus::VerseRecord;

/// Where the bulk verse dataset comes from.
///
/// `Remote` is the deployed configuration; `File` serves offline use and
/// tests without standing up an HTTP server.
#[derive(Debug, Clone)]
pub enum DatasetSource {
    Remote { url: String },
    File { path: PathBuf },
}

impl std::fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetSource::Remote { url } => write!(f, "{url}"),
            DatasetSource::File { path } => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetError {
    Request(String),
    HttpStatus { status: u16, url: String },
    Io { path: PathBuf, message: String },
    Parse(String),
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::Request(msg) => write!(f, "dataset request failed: {msg}"),
            DatasetError::HttpStatus { status, url } => {
                write!(f, "dataset request returned HTTP {status}: {url}")
            }
            DatasetError::Io { path, message } => {
                write!(f, "dataset read failed: {} -> {message}", path.display())
            }
            DatasetError::Parse(msg) => write!(f, "dataset parse failed: {msg}"),
        }
    }
}

impl std::error::Error for DatasetError {}

impl DatasetSource {
    /// Fetch and decode the full dataset (a JSON array of verse records).
    pub async fn fetch(&self, http: &reqwest::Client) -> Result<Vec<VerseRecord>, DatasetError> {
        match self {
            DatasetSource::Remote { url } => {
                let resp = http
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| DatasetError::Request(e.to_string()))?;
                if !resp.status().is_success() {
                    return Err(DatasetError::HttpStatus {
                        status: resp.status().as_u16(),
                        url: url.clone(),
                    });
                }
                resp.json()
                    .await
                    .map_err(|e| DatasetError::Parse(e.to_string()))
            }
            DatasetSource::File { path } => {
                let raw = tokio::fs::read(path).await.map_err(|e| DatasetError::Io {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
                serde_json::from_slice(&raw).map_err(|e| DatasetError::Parse(e.to_string()))
            }
        }
    }
}
