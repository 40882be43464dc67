//! Changelog popup support: fetch the release list and report the releases
//! the user has not seen yet, remembering the newest version in a small
//! state file between runs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// At most this many releases are summarized in one popup.
pub const MAX_SUMMARIZED: usize = 5;

/// One release, as served by the changelog endpoint (newest first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub version: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangelogError {
    Request(String),
    HttpStatus { status: u16 },
    Parse(String),
    Io(String),
}

impl std::fmt::Display for ChangelogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangelogError::Request(msg) => write!(f, "changelog fetch failed: {msg}"),
            ChangelogError::HttpStatus { status } => {
                write!(f, "changelog fetch returned HTTP {status}")
            }
            ChangelogError::Parse(msg) => write!(f, "changelog parse failed: {msg}"),
            ChangelogError::Io(msg) => write!(f, "changelog state error: {msg}"),
        }
    }
}

impl std::error::Error for ChangelogError {}

/// The releases to show: empty when the newest version is the one already
/// seen, otherwise up to [`MAX_SUMMARIZED`] of the most recent releases.
pub fn unseen_releases(releases: &[Release], last_seen: Option<&str>) -> Vec<Release> {
    match releases.first() {
        None => Vec::new(),
        Some(latest) if Some(latest.version.as_str()) == last_seen => Vec::new(),
        Some(_) => releases.iter().take(MAX_SUMMARIZED).cloned().collect(),
    }
}

#[derive(Debug, Clone)]
pub struct ChangelogClient {
    http: reqwest::Client,
    url: String,
    state_path: PathBuf,
}

impl ChangelogClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>, state_path: PathBuf) -> Self {
        Self {
            http,
            url: url.into(),
            state_path,
        }
    }

    /// Fetch the changelog and return the unseen releases, marking the
    /// newest one as seen (mirroring a popup that shows once per version).
    pub async fn check(&self) -> Result<Vec<Release>, ChangelogError> {
        let releases = self.fetch().await?;
        let last_seen = self.last_seen().await?;
        let unseen = unseen_releases(&releases, last_seen.as_deref());
        if let Some(latest) = releases.first() {
            if !unseen.is_empty() {
                self.mark_seen(&latest.version).await?;
            }
        }
        Ok(unseen)
    }

    async fn fetch(&self) -> Result<Vec<Release>, ChangelogError> {
        let resp = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ChangelogError::Request(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ChangelogError::HttpStatus {
                status: resp.status().as_u16(),
            });
        }
        resp.json()
            .await
            .map_err(|e| ChangelogError::Parse(e.to_string()))
    }

    pub async fn last_seen(&self) -> Result<Option<String>, ChangelogError> {
        match tokio::fs::read_to_string(&self.state_path).await {
            Ok(raw) => {
                let version = raw.trim();
                if version.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(version.to_string()))
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ChangelogError::Io(err.to_string())),
        }
    }

    pub async fn mark_seen(&self, version: &str) -> Result<(), ChangelogError> {
        if let Some(parent) = self.state_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ChangelogError::Io(e.to_string()))?;
        }
        tokio::fs::write(&self.state_path, version)
            .await
            .map_err(|e| ChangelogError::Io(e.to_string()))
    }
}
