//! The verse cache store worker.
//!
//! Owns the record map on its own task so that deserializing and inserting
//! tens of thousands of records never blocks callers; everything crosses the
//! boundary as messages. A disk snapshot makes the populated store survive
//! process restarts, so the bulk dataset is fetched at most once per
//! persisted store lifetime.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use corpus::{VerseOrdinal, VerseRecord};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::dataset::{DatasetError, DatasetSource};
use crate::protocol::{StoreCommand, StoreReply, StoreState};

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub source: DatasetSource,
    /// Where the populated store persists between runs.
    pub snapshot_path: PathBuf,
    pub http: reqwest::Client,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Dataset(DatasetError),
    DuplicateId(VerseOrdinal),
    DuplicateCitation(String),
    /// The worker task is gone (channel closed).
    Disconnected,
    /// An error reply carried back from the worker.
    Worker(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Dataset(err) => write!(f, "failed to populate store: {err}"),
            StoreError::DuplicateId(ordinal) => {
                write!(f, "dataset integrity error: duplicate verse id {ordinal}")
            }
            StoreError::DuplicateCitation(citation) => {
                write!(f, "dataset integrity error: duplicate citation {citation:?}")
            }
            StoreError::Disconnected => write!(f, "store worker is not running"),
            StoreError::Worker(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<DatasetError> for StoreError {
    fn from(err: DatasetError) -> Self {
        StoreError::Dataset(err)
    }
}

pub(crate) struct Envelope {
    pub(crate) command: StoreCommand,
    pub(crate) reply: oneshot::Sender<StoreReply>,
}

/// Cloneable handle to a spawned store worker.
#[derive(Clone)]
pub struct StoreHandle {
    commands: mpsc::Sender<Envelope>,
    state: watch::Receiver<StoreState>,
}

impl StoreHandle {
    /// Send one command and await its reply.
    pub async fn send(&self, command: StoreCommand) -> Result<StoreReply, StoreError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Envelope { command, reply: tx })
            .await
            .map_err(|_| StoreError::Disconnected)?;
        rx.await.map_err(|_| StoreError::Disconnected)
    }

    /// Initialize the store, returning the resident record count.
    pub async fn init(&self) -> Result<usize, StoreError> {
        match self.send(StoreCommand::Init).await? {
            StoreReply::Ready { records } => Ok(records),
            StoreReply::Error { message } => Err(StoreError::Worker(message)),
            other => Err(StoreError::Worker(format!("unexpected init reply: {other:?}"))),
        }
    }

    pub fn state(&self) -> StoreState {
        self.state.borrow().clone()
    }
}

/// Spawn the worker task and hand back its channel endpoints.
pub fn spawn(config: StoreConfig) -> StoreHandle {
    let (command_tx, command_rx) = mpsc::channel(32);
    let (state_tx, state_rx) = watch::channel(StoreState::Uninitialized);
    let store = VerseStore {
        config,
        records: BTreeMap::new(),
        citations: BTreeSet::new(),
        state: state_tx,
    };
    tokio::spawn(run(store, command_rx));
    StoreHandle {
        commands: command_tx,
        state: state_rx,
    }
}

#[cfg(test)]
pub(crate) fn handle_for_tests() -> (
    StoreHandle,
    mpsc::Receiver<Envelope>,
    watch::Sender<StoreState>,
) {
    let (command_tx, command_rx) = mpsc::channel(32);
    let (state_tx, state_rx) = watch::channel(StoreState::Uninitialized);
    (
        StoreHandle {
            commands: command_tx,
            state: state_rx,
        },
        command_rx,
        state_tx,
    )
}

async fn run(mut store: VerseStore, mut commands: mpsc::Receiver<Envelope>) {
    while let Some(Envelope { command, reply }) = commands.recv().await {
        let response = store.handle(command).await;
        // A caller that gave up (timeout) dropped its receiver; nothing to do.
        let _ = reply.send(response);
    }
    debug!("store worker shutting down");
}

struct VerseStore {
    config: StoreConfig,
    records: BTreeMap<VerseOrdinal, VerseRecord>,
    citations: BTreeSet<String>,
    state: watch::Sender<StoreState>,
}

impl VerseStore {
    async fn handle(&mut self, command: StoreCommand) -> StoreReply {
        match command {
            StoreCommand::Init => match self.init().await {
                Ok(records) => StoreReply::Ready { records },
                Err(err) => StoreReply::Error {
                    message: err.to_string(),
                },
            },
            StoreCommand::Query { verse_id } => self.query(verse_id),
        }
    }

    async fn init(&mut self) -> Result<usize, StoreError> {
        if !self.records.is_empty() {
            debug!("store already populated, skipping init");
            return Ok(self.records.len());
        }

        let _ = self.state.send(StoreState::Initializing);
        match self.populate().await {
            Ok(count) => {
                let _ = self.state.send(StoreState::Ready);
                info!("store ready with {count} records");
                Ok(count)
            }
            Err(err) => {
                // Drop any partial population so a later init starts clean.
                self.records.clear();
                self.citations.clear();
                let _ = self.state.send(StoreState::Error(err.to_string()));
                Err(err)
            }
        }
    }

    async fn populate(&mut self) -> Result<usize, StoreError> {
        if let Some(records) = self.load_snapshot().await {
            info!("loaded {} records from snapshot", records.len());
            self.insert_all(records)?;
            return Ok(self.records.len());
        }

        info!("fetching bulk dataset from {}", self.config.source);
        let records = self.config.source.fetch(&self.config.http).await?;
        info!("dataset fetched, inserting {} records", records.len());
        self.insert_all(records)?;
        self.write_snapshot().await;
        Ok(self.records.len())
    }

    /// Both `verse_id` and `citation` are unique in a well-formed dataset;
    /// a collision is a data-integrity error and fails population.
    fn insert_all(&mut self, records: Vec<VerseRecord>) -> Result<(), StoreError> {
        for record in records {
            if self.records.contains_key(&record.verse_id) {
                return Err(StoreError::DuplicateId(record.verse_id));
            }
            if !self.citations.insert(record.citation.clone()) {
                return Err(StoreError::DuplicateCitation(record.citation));
            }
            self.records.insert(record.verse_id, record);
        }
        Ok(())
    }

    async fn load_snapshot(&self) -> Option<Vec<VerseRecord>> {
        let path = &self.config.snapshot_path;
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(_) => return None,
        };
        match serde_json::from_slice::<Vec<VerseRecord>>(&raw) {
            Ok(records) if !records.is_empty() => Some(records),
            Ok(_) => None,
            Err(err) => {
                warn!("snapshot unreadable, refetching: {} -> {err}", path.display());
                None
            }
        }
    }

    /// Persistence is best-effort: a failed write costs a refetch on the next
    /// run, not the current session.
    async fn write_snapshot(&self) {
        let path = &self.config.snapshot_path;
        if let Some(parent) = path.parent() {
            if let Err(err) = tokio::fs::create_dir_all(parent).await {
                warn!("snapshot dir create failed: {} -> {err}", parent.display());
                return;
            }
        }
        let records: Vec<&VerseRecord> = self.records.values().collect();
        let raw = match serde_json::to_vec(&records) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("snapshot serialization failed: {err}");
                return;
            }
        };
        if let Err(err) = tokio::fs::write(path, raw).await {
            warn!("snapshot write failed: {} -> {err}", path.display());
        }
    }

    fn query(&self, verse_id: VerseOrdinal) -> StoreReply {
        if !matches!(*self.state.borrow(), StoreState::Ready) {
            return StoreReply::Error {
                message: "store is not initialized".to_string(),
            };
        }
        StoreReply::QueryResult {
            result: self.records.get(&verse_id).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use pretty_assertions::assert_eq;

    use super::{StoreConfig, StoreError, spawn};
    use crate::dataset::DatasetSource;
    use crate::protocol::{StoreCommand, StoreReply, StoreState};
    use corpus::{VerseOrdinal, VerseRecord};

    fn sample_records(count: u32) -> Vec<VerseRecord> {
        (1..=count)
            .map(|i| VerseRecord {
                verse_id: VerseOrdinal(i),
                citation: format!("Genesis 1:{i}"),
                text: format!("verse number {i}"),
            })
            .collect()
    }

    async fn write_dataset(path: &Path, records: &[VerseRecord]) {
        let raw = serde_json::to_vec(records).unwrap();
        tokio::fs::write(path, raw).await.unwrap();
    }

    fn config(dataset: PathBuf, snapshot: PathBuf) -> StoreConfig {
        StoreConfig {
            source: DatasetSource::File { path: dataset },
            snapshot_path: snapshot,
            http: reqwest::Client::new(),
        }
    }

    #[tokio::test]
    async fn init_populates_and_serves_queries() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("dataset.json");
        write_dataset(&dataset, &sample_records(3)).await;

        let handle = spawn(config(dataset, dir.path().join("snapshot.json")));
        assert_eq!(handle.init().await.unwrap(), 3);
        assert_eq!(handle.state(), StoreState::Ready);

        let reply = handle
            .send(StoreCommand::Query {
                verse_id: VerseOrdinal(2),
            })
            .await
            .unwrap();
        let StoreReply::QueryResult { result: Some(record) } = reply else {
            panic!("expected a hit, got {reply:?}");
        };
        assert_eq!(record.citation, "Genesis 1:2");

        // Absent ids are a null result, not an error.
        let reply = handle
            .send(StoreCommand::Query {
                verse_id: VerseOrdinal(99),
            })
            .await
            .unwrap();
        assert_eq!(reply, StoreReply::QueryResult { result: None });
    }

    #[tokio::test]
    async fn query_before_init_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("dataset.json");
        write_dataset(&dataset, &sample_records(1)).await;

        let handle = spawn(config(dataset, dir.path().join("snapshot.json")));
        let reply = handle
            .send(StoreCommand::Query {
                verse_id: VerseOrdinal(1),
            })
            .await
            .unwrap();
        assert_eq!(
            reply,
            StoreReply::Error {
                message: "store is not initialized".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn reinit_skips_refetching() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("dataset.json");
        write_dataset(&dataset, &sample_records(3)).await;

        let handle = spawn(config(dataset.clone(), dir.path().join("snapshot.json")));
        assert_eq!(handle.init().await.unwrap(), 3);

        // The dataset changes on disk, but a populated store must not re-read it.
        write_dataset(&dataset, &sample_records(5)).await;
        assert_eq!(handle.init().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn snapshot_survives_restart_without_the_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("dataset.json");
        let snapshot = dir.path().join("cache").join("snapshot.json");
        write_dataset(&dataset, &sample_records(4)).await;

        let first = spawn(config(dataset.clone(), snapshot.clone()));
        assert_eq!(first.init().await.unwrap(), 4);

        // Second lifetime: the dataset source is gone, only the snapshot remains.
        tokio::fs::remove_file(&dataset).await.unwrap();
        let second = spawn(config(dataset, snapshot));
        assert_eq!(second.init().await.unwrap(), 4);

        let reply = second
            .send(StoreCommand::Query {
                verse_id: VerseOrdinal(4),
            })
            .await
            .unwrap();
        let StoreReply::QueryResult { result: Some(record) } = reply else {
            panic!("expected a hit, got {reply:?}");
        };
        assert_eq!(record.citation, "Genesis 1:4");
    }

    #[tokio::test]
    async fn duplicate_verse_id_fails_init() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("dataset.json");
        let mut records = sample_records(2);
        records.push(VerseRecord {
            verse_id: VerseOrdinal(2),
            citation: "Genesis 1:99".to_string(),
            text: "duplicate id".to_string(),
        });
        write_dataset(&dataset, &records).await;

        let handle = spawn(config(dataset, dir.path().join("snapshot.json")));
        let err = handle.init().await.unwrap_err();
        let StoreError::Worker(message) = err else {
            panic!("expected a worker error");
        };
        assert!(message.contains("duplicate verse id 2"), "{message}");
        assert!(matches!(handle.state(), StoreState::Error(_)));
    }

    #[tokio::test]
    async fn duplicate_citation_fails_init() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("dataset.json");
        let mut records = sample_records(2);
        records.push(VerseRecord {
            verse_id: VerseOrdinal(3),
            citation: "Genesis 1:1".to_string(),
            text: "duplicate citation".to_string(),
        });
        write_dataset(&dataset, &records).await;

        let handle = spawn(config(dataset, dir.path().join("snapshot.json")));
        let err = handle.init().await.unwrap_err();
        let StoreError::Worker(message) = err else {
            panic!("expected a worker error");
        };
        assert!(message.contains("duplicate citation"), "{message}");
    }

    #[tokio::test]
    async fn failed_population_reports_and_allows_retry() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("dataset.json");

        let handle = spawn(config(dataset.clone(), dir.path().join("snapshot.json")));
        assert!(handle.init().await.is_err());
        assert!(matches!(handle.state(), StoreState::Error(_)));

        // The dataset shows up; a retried init succeeds.
        write_dataset(&dataset, &sample_records(2)).await;
        assert_eq!(handle.init().await.unwrap(), 2);
        assert_eq!(handle.state(), StoreState::Ready);
    }
}
