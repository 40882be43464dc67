//! Request/response bridge over the store worker.
//!
//! Each `resolve` call owns a fresh reply channel, so concurrent callers are
//! routed independently and a response arriving after the caller's deadline
//! is dropped instead of resolving a stale caller.

use std::time::Duration;

use corpus::{VerseOrdinal, VerseRecord};

use crate::protocol::{StoreCommand, StoreReply};
use crate::worker::StoreHandle;

/// How long a lookup may wait for the worker before failing.
pub const RESOLVE_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    Timeout { ordinal: VerseOrdinal },
    Store(String),
    Disconnected,
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::Timeout { ordinal } => {
                write!(f, "timed out waiting for verse data for ordinal {ordinal}")
            }
            ResolveError::Store(message) => write!(f, "verse lookup failed: {message}"),
            ResolveError::Disconnected => write!(f, "store worker is not running"),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Resolves verse ordinals to records through the store worker.
#[derive(Clone)]
pub struct VerseResolver {
    store: StoreHandle,
    timeout: Duration,
}

impl VerseResolver {
    pub fn new(store: StoreHandle) -> Self {
        Self::with_timeout(store, RESOLVE_TIMEOUT)
    }

    pub fn with_timeout(store: StoreHandle, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Look up one record; an absent ordinal is `Ok(None)`.
    pub async fn resolve(
        &self,
        ordinal: VerseOrdinal,
    ) -> Result<Option<VerseRecord>, ResolveError> {
        let query = self.store.send(StoreCommand::Query { verse_id: ordinal });
        let reply = match tokio::time::timeout(self.timeout, query).await {
            Ok(sent) => sent.map_err(|_| ResolveError::Disconnected)?,
            Err(_) => return Err(ResolveError::Timeout { ordinal }),
        };

        match reply {
            StoreReply::QueryResult { result } => Ok(result),
            StoreReply::Error { message } => Err(ResolveError::Store(message)),
            other => Err(ResolveError::Store(format!(
                "unexpected query reply: {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::{ResolveError, VerseResolver};
    use crate::dataset::DatasetSource;
    use crate::protocol::StoreReply;
    use crate::worker::{StoreConfig, handle_for_tests, spawn};
    use corpus::{VerseOrdinal, VerseRecord};

    async fn ready_resolver(dir: &tempfile::TempDir, count: u32) -> VerseResolver {
        let records: Vec<VerseRecord> = (1..=count)
            .map(|i| VerseRecord {
                verse_id: VerseOrdinal(i),
                citation: format!("Genesis 1:{i}"),
                text: format!("verse number {i}"),
            })
            .collect();
        let dataset = dir.path().join("dataset.json");
        tokio::fs::write(&dataset, serde_json::to_vec(&records).unwrap())
            .await
            .unwrap();

        let handle = spawn(StoreConfig {
            source: DatasetSource::File { path: dataset },
            snapshot_path: dir.path().join("snapshot.json"),
            http: reqwest::Client::new(),
        });
        handle.init().await.unwrap();
        VerseResolver::new(handle)
    }

    #[tokio::test]
    async fn resolves_hits_and_misses() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ready_resolver(&dir, 3).await;

        let record = resolver.resolve(VerseOrdinal(3)).await.unwrap().unwrap();
        assert_eq!(record.citation, "Genesis 1:3");

        assert_eq!(resolver.resolve(VerseOrdinal(1000)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn concurrent_resolves_route_independently() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ready_resolver(&dir, 3).await;

        let (a, b) = tokio::join!(
            resolver.resolve(VerseOrdinal(1)),
            resolver.resolve(VerseOrdinal(2)),
        );
        assert_eq!(a.unwrap().unwrap().citation, "Genesis 1:1");
        assert_eq!(b.unwrap().unwrap().citation, "Genesis 1:2");
    }

    #[tokio::test]
    async fn times_out_and_drops_late_replies() {
        let (handle, mut commands, _state) = handle_for_tests();
        let resolver = VerseResolver::with_timeout(handle, Duration::from_millis(20));

        let err = resolver.resolve(VerseOrdinal(7)).await.unwrap_err();
        assert_eq!(
            err,
            ResolveError::Timeout {
                ordinal: VerseOrdinal(7),
            }
        );
        assert!(err.to_string().contains('7'));

        // The worker answers after the caller gave up; the reply goes nowhere.
        let envelope = commands.recv().await.unwrap();
        let late = envelope
            .reply
            .send(StoreReply::QueryResult { result: None });
        assert!(late.is_err());
    }

    #[tokio::test]
    async fn unresponsive_worker_fails_every_caller_separately() {
        let (handle, _commands, _state) = handle_for_tests();
        let resolver = VerseResolver::with_timeout(handle, Duration::from_millis(20));

        let (a, b) = tokio::join!(
            resolver.resolve(VerseOrdinal(1)),
            resolver.resolve(VerseOrdinal(2)),
        );
        assert_eq!(
            a.unwrap_err(),
            ResolveError::Timeout {
                ordinal: VerseOrdinal(1),
            }
        );
        assert_eq!(
            b.unwrap_err(),
            ResolveError::Timeout {
                ordinal: VerseOrdinal(2),
            }
        );
    }
}
