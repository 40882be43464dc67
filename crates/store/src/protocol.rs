//! Message protocol between the verse cache store worker and its clients.
//!
//! Commands travel to the worker over a channel, one reply per command.
//! Lifecycle state is published separately so observers can follow the
//! `Uninitialized -> Initializing -> Ready` progression (with `Error`
//! reachable from the transitional states).

use corpus::{VerseOrdinal, VerseRecord};
use serde::{Deserialize, Serialize};

/// Command sent to the store worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum StoreCommand {
    /// Open the persistent store, populating it from the bulk dataset if
    /// empty. Idempotent: an already-populated store skips re-fetching.
    Init,

    /// Look up one record by ordinal.
    Query { verse_id: VerseOrdinal },
}

/// Terminal reply to a single command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StoreReply {
    /// Init finished; the store now holds `records` verses.
    Ready { records: usize },

    /// Query finished. An absent id is `None`, not an error.
    QueryResult { result: Option<VerseRecord> },

    /// The command failed; `message` is suitable for direct display.
    Error { message: String },
}

/// Lifecycle state of the store worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreState {
    Uninitialized,
    Initializing,
    Ready,
    Error(String),
}

impl std::fmt::Display for StoreState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreState::Uninitialized => write!(f, "uninitialized"),
            StoreState::Initializing => write!(f, "initializing"),
            StoreState::Ready => write!(f, "ready"),
            StoreState::Error(message) => write!(f, "error: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{StoreCommand, StoreReply};
    use corpus::VerseOrdinal;

    #[test]
    fn commands_use_tagged_snake_case() {
        let json = serde_json::to_string(&StoreCommand::Query {
            verse_id: VerseOrdinal(12),
        })
        .unwrap();
        assert_eq!(json, r#"{"command":"query","verse_id":12}"#);
    }

    #[test]
    fn absent_result_round_trips_as_null() {
        let json = serde_json::to_string(&StoreReply::QueryResult { result: None }).unwrap();
        assert_eq!(json, r#"{"status":"query_result","result":null}"#);
        let back: StoreReply = serde_json::from_str(&json).unwrap();
        assert_eq!(back, StoreReply::QueryResult { result: None });
    }
}
