//! Marker session management: one similarity query per invocation, result
//! rows placed as markers, and clamped forward/backward navigation.

use std::collections::BTreeMap;

use corpus::{BookTable, VerseAddress, VerseOrdinal, VerseRecord};
use projection::{NATIVE_ZOOM, PixelCoordinate, ProjectedCoordinate, pixel_to_projected};
use store::{ResolveError, VerseResolver};
use tracing::warn;

use crate::similarity::{SimilarityClient, SimilarityError, SimilarityRow};

/// What a marker popup shows: a fixed schema rather than whatever key-value
/// pairs the backend happened to send.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerDetails {
    pub distance: f64,
    pub query_verse: VerseRecord,
    pub matched_verse: VerseRecord,
}

/// A placed marker for one similarity result row.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerRecord {
    pub query: VerseOrdinal,
    pub matched: VerseOrdinal,
    pub position: PixelCoordinate,
    /// Pan target on the map surface.
    pub projected: ProjectedCoordinate,
    pub details: MarkerDetails,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    InvalidAddress(VerseAddress),
    Similarity(SimilarityError),
    Resolve(ResolveError),
    /// The store has no record for an ordinal a result row referenced.
    MissingVerse(VerseOrdinal),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::InvalidAddress(address) => {
                write!(
                    f,
                    "invalid address. Book: {} Chapter: {} Verse: {}",
                    address.book, address.chapter, address.verse
                )
            }
            SessionError::Similarity(err) => write!(f, "{err}"),
            SessionError::Resolve(err) => write!(f, "{err}"),
            SessionError::MissingVerse(ordinal) => {
                write!(f, "no verse record for ordinal {ordinal}")
            }
        }
    }
}

impl std::error::Error for SessionError {}

impl From<SimilarityError> for SessionError {
    fn from(err: SimilarityError) -> Self {
        SessionError::Similarity(err)
    }
}

impl From<ResolveError> for SessionError {
    fn from(err: ResolveError) -> Self {
        SessionError::Resolve(err)
    }
}

/// Runs similarity queries and owns the resulting markers.
pub struct MarkerSession {
    table: &'static BookTable,
    resolver: VerseResolver,
    similarity: SimilarityClient,
    markers_by_query: BTreeMap<VerseOrdinal, Vec<MarkerRecord>>,
    current_query: Option<VerseOrdinal>,
    current_index: usize,
}

impl MarkerSession {
    pub fn new(
        table: &'static BookTable,
        resolver: VerseResolver,
        similarity: SimilarityClient,
    ) -> Self {
        Self {
            table,
            resolver,
            similarity,
            markers_by_query: BTreeMap::new(),
            current_query: None,
            current_index: 0,
        }
    }

    /// Run one similarity search and place its markers.
    ///
    /// The query ordinal is snapshotted here, before the first await: by the
    /// time results arrive the caller's selection may have moved on. A failed
    /// search leaves existing markers untouched. Returns the number of
    /// markers placed.
    pub async fn search(
        &mut self,
        address: &VerseAddress,
        count: usize,
    ) -> Result<usize, SessionError> {
        let Some(ordinal) = self.table.ordinal_of(address) else {
            return Err(SessionError::InvalidAddress(address.clone()));
        };

        let rows = self.similarity.search(ordinal, count).await?;
        Ok(self.place_rows(ordinal, rows).await)
    }

    /// Place result rows as markers under `query`, resetting navigation.
    ///
    /// Rows are resolved sequentially; a row whose verses cannot be resolved
    /// is logged and skipped, never discarding the rest of the batch.
    pub async fn place_rows(&mut self, query: VerseOrdinal, rows: Vec<SimilarityRow>) -> usize {
        let mut placed = 0;
        for row in rows {
            match self.place_row(&row).await {
                Ok(marker) => {
                    self.markers_by_query.entry(query).or_default().push(marker);
                    placed += 1;
                }
                Err(err) => {
                    warn!(
                        "skipping marker for row ({}, {}): {err}",
                        row.x_coord, row.y_coord
                    );
                }
            }
        }

        self.current_query = Some(query);
        self.current_index = 0;
        placed
    }

    async fn place_row(&self, row: &SimilarityRow) -> Result<MarkerRecord, SessionError> {
        let query = VerseOrdinal(row.x_coord);
        let matched = VerseOrdinal(row.y_coord);

        let query_verse = self
            .resolver
            .resolve(query)
            .await?
            .ok_or(SessionError::MissingVerse(query))?;
        let matched_verse = self
            .resolver
            .resolve(matched)
            .await?
            .ok_or(SessionError::MissingVerse(matched))?;

        // Transposed on purpose: column = matched verse, row = queried verse,
        // matching where the rendered image draws this pair.
        let position = PixelCoordinate::clamped(row.y_coord as i64, row.x_coord as i64);
        let projected = pixel_to_projected(position, NATIVE_ZOOM);

        Ok(MarkerRecord {
            query,
            matched,
            position,
            projected,
            details: MarkerDetails {
                distance: row.distance,
                query_verse,
                matched_verse,
            },
        })
    }

    /// Markers placed for the most recent query, in result order.
    pub fn current_markers(&self) -> &[MarkerRecord] {
        self.current_query
            .and_then(|q| self.markers_by_query.get(&q))
            .map_or(&[], Vec::as_slice)
    }

    pub fn markers_for(&self, query: VerseOrdinal) -> &[MarkerRecord] {
        self.markers_by_query
            .get(&query)
            .map_or(&[], Vec::as_slice)
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// The marker under the navigation cursor.
    pub fn current(&self) -> Option<&MarkerRecord> {
        self.current_markers().get(self.current_index)
    }

    /// Advance the cursor, clamped to the last marker (no wraparound).
    pub fn next(&mut self) -> Option<&MarkerRecord> {
        let len = self.current_markers().len();
        if len == 0 {
            return None;
        }
        self.current_index = (self.current_index + 1).min(len - 1);
        self.current()
    }

    /// Retreat the cursor, clamped to the first marker.
    pub fn previous(&mut self) -> Option<&MarkerRecord> {
        if self.current_markers().is_empty() {
            return None;
        }
        self.current_index = self.current_index.saturating_sub(1);
        self.current()
    }

    /// Discard all markers and reset navigation and query state.
    pub fn clear(&mut self) {
        self.markers_by_query.clear();
        self.current_query = None;
        self.current_index = 0;
    }
}
