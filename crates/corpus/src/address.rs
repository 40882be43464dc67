use serde::{Deserialize, Serialize};

use crate::books::BookTable;
use crate::verse::VerseOrdinal;

/// A book/chapter/verse triple as selected in the UI.
///
/// An address is only meaningful relative to a [`BookTable`]; validity is
/// decided by [`BookTable::ordinal_of`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseAddress {
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
}

impl VerseAddress {
    pub fn new(book: impl Into<String>, chapter: u32, verse: u32) -> Self {
        Self {
            book: book.into(),
            chapter,
            verse,
        }
    }
}

impl std::fmt::Display for VerseAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}:{}", self.book, self.chapter, self.verse)
    }
}

impl BookTable {
    /// Flat 1-based ordinal of an address, or `None` if the address is invalid.
    ///
    /// Invalid input is a boundary condition, not an error: dropdown-driven
    /// selections are transiently inconsistent while the dependent lists
    /// re-populate, so callers get a sentinel to check rather than a failure
    /// to handle.
    pub fn ordinal_of(&self, address: &VerseAddress) -> Option<VerseOrdinal> {
        let index = self.books.iter().position(|b| b.name == address.book)?;
        let book = &self.books[index];

        let verses = book.verses_in(address.chapter)?;
        if address.verse == 0 || address.verse > verses {
            return None;
        }

        let mut count = self.offsets[index];
        for chapter_count in &book.verse_counts[..address.chapter as usize - 1] {
            count += chapter_count;
        }
        Some(VerseOrdinal(count + address.verse))
    }

    /// Inverse of [`BookTable::ordinal_of`].
    pub fn address_of(&self, ordinal: VerseOrdinal) -> Option<VerseAddress> {
        if ordinal.0 == 0 || ordinal.0 > self.total {
            return None;
        }

        // Last book whose offset is below the ordinal.
        let index = self.offsets.partition_point(|&off| off < ordinal.0) - 1;
        let book = &self.books[index];

        let mut remaining = ordinal.0 - self.offsets[index];
        for (chapter_index, &chapter_count) in book.verse_counts.iter().enumerate() {
            if remaining <= chapter_count {
                return Some(VerseAddress::new(
                    book.name.clone(),
                    chapter_index as u32 + 1,
                    remaining,
                ));
            }
            remaining -= chapter_count;
        }

        // Unreachable for a validated table: offsets bound remaining above.
        None
    }
}
