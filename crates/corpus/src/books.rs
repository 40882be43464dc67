use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// The canonical book table, embedded at build time.
const KJV_BOOKS_JSON: &str = include_str!("../data/kjv_books.json");

/// One book of the corpus: its name and per-chapter verse counts.
///
/// `verse_counts[i]` is the number of verses in chapter `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub name: String,
    pub verse_counts: Vec<u32>,
}

impl Book {
    pub fn chapters(&self) -> u32 {
        self.verse_counts.len() as u32
    }

    /// Verse count of a 1-based chapter, or `None` if the chapter does not exist.
    pub fn verses_in(&self, chapter: u32) -> Option<u32> {
        if chapter == 0 {
            return None;
        }
        self.verse_counts.get(chapter as usize - 1).copied()
    }

    pub fn total_verses(&self) -> u32 {
        self.verse_counts.iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookTableError {
    Parse(String),
    Empty,
    EmptyBook { book: String },
    ZeroVerseChapter { book: String, chapter: u32 },
    DuplicateBook { book: String },
}

impl std::fmt::Display for BookTableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookTableError::Parse(msg) => write!(f, "book table parse failed: {msg}"),
            BookTableError::Empty => write!(f, "book table has no books"),
            BookTableError::EmptyBook { book } => write!(f, "book has no chapters: {book}"),
            BookTableError::ZeroVerseChapter { book, chapter } => {
                write!(f, "chapter has no verses: {book} {chapter}")
            }
            BookTableError::DuplicateBook { book } => write!(f, "duplicate book name: {book}"),
        }
    }
}

impl std::error::Error for BookTableError {}

/// Ordered book/chapter/verse-count table, canonical Genesis..Revelation.
///
/// Immutable once constructed. Cumulative verse offsets are precomputed so
/// ordinal-to-address lookup is a binary search rather than a full scan.
#[derive(Debug, Clone)]
pub struct BookTable {
    pub(crate) books: Vec<Book>,
    /// `offsets[i]` = number of verses in all books preceding book `i`.
    pub(crate) offsets: Vec<u32>,
    pub(crate) total: u32,
}

impl BookTable {
    pub fn new(books: Vec<Book>) -> Result<Self, BookTableError> {
        if books.is_empty() {
            return Err(BookTableError::Empty);
        }

        let mut offsets = Vec::with_capacity(books.len());
        let mut total = 0u32;
        for book in &books {
            if book.verse_counts.is_empty() {
                return Err(BookTableError::EmptyBook {
                    book: book.name.clone(),
                });
            }
            for (idx, count) in book.verse_counts.iter().enumerate() {
                if *count == 0 {
                    return Err(BookTableError::ZeroVerseChapter {
                        book: book.name.clone(),
                        chapter: idx as u32 + 1,
                    });
                }
            }
            if books.iter().filter(|b| b.name == book.name).count() > 1 {
                return Err(BookTableError::DuplicateBook {
                    book: book.name.clone(),
                });
            }
            offsets.push(total);
            total += book.total_verses();
        }

        Ok(Self {
            books,
            offsets,
            total,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, BookTableError> {
        let books: Vec<Book> =
            serde_json::from_str(raw).map_err(|e| BookTableError::Parse(e.to_string()))?;
        Self::new(books)
    }

    /// The canonical KJV table, parsed once per process from the embedded asset.
    pub fn canonical() -> &'static BookTable {
        static TABLE: OnceLock<BookTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            BookTable::from_json(KJV_BOOKS_JSON).expect("embedded book table is valid")
        })
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn book(&self, name: &str) -> Option<&Book> {
        self.books.iter().find(|b| b.name == name)
    }

    pub fn chapters_in(&self, book: &str) -> Option<u32> {
        self.book(book).map(Book::chapters)
    }

    pub fn verses_in(&self, book: &str, chapter: u32) -> Option<u32> {
        self.book(book)?.verses_in(chapter)
    }

    pub fn total_verses(&self) -> u32 {
        self.total
    }
}
