use serde::{Deserialize, Serialize};

/// A verse's 1-based position in canonical reading order across the corpus.
///
/// Dense in `[1, total_verses]` and bijective with valid [`crate::VerseAddress`]
/// values. Also doubles as a pixel axis value on the similarity image, where
/// each axis indexes verses in the same order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerseOrdinal(pub u32);

impl std::fmt::Display for VerseOrdinal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One verse of the corpus as stored in the bulk dataset.
///
/// Keyed uniquely by `verse_id`; `citation` is unique as well. Extra fields
/// present in the dataset (book number, text length, ...) are ignored on
/// deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseRecord {
    pub verse_id: VerseOrdinal,
    pub citation: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::{VerseOrdinal, VerseRecord};

    #[test]
    fn ordinal_serializes_as_bare_number() {
        let json = serde_json::to_string(&VerseOrdinal(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn record_ignores_extra_dataset_fields() {
        let raw = r#"{
            "verse_id": 1,
            "citation": "Genesis 1:1",
            "book_name": "Genesis",
            "book_number": 1,
            "chapter_number": 1,
            "verse_number": 1,
            "length_chars": 55,
            "text": "In the beginning God created the heaven and the earth."
        }"#;
        let record: VerseRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.verse_id, VerseOrdinal(1));
        assert_eq!(record.citation, "Genesis 1:1");
    }
}
