//! Client for the verse similarity search endpoint.

use corpus::VerseOrdinal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One row of a similarity result.
///
/// `x_coord` is the queried verse's ordinal, `y_coord` the matched verse's.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimilarityRow {
    #[serde(deserialize_with = "de_distance")]
    pub distance: f64,
    #[serde(rename = "xCoord")]
    pub x_coord: u32,
    #[serde(rename = "yCoord")]
    pub y_coord: u32,
}

// The backend formats distances as decimal strings ("0.42"); accept a bare
// number as well in case that ever gets fixed.
fn de_distance<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(de)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimilarityError {
    Request(String),
    HttpStatus { status: u16 },
    Parse(String),
}

impl std::fmt::Display for SimilarityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimilarityError::Request(msg) => write!(f, "similarity search failed: {msg}"),
            SimilarityError::HttpStatus { status } => {
                write!(f, "similarity search returned HTTP {status}")
            }
            SimilarityError::Parse(msg) => {
                write!(f, "similarity response parse failed: {msg}")
            }
        }
    }
}

impl std::error::Error for SimilarityError {}

/// Decode a similarity response body.
///
/// The backend double-encodes: the body is a JSON string whose contents are
/// the row array. A plain array is accepted too, so a fixed backend keeps
/// working without a client change.
pub fn parse_rows(body: Value) -> Result<Vec<SimilarityRow>, SimilarityError> {
    let rows = match body {
        Value::String(inner) => {
            serde_json::from_str(&inner).map_err(|e| SimilarityError::Parse(e.to_string()))?
        }
        other => {
            serde_json::from_value(other).map_err(|e| SimilarityError::Parse(e.to_string()))?
        }
    };
    Ok(rows)
}

/// Thin HTTP client for the similarity search endpoint.
#[derive(Debug, Clone)]
pub struct SimilarityClient {
    http: reqwest::Client,
    base_url: String,
}

impl SimilarityClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Fetch the `count` nearest verses to `ordinal`, nearest first.
    pub async fn search(
        &self,
        ordinal: VerseOrdinal,
        count: usize,
    ) -> Result<Vec<SimilarityRow>, SimilarityError> {
        let url = format!(
            "{}/api/verse_similarity_search/{ordinal}/{count}",
            self.base_url.trim_end_matches('/'),
        );
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| SimilarityError::Request(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(SimilarityError::HttpStatus {
                status: resp.status().as_u16(),
            });
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| SimilarityError::Parse(e.to_string()))?;
        parse_rows(body)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::{SimilarityError, SimilarityRow, parse_rows};

    #[test]
    fn double_encoded_and_plain_bodies_agree() {
        let rows = json!([
            {"distance": "0.42", "xCoord": 1, "yCoord": 31102},
            {"distance": "0.87", "xCoord": 1, "yCoord": 2},
        ]);
        let double_encoded = json!(rows.to_string());

        let a = parse_rows(double_encoded).unwrap();
        let b = parse_rows(rows).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a[0],
            SimilarityRow {
                distance: 0.42,
                x_coord: 1,
                y_coord: 31102,
            }
        );
    }

    #[test]
    fn distance_accepts_string_or_number() {
        let rows = parse_rows(json!([
            {"distance": "0.10", "xCoord": 1, "yCoord": 2},
            {"distance": 0.25, "xCoord": 1, "yCoord": 3},
        ]))
        .unwrap();
        assert_eq!(rows[0].distance, 0.10);
        assert_eq!(rows[1].distance, 0.25);
    }

    #[test]
    fn extra_row_fields_are_ignored() {
        let rows = parse_rows(json!([
            {"distance": "0.10", "xCoord": 4, "yCoord": 9, "rank": 1},
        ]))
        .unwrap();
        assert_eq!(rows[0].x_coord, 4);
        assert_eq!(rows[0].y_coord, 9);
    }

    #[test]
    fn malformed_bodies_are_parse_errors() {
        assert!(matches!(
            parse_rows(json!("not rows")),
            Err(SimilarityError::Parse(_))
        ));
        assert!(matches!(
            parse_rows(json!({"distance": "0.1"})),
            Err(SimilarityError::Parse(_))
        ));
        assert!(matches!(
            parse_rows(json!([{"distance": "abc", "xCoord": 1, "yCoord": 2}])),
            Err(SimilarityError::Parse(_))
        ));
    }
}
