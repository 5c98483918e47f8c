//! Collection codec.
//!
//! # Responsibility
//! - Serialize a whole ordered collection as one JSON array.
//! - Reject text that does not decode as a collection of `T`.
//!
//! # Invariants
//! - Element order is preserved in both directions.
//! - Decoding never drops elements it cannot parse; the whole text fails.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Collection encode/decode failure.
#[derive(Debug)]
pub struct CodecError(serde_json::Error);

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "collection codec error: {}", self.0)
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(value: serde_json::Error) -> Self {
        Self(value)
    }
}

/// Encodes `items` as a pretty-printed JSON array with a trailing newline.
pub fn encode_collection<T: Serialize>(items: &[T]) -> Result<String, CodecError> {
    let mut text = serde_json::to_string_pretty(items)?;
    text.push('\n');
    Ok(text)
}

/// Decodes a JSON array into a vector of `T`.
///
/// Empty input is not an empty collection; it fails like any other
/// malformed text.
pub fn decode_collection<T: DeserializeOwned>(text: &str) -> Result<Vec<T>, CodecError> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::{decode_collection, encode_collection};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Item {
        name: String,
    }

    #[test]
    fn encode_preserves_order() {
        let items = vec![
            Item {
                name: "b".to_string(),
            },
            Item {
                name: "a".to_string(),
            },
        ];
        let text = encode_collection(&items).unwrap();
        assert!(text.find("\"b\"").unwrap() < text.find("\"a\"").unwrap());
        let decoded: Vec<Item> = decode_collection(&text).unwrap();
        assert_eq!(decoded, items);
    }

    #[test]
    fn decode_rejects_non_array_and_empty_text() {
        assert!(decode_collection::<Item>("{\"name\":\"x\"}").is_err());
        assert!(decode_collection::<Item>("").is_err());
        assert!(decode_collection::<Item>("[{\"name\":").is_err());
    }

    #[test]
    fn decode_accepts_empty_array() {
        let decoded: Vec<Item> = decode_collection("[]").unwrap();
        assert!(decoded.is_empty());
    }
}
