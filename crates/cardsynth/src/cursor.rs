//! Module: cursor
//! Responsibility: the keyset continuation token and its opaque wire form.
//! Does not own: continuation predicate construction (see `paginate`).

use crate::{document::Document, value::Value};
use serde::{Deserialize, Serialize};

// Longest token accepted by `Cursor::decode`.
const MAX_CURSOR_TOKEN_HEX_LEN: usize = 8 * 1024;

///
/// Cursor
///
/// Last-seen row of a page: the primary sort value plus the unique
/// tie-break id. JSON form is `{ "value": <native>, "id": "<string>" }`.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Cursor {
    pub value: Value,
    pub id: String,
}

impl Cursor {
    #[must_use]
    pub fn new(value: impl Into<Value>, id: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            id: id.into(),
        }
    }

    /// Build the continuation cursor for one row under `sort_field`.
    #[must_use]
    pub fn from_document(doc: &Document, sort_field: &str, id_field: &str) -> Self {
        Self {
            value: doc.value_of(sort_field, id_field),
            id: doc.id.clone(),
        }
    }

    /// Encode as an opaque lowercase hex token.
    #[must_use]
    pub fn encode(&self) -> String {
        // Serializing a struct of plain values cannot fail.
        let bytes = serde_json::to_vec(self).unwrap_or_default();

        encode_hex(&bytes)
    }

    /// Decode an opaque token produced by [`Cursor::encode`].
    pub fn decode(token: &str) -> Result<Self, CursorDecodeError> {
        let bytes = decode_hex(token)?;

        serde_json::from_slice(&bytes).map_err(|err| CursorDecodeError::Payload {
            reason: err.to_string(),
        })
    }
}

///
/// CursorDecodeError
///
/// Rejection reasons for an untrusted cursor token. Positions are 1-based
/// character offsets into the trimmed token.
///

#[derive(Debug, Eq, thiserror::Error, PartialEq)]
pub enum CursorDecodeError {
    #[error("empty cursor token")]
    Empty,

    #[error("cursor token is {len} characters long, limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("cursor token has an odd number of hex digits")]
    OddLength,

    #[error("cursor token has a non-hex character at {position}")]
    InvalidHex { position: usize },

    #[error("cursor payload does not decode: {reason}")]
    Payload { reason: String },
}

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

fn encode_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .flat_map(|byte| [byte >> 4, byte & 0x0f])
        .map(|nibble| char::from(HEX_DIGITS[usize::from(nibble)]))
        .collect()
}

// Surrounding whitespace is ignored and either letter case is accepted.
fn decode_hex(raw: &str) -> Result<Vec<u8>, CursorDecodeError> {
    let hex = raw.trim();

    match hex.len() {
        0 => return Err(CursorDecodeError::Empty),
        len if len > MAX_CURSOR_TOKEN_HEX_LEN => {
            return Err(CursorDecodeError::TooLong {
                len,
                max: MAX_CURSOR_TOKEN_HEX_LEN,
            });
        }
        len if len % 2 == 1 => return Err(CursorDecodeError::OddLength),
        _ => {}
    }

    let nibbles = hex
        .chars()
        .enumerate()
        .map(|(idx, ch)| {
            ch.to_digit(16)
                .map(|digit| digit as u8)
                .ok_or(CursorDecodeError::InvalidHex { position: idx + 1 })
        })
        .collect::<Result<Vec<u8>, _>>()?;

    Ok(nibbles
        .chunks_exact(2)
        .map(|pair| (pair[0] << 4) | pair[1])
        .collect())
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::{Cursor, CursorDecodeError, MAX_CURSOR_TOKEN_HEX_LEN};
    use crate::value::{Timestamp, Value};
    use serde_json::json;

    #[test]
    fn json_form_is_value_and_id() {
        let cursor = Cursor::new(5, "a");

        assert_eq!(
            serde_json::to_value(&cursor).expect("cursor should serialize"),
            json!({ "value": 5, "id": "a" })
        );
    }

    #[test]
    fn token_round_trip_preserves_native_value() {
        for value in [
            Value::Int(5),
            Value::Float(5.0),
            Value::from("Lisbon"),
            Value::Timestamp(Timestamp::from_millis(1_000)),
            Value::Null,
        ] {
            let cursor = Cursor::new(value, "id-9");
            let decoded = Cursor::decode(&cursor.encode()).expect("token should decode");

            assert_eq!(decoded, cursor);
        }
    }

    #[test]
    fn decode_rejects_empty_and_whitespace_tokens() {
        assert_eq!(Cursor::decode(""), Err(CursorDecodeError::Empty));
        assert_eq!(Cursor::decode("  \n\t"), Err(CursorDecodeError::Empty));
    }

    #[test]
    fn decode_rejects_odd_length_and_bad_hex() {
        assert_eq!(Cursor::decode("abc"), Err(CursorDecodeError::OddLength));
        assert_eq!(
            Cursor::decode("0x"),
            Err(CursorDecodeError::InvalidHex { position: 2 })
        );
    }

    #[test]
    fn decode_enforces_max_token_length() {
        let rejected = "aa".repeat(MAX_CURSOR_TOKEN_HEX_LEN / 2 + 1);

        assert_eq!(
            Cursor::decode(&rejected),
            Err(CursorDecodeError::TooLong {
                len: MAX_CURSOR_TOKEN_HEX_LEN + 2,
                max: MAX_CURSOR_TOKEN_HEX_LEN
            })
        );
    }

    #[test]
    fn decode_rejects_well_formed_hex_with_bad_payload() {
        let err = Cursor::decode("7b7d").expect_err("empty object is not a cursor");

        assert!(matches!(err, CursorDecodeError::Payload { .. }));
    }

    #[test]
    fn decode_accepts_uppercase_and_whitespace() {
        let token = Cursor::new(1, "x").encode().to_uppercase();

        let decoded = Cursor::decode(&format!("  {token}  ")).expect("token should decode");
        assert_eq!(decoded, Cursor::new(1, "x"));
    }
}
