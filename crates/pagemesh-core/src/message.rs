//! Message encoding and decoding for the Pagemesh wire protocol.
//!
//! One codec multiplexes JSON control messages and raw binary chunks over a
//! single channel. The wire layout, integers big-endian:
//!
//! ```text
//! [0:4)               uint32 headerLength
//! [4:4+headerLength)  UTF-8 JSON header: {"status":200|500, "message"?:..., ...}
//! [4+headerLength:)   payload bytes (possibly zero-length)
//! ```
//!
//! The status code travels inside the JSON header segment and is separated
//! back out on decode, so the user-visible header map round-trips exactly.
//! The `status` key is reserved for the codec.

use crate::LENGTH_PREFIX_SIZE;
use crate::error::MessageError;
use serde_json::{Map, Value};

/// Header key holding the status code
const STATUS_KEY: &str = "status";

/// Header key holding a control token or error description
pub const MESSAGE_KEY: &str = "message";

/// Message status
///
/// The wire values are HTTP-style for familiarity only; no HTTP semantics
/// are implied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Successful message (wire code 200)
    Ok,
    /// Error message (wire code 500); carries a `message` header field
    Error,
}

impl Status {
    /// Get the wire code for this status
    #[must_use]
    pub const fn code(self) -> u64 {
        match self {
            Self::Ok => 200,
            Self::Error => 500,
        }
    }

    /// Parse a wire code into a status
    pub fn from_code(code: u64) -> Result<Self, MessageError> {
        match code {
            200 => Ok(Self::Ok),
            500 => Ok(Self::Error),
            other => Err(MessageError::InvalidStatus(other)),
        }
    }
}

/// One protocol message: status, JSON header map, binary payload.
///
/// The header may be empty and the payload may be zero-length; both are
/// symmetric special cases of the same layout. Encode/decode round-trips
/// exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Message status
    pub status: Status,
    /// JSON header key/value map, without the reserved `status` key
    pub header: Map<String, Value>,
    /// Binary payload; defaults to empty, never absent
    pub payload: Vec<u8>,
}

impl Message {
    /// Create an OK message with an empty header
    #[must_use]
    pub fn ok(payload: Vec<u8>) -> Self {
        Self {
            status: Status::Ok,
            header: Map::new(),
            payload,
        }
    }

    /// Create an OK message with a header and no payload
    #[must_use]
    pub fn ok_with_header(header: Map<String, Value>) -> Self {
        Self {
            status: Status::Ok,
            header,
            payload: Vec::new(),
        }
    }

    /// Create an ERROR message carrying a description in the header
    #[must_use]
    pub fn error(description: impl Into<String>) -> Self {
        let mut header = Map::new();
        header.insert(
            MESSAGE_KEY.to_string(),
            Value::String(description.into()),
        );
        Self {
            status: Status::Error,
            header,
            payload: Vec::new(),
        }
    }

    /// Get a header field as a string slice, if present and a string
    #[must_use]
    pub fn header_str(&self, key: &str) -> Option<&str> {
        self.header.get(key).and_then(Value::as_str)
    }

    /// Description carried by an ERROR message, if any
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.header_str(MESSAGE_KEY)
    }

    /// Encode this message into its wire representation
    pub fn encode(&self) -> Result<Vec<u8>, MessageError> {
        let mut header = self.header.clone();
        header.insert(STATUS_KEY.to_string(), Value::from(self.status.code()));
        let header_bytes = serde_json::to_vec(&header)?;

        let mut buf =
            Vec::with_capacity(LENGTH_PREFIX_SIZE + header_bytes.len() + self.payload.len());
        buf.extend_from_slice(&(header_bytes.len() as u32).to_be_bytes());
        buf.extend_from_slice(&header_bytes);
        buf.extend_from_slice(&self.payload);
        Ok(buf)
    }

    /// Decode a message from its wire representation
    pub fn decode(data: &[u8]) -> Result<Self, MessageError> {
        if data.len() < LENGTH_PREFIX_SIZE {
            return Err(MessageError::TooShort {
                expected: LENGTH_PREFIX_SIZE,
                actual: data.len(),
            });
        }

        let header_len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
        let available = data.len() - LENGTH_PREFIX_SIZE;
        if header_len > available {
            return Err(MessageError::HeaderOverflow {
                header_len,
                available,
            });
        }

        let header_end = LENGTH_PREFIX_SIZE + header_len;
        let header_value: Value = serde_json::from_slice(&data[LENGTH_PREFIX_SIZE..header_end])?;
        let Value::Object(mut header) = header_value else {
            return Err(MessageError::HeaderNotObject);
        };

        let status_value = header.remove(STATUS_KEY).ok_or(MessageError::MissingStatus)?;
        let code = status_value
            .as_u64()
            .ok_or(MessageError::MissingStatus)?;
        let status = Status::from_code(code)?;

        Ok(Self {
            status,
            header,
            payload: data[header_end..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_header_and_payload() {
        let mut header = Map::new();
        header.insert("kind".to_string(), Value::from("chunk"));
        header.insert("index".to_string(), Value::from(7));

        let original = Message {
            status: Status::Ok,
            header: header.clone(),
            payload: b"some page bytes".to_vec(),
        };

        let decoded = Message::decode(&original.encode().unwrap()).unwrap();
        assert_eq!(decoded.status, Status::Ok);
        assert_eq!(decoded.header, header);
        assert_eq!(decoded.payload, b"some page bytes");
    }

    #[test]
    fn test_roundtrip_empty_header() {
        let original = Message::ok(vec![0x00, 0xFF, 0x10]);
        let decoded = Message::decode(&original.encode().unwrap()).unwrap();
        assert!(decoded.header.is_empty());
        assert_eq!(decoded.payload, vec![0x00, 0xFF, 0x10]);
    }

    #[test]
    fn test_roundtrip_empty_payload() {
        let original = Message::ok(Vec::new());
        let decoded = Message::decode(&original.encode().unwrap()).unwrap();
        assert_eq!(decoded.status, Status::Ok);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn test_error_message_carries_description() {
        let original = Message::error("page not found");
        let decoded = Message::decode(&original.encode().unwrap()).unwrap();
        assert_eq!(decoded.status, Status::Error);
        assert_eq!(decoded.error_message(), Some("page not found"));
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn test_decode_too_short() {
        assert!(matches!(
            Message::decode(&[0x00, 0x01]),
            Err(MessageError::TooShort { .. })
        ));
    }

    #[test]
    fn test_decode_header_overflow() {
        // Prefix declares 100 header bytes, only 2 follow.
        let mut data = 100u32.to_be_bytes().to_vec();
        data.extend_from_slice(b"{}");
        assert!(matches!(
            Message::decode(&data),
            Err(MessageError::HeaderOverflow {
                header_len: 100,
                available: 2
            })
        ));
    }

    #[test]
    fn test_decode_missing_status() {
        let header = br#"{"kind":"chunk"}"#;
        let mut data = (header.len() as u32).to_be_bytes().to_vec();
        data.extend_from_slice(header);
        assert!(matches!(
            Message::decode(&data),
            Err(MessageError::MissingStatus)
        ));
    }

    #[test]
    fn test_decode_unknown_status() {
        let header = br#"{"status":404}"#;
        let mut data = (header.len() as u32).to_be_bytes().to_vec();
        data.extend_from_slice(header);
        assert!(matches!(
            Message::decode(&data),
            Err(MessageError::InvalidStatus(404))
        ));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Status::Ok.code(), 200);
        assert_eq!(Status::Error.code(), 500);
        assert_eq!(Status::from_code(200).unwrap(), Status::Ok);
        assert_eq!(Status::from_code(500).unwrap(), Status::Error);
    }
}
