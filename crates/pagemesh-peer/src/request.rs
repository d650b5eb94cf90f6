//! Start-message shapes for the four cache operations.
//!
//! A request travels as the JSON header of an OK message, tagged by the
//! `action` field. Every request carries the channel identifier chosen by
//! the initiator, so transports that pre-register logical channels can
//! route the exchange. Field names are an internal contract between the
//! accessor and the service.

use crate::error::PeerError;
use pagemesh_core::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row of a list-pages reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
    /// Page URL
    pub url: String,
    /// Page body length in bytes
    pub length: u64,
}

/// Start message of one cache exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum CacheRequest {
    /// Fetch one cached page by URL (push-variant reply)
    FetchPage {
        /// Initiator-chosen channel identifier
        channel: String,
        /// URL of the page to fetch
        url: String,
    },
    /// List cached pages in a window (pull-variant reply)
    ListPages {
        /// Initiator-chosen channel identifier
        channel: String,
        /// First entry to return
        offset: u64,
        /// Maximum number of entries to return
        limit: u64,
    },
    /// Fetch the exact-membership digest blob (pull-variant reply)
    GetDigest {
        /// Initiator-chosen channel identifier
        channel: String,
    },
    /// Fetch the bloom-filter blob (pull-variant reply)
    GetBloomFilter {
        /// Initiator-chosen channel identifier
        channel: String,
    },
}

impl CacheRequest {
    /// Channel identifier carried by this request
    #[must_use]
    pub fn channel(&self) -> &str {
        match self {
            Self::FetchPage { channel, .. }
            | Self::ListPages { channel, .. }
            | Self::GetDigest { channel }
            | Self::GetBloomFilter { channel } => channel,
        }
    }

    /// Generate a fresh channel identifier (random 64-bit hex)
    #[must_use]
    pub fn new_channel_id() -> String {
        hex::encode(rand::random::<u64>().to_be_bytes())
    }

    /// Build the wire message carrying this request
    pub fn to_message(&self) -> Result<Message, PeerError> {
        let Value::Object(header) = serde_json::to_value(self)? else {
            return Err(PeerError::InvalidRequest(
                "request did not serialize to an object".to_string(),
            ));
        };
        Ok(Message::ok_with_header(header))
    }

    /// Parse a request out of a start message
    pub fn from_message(msg: &Message) -> Result<Self, PeerError> {
        serde_json::from_value(Value::Object(msg.header.clone())).map_err(PeerError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_roundtrip() {
        let request = CacheRequest::FetchPage {
            channel: CacheRequest::new_channel_id(),
            url: "https://example.org/a".to_string(),
        };
        let msg = request.to_message().unwrap();
        let parsed = CacheRequest::from_message(&msg).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn test_request_action_tags() {
        let request = CacheRequest::GetBloomFilter {
            channel: "00ff".to_string(),
        };
        let msg = request.to_message().unwrap();
        assert_eq!(msg.header_str("action"), Some("get-bloom-filter"));
        assert_eq!(msg.header_str("channel"), Some("00ff"));
    }

    #[test]
    fn test_list_pages_fields() {
        let request = CacheRequest::ListPages {
            channel: "01".to_string(),
            offset: 10,
            limit: 5,
        };
        let msg = request.to_message().unwrap();
        let parsed = CacheRequest::from_message(&msg).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn test_unknown_action_rejected() {
        let msg = Message::error("nope");
        assert!(CacheRequest::from_message(&msg).is_err());
    }

    #[test]
    fn test_channel_ids_distinct() {
        let a = CacheRequest::new_channel_id();
        let b = CacheRequest::new_channel_id();
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
    }
}
