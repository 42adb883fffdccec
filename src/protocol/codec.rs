//! Message Codec
//!
//! Self-describing JSON datagrams. Every message carries a `kind` tag;
//! anything that does not decode to a known kind is rejected, never
//! guessed at.

use super::message::Message;
use crate::error::{Error, Result};
use bytes::Bytes;

/// Largest datagram a node sends or reads
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Stateless encoder/decoder for [`Message`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageCodec;

impl MessageCodec {
    /// Encode a message into a single datagram payload
    pub fn encode(message: &Message) -> Result<Bytes> {
        let payload = serde_json::to_vec(message)
            .map_err(|e| Error::Internal(format!("Failed to encode {}: {}", message.kind(), e)))?;

        if payload.len() > MAX_DATAGRAM_SIZE {
            return Err(Error::MessageTooLarge {
                size: payload.len(),
                limit: MAX_DATAGRAM_SIZE,
            });
        }

        Ok(Bytes::from(payload))
    }

    /// Decode a datagram payload; never panics on hostile input
    pub fn decode(payload: &[u8]) -> Result<Message> {
        if payload.is_empty() {
            return Err(Error::MalformedMessage("empty datagram".to_string()));
        }
        if payload.len() > MAX_DATAGRAM_SIZE {
            return Err(Error::MalformedMessage(format!(
                "datagram of {} bytes exceeds {} byte limit",
                payload.len(),
                MAX_DATAGRAM_SIZE
            )));
        }

        serde_json::from_slice(payload).map_err(|e| Error::MalformedMessage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ChildKind, QueryOutcome};
    use assert_matches::assert_matches;

    #[test]
    fn test_wire_form_is_tagged() {
        let bytes = MessageCodec::encode(&Message::register(ChildKind::Subdomain, "com")).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["kind"], "REGISTER");
        assert_eq!(value["childKind"], "SUBDOMAIN");
        assert_eq!(value["name"], "com");
    }

    #[test]
    fn test_decode_query_result() {
        let raw = br#"{"kind":"QUERY_RESULT","outcome":{"type":"REFER","endpoint":"127.0.0.1:53017"}}"#;
        let message = MessageCodec::decode(raw).unwrap();

        assert_eq!(
            message,
            Message::from(QueryOutcome::Refer("127.0.0.1:53017".parse().unwrap()))
        );

        let raw = br#"{"kind":"QUERY_RESULT","outcome":{"type":"NOT_FOUND"}}"#;
        assert_eq!(
            MessageCodec::decode(raw).unwrap(),
            Message::from(QueryOutcome::NotFound)
        );
    }

    #[test]
    fn test_register_result_error_text_is_optional() {
        let ok = MessageCodec::encode(&Message::registered()).unwrap();
        assert!(!String::from_utf8_lossy(&ok).contains("errorText"));

        let raw = br#"{"kind":"REGISTER_RESULT","success":false,"errorText":"name already registered"}"#;
        assert_matches!(
            MessageCodec::decode(raw).unwrap(),
            Message::RegisterResult { success: false, error_text: Some(text) } if text == "name already registered"
        );
    }

    #[test]
    fn test_decode_fails_closed() {
        assert_matches!(MessageCodec::decode(b""), Err(Error::MalformedMessage(_)));
        assert_matches!(
            MessageCodec::decode(br#"{"kind":"REGISTER","childKind":"HO"#),
            Err(Error::MalformedMessage(_))
        );
        assert_matches!(
            MessageCodec::decode(br#"{"kind":"EXPLODE","name":"x"}"#),
            Err(Error::MalformedMessage(_))
        );
        assert_matches!(
            MessageCodec::decode(br#"{"kind":"QUERY"}"#),
            Err(Error::MalformedMessage(_))
        );
        assert_matches!(
            MessageCodec::decode(&[0xff, 0xfe, 0x00, 0x81]),
            Err(Error::MalformedMessage(_))
        );
        assert_matches!(
            MessageCodec::decode(&[b' '; MAX_DATAGRAM_SIZE + 1]),
            Err(Error::MalformedMessage(_))
        );
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let huge = Message::query("a".repeat(MAX_DATAGRAM_SIZE));
        assert_matches!(
            MessageCodec::encode(&huge),
            Err(Error::MessageTooLarge { limit: MAX_DATAGRAM_SIZE, .. })
        );
    }
}
