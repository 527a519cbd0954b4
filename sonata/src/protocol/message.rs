//! Control-plane message schema.
//!
//! Every message travels inside an [`Envelope`] carrying the protocol
//! version. Bodies are JSON:
//!
//! ```text
//! fabric manager   ◄── {"version":1,"body":{"kind":"init","queries":[...]}}
//!                  ◄── {"version":1,"body":{"kind":"delta","delta":{"type":"queries","content":[...]}}}
//!                  ◄── {"version":1,"body":{"kind":"delta","delta":{"type":"output","content":{"qid":1,"payload":...}}}}
//! streaming manager◄── {"version":1,"body":{"queries":[...]}}
//! output listener  ◄── {"version":1,"body":{"qid":1,"payload":...}}
//! ```

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::ProtocolError;
use crate::query::{CompiledDpQuery, CompiledSpQuery, QueryId};

/// Current protocol version.
pub const PROTOCOL_VERSION: u16 = 1;

/// Message sent to the fabric manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigMessage {
    /// Full snapshot of data-plane queries. Sent exactly once.
    Init { queries: Vec<CompiledDpQuery> },

    /// Incremental update after the initial snapshot.
    Delta { delta: DeltaContent },
}

impl ConfigMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigMessage::Init { .. } => "init",
            ConfigMessage::Delta { .. } => "delta",
        }
    }
}

/// Payload of a delta message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum DeltaContent {
    /// Newly compiled data-plane queries.
    Queries(Vec<CompiledDpQuery>),

    /// An output event fed back from the stream plane.
    Output(OutputEvent),
}

/// Full stream-plane configuration for the streaming manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub queries: Vec<CompiledSpQuery>,
}

/// Result emitted by the stream plane for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputEvent {
    pub qid: QueryId,
    pub payload: serde_json::Value,
}

impl OutputEvent {
    pub fn new(qid: QueryId, payload: serde_json::Value) -> Self {
        Self { qid, payload }
    }
}

/// Versioned wrapper around every message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub version: u16,
    pub body: T,
}

/// Encode `body` as a versioned JSON frame.
pub fn encode<T: Serialize>(body: &T) -> Result<Bytes, ProtocolError> {
    let envelope = Envelope {
        version: PROTOCOL_VERSION,
        body,
    };
    Ok(Bytes::from(serde_json::to_vec(&envelope)?))
}

/// Decode a versioned JSON frame.
///
/// The version is checked before the body shape, so a peer speaking a newer
/// protocol gets a version error rather than a schema error.
pub fn decode<T: DeserializeOwned>(frame: &[u8]) -> Result<T, ProtocolError> {
    let envelope: Envelope<serde_json::Value> = serde_json::from_slice(frame)?;
    if envelope.version != PROTOCOL_VERSION {
        return Err(ProtocolError::UnsupportedVersion {
            found: envelope.version,
            expected: PROTOCOL_VERSION,
        });
    }
    Ok(serde_json::from_value(envelope.body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dp(qid: u64, expr: &str) -> CompiledDpQuery {
        CompiledDpQuery {
            qid: QueryId::new(qid),
            expr: expr.to_string(),
        }
    }

    #[test]
    fn test_init_wire_shape() {
        let message = ConfigMessage::Init {
            queries: vec![dp(1, "map(x)")],
        };
        let frame = encode(&message).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&frame).unwrap();
        assert_eq!(
            value,
            json!({"version": 1, "body": {"kind": "init", "queries": [{"qid": 1, "expr": "map(x)"}]}})
        );
    }

    #[test]
    fn test_output_delta_wire_shape() {
        let message = ConfigMessage::Delta {
            delta: DeltaContent::Output(OutputEvent::new(QueryId::new(1), json!("x"))),
        };
        let value: serde_json::Value = serde_json::from_slice(&encode(&message).unwrap()).unwrap();
        assert_eq!(
            value["body"],
            json!({"kind": "delta", "delta": {"type": "output", "content": {"qid": 1, "payload": "x"}}})
        );
    }

    #[test]
    fn test_decode_matches_encoded_message() {
        let message = ConfigMessage::Delta {
            delta: DeltaContent::Queries(vec![dp(3, "filter(y)")]),
        };
        let decoded: ConfigMessage = decode(&encode(&message).unwrap()).unwrap();
        assert_eq!(decoded, message);
        assert_eq!(decoded.kind(), "delta");
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let frame = br#"{"version": 9, "body": {"qid": 1, "payload": null}}"#;
        let err = decode::<OutputEvent>(frame).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnsupportedVersion {
                found: 9,
                expected: PROTOCOL_VERSION
            }
        ));
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        let frame = br#"{"version": 1, "body": {"query": "one"}}"#;
        let err = decode::<OutputEvent>(frame).unwrap_err();
        assert!(matches!(err, ProtocolError::Json(_)));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode::<OutputEvent>(b"\x00\x01garbage").is_err());
    }
}
