use crate::core::Block;
use crate::error::{LedgerError, Result};
use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

const QUERY_LATEST: u8 = 1;
const QUERY_ALL: u8 = 2;
const RESPONSE_LATEST: u8 = 3;
const RESPONSE_ALL: u8 = 4;
const QUERY_IDENTITY: u8 = 5;
const RESPONSE_IDENTITY: u8 = 6;

/// Gossip messages exchanged between peers.
///
/// On the wire each message is `{"type": <int>, "data": <json>}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawMessage")]
pub enum Message {
    QueryLatest,
    QueryAll,
    ResponseLatest(Vec<Block>),
    ResponseAll(Vec<Block>),
    QueryIdentity,
    ResponseIdentity(String),
}

#[derive(Serialize, Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    data: Value,
}

impl Message {
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(line: &str) -> Result<Message> {
        Message::from_slice(line.as_bytes())
    }

    /// Decode one raw frame. Bytes that are not UTF-8 JSON are malformed.
    pub fn from_slice(frame: &[u8]) -> Result<Message> {
        serde_json::from_slice(frame).map_err(|e| LedgerError::MalformedMessage(e.to_string()))
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        RawMessage::try_from(self)
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

fn blocks_from(data: Value) -> std::result::Result<Vec<Block>, String> {
    if data.is_null() {
        return Ok(vec![]);
    }
    serde_json::from_value(data).map_err(|e| format!("Invalid block list: {e}"))
}

impl TryFrom<RawMessage> for Message {
    type Error = String;

    fn try_from(raw: RawMessage) -> std::result::Result<Self, Self::Error> {
        match raw.kind {
            QUERY_LATEST => Ok(Message::QueryLatest),
            QUERY_ALL => Ok(Message::QueryAll),
            RESPONSE_LATEST => blocks_from(raw.data).map(Message::ResponseLatest),
            RESPONSE_ALL => blocks_from(raw.data).map(Message::ResponseAll),
            QUERY_IDENTITY => Ok(Message::QueryIdentity),
            RESPONSE_IDENTITY => match raw.data {
                Value::String(endpoint) => Ok(Message::ResponseIdentity(endpoint)),
                other => Err(format!("Identity must be a string, got {other}")),
            },
            kind => Err(format!("Unknown message type {kind}")),
        }
    }
}

impl TryFrom<&Message> for RawMessage {
    type Error = serde_json::Error;

    fn try_from(message: &Message) -> std::result::Result<Self, Self::Error> {
        let (kind, data) = match message {
            Message::QueryLatest => (QUERY_LATEST, Value::Null),
            Message::QueryAll => (QUERY_ALL, Value::Null),
            Message::ResponseLatest(blocks) => (RESPONSE_LATEST, serde_json::to_value(blocks)?),
            Message::ResponseAll(blocks) => (RESPONSE_ALL, serde_json::to_value(blocks)?),
            Message::QueryIdentity => (QUERY_IDENTITY, Value::Null),
            Message::ResponseIdentity(endpoint) => {
                (RESPONSE_IDENTITY, Value::String(endpoint.clone()))
            }
        };
        Ok(RawMessage { kind, data })
    }
}
