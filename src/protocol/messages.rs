//! Wire message types for the Krist node protocol

use crate::core::{Address, Nonce, ShortHash, Target};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Response to the bootstrap HTTP POST
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapResponse {
    /// Whether the node accepted the handshake
    pub ok: bool,
    /// WebSocket endpoint to connect to, present when `ok`
    #[serde(default)]
    pub url: Option<String>,
    /// Rejection reason, present when not `ok`
    #[serde(default)]
    pub error: Option<String>,
}

/// Block fields carried by a successful submission reply
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyBlock {
    /// Height of the newly mined block
    pub height: u64,
    /// Block reward in krist
    pub value: u64,
    /// Short hash of the new block, i.e. the next `prev_block`
    pub short_hash: ShortHash,
}

/// Reply correlated to an outstanding submission by its `id`
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitReply {
    /// Submission id this reply answers
    pub id: i64,
    /// Whether the submission was accepted
    pub ok: bool,
    /// The mined block, present on success
    #[serde(default)]
    pub block: Option<ReplyBlock>,
    /// New work threshold, present on success
    #[serde(default)]
    pub work: Option<i64>,
    /// Rejection reason, present on failure
    #[serde(default)]
    pub error: Option<String>,
}

impl SubmitReply {
    /// The next mining target announced by a successful reply
    pub fn target(&self) -> Result<Target> {
        let block = self
            .block
            .as_ref()
            .ok_or_else(|| Error::invalid_message("submission reply without block"))?;
        let work = self
            .work
            .ok_or_else(|| Error::invalid_message("submission reply without work"))?;

        Target::new(block.short_hash, work)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct HelloBlock {
    short_hash: ShortHash,
}

/// The `hello` packet sent by the node on connect
#[derive(Debug, Clone, Deserialize)]
pub struct HelloMessage {
    last_block: HelloBlock,
    work: i64,
}

impl HelloMessage {
    /// The initial mining target
    pub fn target(&self) -> Result<Target> {
        Target::new(self.last_block.short_hash, self.work)
    }
}

/// A `block` event, sent whenever any block is mined on the network
#[derive(Debug, Clone, Deserialize)]
pub struct BlockEvent {
    block: HelloBlock,
    new_work: i64,
}

impl BlockEvent {
    /// The fresh mining target
    pub fn target(&self) -> Result<Target> {
        Target::new(self.block.short_hash, self.new_work)
    }
}

/// An inbound message, classified for dispatch.
///
/// Classification order matches the protocol: a numeric `id` marks a
/// submission reply, then `type` selects hello or block events, and
/// everything else (keepalives included) is ignored.
#[derive(Debug, Clone)]
pub enum ServerMessage {
    /// Reply to a submission
    Reply(SubmitReply),
    /// Initial target announcement
    Hello(HelloMessage),
    /// Target change caused by a block found anywhere on the network
    Block(BlockEvent),
    /// Anything else; ignored
    Other,
}

impl ServerMessage {
    /// Parse a text frame into a classified message
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;

        if value.get("id").map_or(false, Value::is_i64) {
            return Ok(Self::Reply(serde_json::from_value(value)?));
        }

        let msg_type = value.get("type").and_then(Value::as_str).map(str::to_owned);
        let is_block_event = value.get("event").and_then(Value::as_str) == Some("block");

        match msg_type.as_deref() {
            Some("hello") => Ok(Self::Hello(serde_json::from_value(value)?)),
            Some("event") if is_block_event => Ok(Self::Block(serde_json::from_value(value)?)),
            _ => Ok(Self::Other),
        }
    }
}

/// Marker serializing as the literal `"submit_block"`
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmitBlockType;

impl Serialize for SubmitBlockType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str("submit_block")
    }
}

/// Outbound block submission
#[derive(Debug, Clone, Serialize)]
pub struct SubmitBlock {
    /// Message type, always `submit_block`
    #[serde(rename = "type")]
    pub msg_type: SubmitBlockType,
    /// Submission id the reply will carry back
    pub id: u64,
    /// Address the solution is valid for
    pub address: Address,
    /// The winning nonce
    pub nonce: String,
}

impl SubmitBlock {
    /// Build a submission for the given nonce under the given id
    pub fn new(id: u64, address: Address, nonce: Nonce) -> Self {
        Self {
            msg_type: SubmitBlockType,
            id,
            address,
            nonce: nonce.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn test_parse_hello() {
        let text = r#"{
            "ok": true,
            "type": "hello",
            "last_block": {"short_hash": "0000000a5f63", "height": 2000},
            "work": 100000
        }"#;

        match ServerMessage::parse(text).unwrap() {
            ServerMessage::Hello(hello) => {
                let target = hello.target().unwrap();
                assert_eq!(target.prev_block.to_string(), "0000000a5f63");
                assert_eq!(target.work, 100_000);
            }
            other => panic!("expected hello, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_block_event() {
        let text = r#"{
            "type": "event",
            "event": "block",
            "block": {"short_hash": "0000000b1234", "height": 2001},
            "new_work": 95000
        }"#;

        match ServerMessage::parse(text).unwrap() {
            ServerMessage::Block(event) => {
                let target = event.target().unwrap();
                assert_eq!(target.prev_block.to_string(), "0000000b1234");
                assert_eq!(target.work, 95_000);
            }
            other => panic!("expected block event, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_accepted_reply() {
        let text = r#"{
            "id": 3,
            "ok": true,
            "success": true,
            "work": 90000,
            "block": {"height": 2002, "value": 25, "short_hash": "0000000c9abc"}
        }"#;

        match ServerMessage::parse(text).unwrap() {
            ServerMessage::Reply(reply) => {
                assert_eq!(reply.id, 3);
                assert!(reply.ok);
                let target = reply.target().unwrap();
                assert_eq!(target.work, 90_000);
                assert_eq!(reply.block.unwrap().value, 25);
            }
            other => panic!("expected reply, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejected_reply() {
        let text = r#"{"id": 4, "ok": false, "error": "solution_incorrect"}"#;

        match ServerMessage::parse(text).unwrap() {
            ServerMessage::Reply(reply) => {
                assert!(!reply.ok);
                assert_eq!(reply.error.as_deref(), Some("solution_incorrect"));
                assert!(reply.target().is_err());
            }
            other => panic!("expected reply, got {:?}", other),
        }
    }

    #[test]
    fn test_keepalive_is_ignored() {
        let text = r#"{"type": "keepalive", "server_time": "2021-01-01T00:00:00Z"}"#;
        assert!(matches!(
            ServerMessage::parse(text).unwrap(),
            ServerMessage::Other
        ));
    }

    #[test]
    fn test_non_numeric_id_is_not_a_reply() {
        let text = r#"{"id": "abc", "type": "hello", "last_block": {"short_hash": "000000000000"}, "work": 1}"#;
        assert!(matches!(
            ServerMessage::parse(text).unwrap(),
            ServerMessage::Hello(_)
        ));
    }

    #[test]
    fn test_submit_block_serialization() {
        let address = Address::from_str("k5ztameslf").unwrap();
        let nonce = Nonce::from_solution_buffer(b"ab0123456789xyz").unwrap();
        let submit = SubmitBlock::new(7, address, nonce);

        let expected = json!({
            "type": "submit_block",
            "id": 7,
            "address": "k5ztameslf",
            "nonce": "ab0123456789"
        });
        assert_eq!(serde_json::to_value(&submit).unwrap(), expected);
    }

    #[test]
    fn test_bootstrap_response() {
        let ok: BootstrapResponse =
            serde_json::from_str(r#"{"ok": true, "url": "wss://example/ws"}"#).unwrap();
        assert!(ok.ok);
        assert_eq!(ok.url.as_deref(), Some("wss://example/ws"));

        let rejected: BootstrapResponse =
            serde_json::from_str(r#"{"ok": false, "error": "rate_limited"}"#).unwrap();
        assert!(!rejected.ok);
        assert_eq!(rejected.error.as_deref(), Some("rate_limited"));
    }
}
