//! Wire vocabulary: one JSON text frame per event, `{"event": ..., "data": ...}`.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Caller-supplied message id. Clients send `Date.now()`-style numbers, but strings are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Number(u64),
    Text(String),
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MessageId::Number(n) => write!(f, "{n}"),
            MessageId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for MessageId {
    fn from(n: u64) -> Self {
        MessageId::Number(n)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        MessageId::Text(s.to_owned())
    }
}

/// A chat line. Fields the relay doesn't know about ride along in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub username: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub seen: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomMessage {
    pub room: String,
    #[serde(flatten)]
    pub message: ChatMessage,
}

/// A private line. Unlike room messages it isn't tracked for seen receipts, so the id is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectMessage {
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    pub username: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub seen: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Expiry deadlines are JS millisecond numbers and may carry a fraction; it is dropped.
fn deadline<'de, D: Deserializer<'de>>(de: D) -> Result<Option<i64>, D::Error> {
    Ok(Option::<f64>::deserialize(de)?.map(|ms| ms.trunc() as i64))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileTransfer {
    pub username: String,
    /// Either a plain room name or `a-b-<recipient>` for a direct transfer.
    pub room: String,
    pub file: Value,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDelivery {
    #[serde(flatten)]
    pub transfer: FileTransfer,
    pub timestamp: String,
    pub seen: bool,
}

/// Everything a client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    Join {
        username: String,
        room: String,
        #[serde(default, deserialize_with = "deadline")]
        expiry: Option<i64>,
    },
    Message(RoomMessage),
    PrivateMessage(DirectMessage),
    AddFriend {
        username: String,
        friend: String,
    },
    CreateRoom {
        name: String,
        #[serde(default, deserialize_with = "deadline")]
        expiry: Option<i64>,
    },
    Typing {
        username: String,
        room: String,
    },
    StopTyping {
        username: String,
        room: String,
    },
    Seen {
        room: String,
        id: MessageId,
    },
    File(FileTransfer),
    Offer {
        offer: Value,
        to: String,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
    },
    Answer {
        answer: Value,
        to: String,
    },
    Candidate {
        candidate: Value,
        to: String,
    },
    Reaction {
        id: MessageId,
        reaction: Value,
    },
    CanvasUpdate {
        room: String,
        data: Value,
    },
    AiQuery {
        room: String,
        query: String,
    },
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        use ClientEvent::*;
        match self {
            Join { .. } => "join",
            Message(_) => "message",
            PrivateMessage(_) => "privateMessage",
            AddFriend { .. } => "addFriend",
            CreateRoom { .. } => "createRoom",
            Typing { .. } => "typing",
            StopTyping { .. } => "stopTyping",
            Seen { .. } => "seen",
            File(_) => "file",
            Offer { .. } => "offer",
            Answer { .. } => "answer",
            Candidate { .. } => "candidate",
            Reaction { .. } => "reaction",
            CanvasUpdate { .. } => "canvasUpdate",
            AiQuery { .. } => "aiQuery",
        }
    }
}

/// Everything the relay may push to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    OnlineUsers(Vec<String>),
    Message(RoomMessage),
    RoomList(Vec<String>),
    RoomExpiry,
    PrivateMessage(DirectMessage),
    FriendsUpdate(Vec<String>),
    Typing(String),
    StopTyping(String),
    SeenUpdate {
        id: MessageId,
        seen: bool,
    },
    File(FileDelivery),
    Offer {
        offer: Value,
        from: Option<String>,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
    },
    Answer {
        answer: Value,
    },
    Candidate {
        candidate: Value,
    },
    CanvasUpdate {
        data: Value,
    },
    AiResponse(String),
    Error(String),
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn join_without_expiry() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "join",
            "data": { "username": "alice", "room": "General" }
        }))
        .unwrap();

        assert_eq!(
            event,
            ClientEvent::Join {
                username: "alice".into(),
                room: "General".into(),
                expiry: None
            }
        );
    }

    #[test]
    fn message_keeps_unknown_fields() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "message",
            "data": {
                "id": 1700000000000u64,
                "username": "alice",
                "room": "General",
                "text": "hi",
                "timestamp": "10:00:00",
                "replyTo": 42
            }
        }))
        .unwrap();

        let ClientEvent::Message(msg) = event else {
            panic!("expected message, got {event:?}");
        };
        assert_eq!(msg.room, "General");
        assert_eq!(msg.message.id, MessageId::Number(1700000000000));
        assert_eq!(msg.message.extra.get("replyTo"), Some(&json!(42)));

        let out = serde_json::to_value(ServerEvent::Message(msg)).unwrap();
        assert_eq!(out["data"]["replyTo"], json!(42));
        assert_eq!(out["data"]["room"], json!("General"));
    }

    #[test]
    fn private_message_needs_no_id() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "privateMessage",
            "data": { "to": "bob", "username": "alice", "text": "psst" }
        }))
        .unwrap();

        let ClientEvent::PrivateMessage(dm) = event else {
            panic!("expected privateMessage, got {event:?}");
        };
        assert_eq!(dm.id, None);
        assert_eq!(dm.text, "psst");

        let out = serde_json::to_value(ServerEvent::PrivateMessage(dm)).unwrap();
        assert_eq!(
            out,
            json!({ "event": "privateMessage", "data": { "to": "bob", "username": "alice", "text": "psst", "seen": false } })
        );
    }

    #[test]
    fn fractional_expiry_is_truncated() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "join",
            "data": { "username": "alice", "room": "Pop-up", "expiry": 1760000000000.5 }
        }))
        .unwrap();
        assert!(matches!(event, ClientEvent::Join { expiry: Some(1760000000000), .. }));

        let event: ClientEvent = serde_json::from_value(json!({
            "event": "createRoom",
            "data": { "name": "Pop-up", "expiry": -5 }
        }))
        .unwrap();
        assert!(matches!(event, ClientEvent::CreateRoom { expiry: Some(-5), .. }));
    }

    #[test]
    fn file_kind_is_type_on_the_wire() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "file",
            "data": { "username": "a", "room": "dm-a-b", "file": "data:...", "type": "image/png", "name": "x.png" }
        }))
        .unwrap();
        let ClientEvent::File(transfer) = event else {
            panic!("expected file");
        };
        assert_eq!(transfer.kind, "image/png");
    }

    #[test]
    fn outbound_shapes() {
        assert_eq!(
            serde_json::to_value(ServerEvent::RoomExpiry).unwrap(),
            json!({ "event": "roomExpiry" })
        );
        assert_eq!(
            serde_json::to_value(ServerEvent::SeenUpdate { id: MessageId::Number(1), seen: true }).unwrap(),
            json!({ "event": "seenUpdate", "data": { "id": 1, "seen": true } })
        );
        assert_eq!(
            serde_json::to_value(ServerEvent::Typing("bob".into())).unwrap(),
            json!({ "event": "typing", "data": "bob" })
        );
    }

    #[test]
    fn unknown_event_is_rejected() {
        let res = serde_json::from_value::<ClientEvent>(json!({ "event": "teleport", "data": {} }));
        assert!(res.is_err());
    }
}
