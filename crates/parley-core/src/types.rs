use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform-native message identifier.
///
/// Thread ids are message ids too: a thread is anchored on the message
/// that started it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Kind of room a message was posted in. Only used for addressing decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    DirectMessage,
    Channel,
    PrivateGroup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub kind: RoomKind,
    /// Member user ids. Hosts only populate this for direct-message rooms.
    #[serde(default)]
    pub member_ids: Vec<String>,
}

impl Room {
    pub fn has_member(&self, user_id: &str) -> bool {
        self.member_ids.iter().any(|m| m == user_id)
    }
}

/// Author of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: String,
    pub username: String,
}

/// The bot account the bridge speaks as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotIdentity {
    pub id: String,
    /// Username, without the leading `@`.
    pub handle: String,
}

/// One inbound chat message, as pushed by the host platform.
///
/// Not owned by the bridge: it is supplied per invocation and dropped once
/// the event has been handled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    pub id: Option<MessageId>,
    pub thread_id: Option<MessageId>,
    pub text: String,
    pub room: Room,
    pub sender: Sender,
    pub is_from_bot: bool,
    /// Usernames the host resolved as mentioned in this message.
    ///
    /// `None` means the host pushed a partial event without mention metadata;
    /// the bridge re-reads the message by id to recover it.
    #[serde(default)]
    pub mentions: Option<Vec<String>>,
}

/// Process-wide flags controlling when the assistant engages.
///
/// Fetched once per event and passed explicitly; never mutated by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressingPolicy {
    #[serde(default = "bool_true")]
    pub enable_mention: bool,
    #[serde(default)]
    pub enable_in_private_room: bool,
    #[serde(default = "bool_true")]
    pub enable_reaction: bool,
}

impl Default for AddressingPolicy {
    fn default() -> Self {
        Self {
            enable_mention: true,
            enable_in_private_room: false,
            enable_reaction: true,
        }
    }
}

fn bool_true() -> bool {
    true
}
