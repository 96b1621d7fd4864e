use serde::{Deserialize, Serialize};

use parley_core::types::MessageId;

use crate::error::{PersistenceError, Result};

/// Identifier a conversation context is stored under.
///
/// Either the thread id of the conversation or, for the first message of an
/// un-threaded exchange, that message's own id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey(pub String);

impl ConversationKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&MessageId> for ConversationKey {
    fn from(id: &MessageId) -> Self {
        Self(id.as_str().to_string())
    }
}

impl From<&str> for ConversationKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One authored message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The ordered turn history of one thread.
///
/// Always holds at least one turn. Turns are only ever appended; consecutive
/// turns with the same role are allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationContext {
    key: ConversationKey,
    turns: Vec<Turn>,
}

impl ConversationContext {
    /// Start a new context seeded with its first turn.
    pub fn new(key: ConversationKey, first: Turn) -> Self {
        Self {
            key,
            turns: vec![first],
        }
    }

    /// Rebuild a context from stored turns, rejecting an empty history.
    pub fn from_turns(key: ConversationKey, turns: Vec<Turn>) -> Result<Self> {
        if turns.is_empty() {
            return Err(PersistenceError::EmptyContext { key: key.0 });
        }
        Ok(Self { key, turns })
    }

    pub fn key(&self) -> &ConversationKey {
        &self.key
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }
}
