use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::Result;
use crate::types::{ConversationContext, ConversationKey, Turn};

/// Persistent mapping from conversation key to its ordered turn history.
///
/// `put` overwrites the whole context (last writer wins). Implementations
/// validate stored shapes on `get` and report malformed entries as
/// [`PersistenceError::Corrupt`](crate::error::PersistenceError::Corrupt).
#[async_trait]
pub trait ContextStore: Send + Sync {
    async fn get(&self, key: &ConversationKey) -> Result<Option<ConversationContext>>;

    async fn put(&self, context: &ConversationContext) -> Result<()>;
}

/// Process-local store, used when `database.ephemeral` is set and in tests.
#[derive(Default)]
pub struct MemoryContextStore {
    entries: DashMap<ConversationKey, Vec<Turn>>,
}

impl MemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ContextStore for MemoryContextStore {
    async fn get(&self, key: &ConversationKey) -> Result<Option<ConversationContext>> {
        match self.entries.get(key) {
            Some(turns) => ConversationContext::from_turns(key.clone(), turns.clone()).map(Some),
            None => Ok(None),
        }
    }

    async fn put(&self, context: &ConversationContext) -> Result<()> {
        self.entries
            .insert(context.key().clone(), context.turns().to_vec());
        Ok(())
    }
}
