//! Conversation context resolution and persistence.
//!
//! Every append is a read-modify-write against the [`ContextStore`]. Within
//! this process those are serialised per conversation key, so two messages
//! racing in the same thread both land. Writers in other processes sharing
//! the same store are still last-writer-wins.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use parley_context::{ContextStore, ConversationContext, ConversationKey, PersistenceError, Role, Turn};
use parley_core::types::MessageEvent;

use crate::classify::Decision;

pub struct ConversationManager {
    store: Arc<dyn ContextStore>,
    locks: DashMap<ConversationKey, Arc<Mutex<()>>>,
}

impl ConversationManager {
    pub fn new(store: Arc<dyn ContextStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    /// Key the event's conversation is stored under.
    ///
    /// Threaded messages use the thread id; the first message of an
    /// un-threaded exchange anchors its own thread. Self-echoes must carry
    /// a thread id, and ignored events have no key.
    pub fn resolve(event: &MessageEvent, decision: Decision) -> Option<ConversationKey> {
        match decision {
            Decision::Ignored => None,
            Decision::SelfEcho => event.thread_id.as_ref().map(ConversationKey::from),
            _ => event
                .thread_id
                .as_ref()
                .or(event.id.as_ref())
                .map(ConversationKey::from),
        }
    }

    /// Append one turn to the context under `key`, creating the context if
    /// none exists, and persist the result.
    pub async fn append_and_persist(
        &self,
        key: &ConversationKey,
        role: Role,
        text: &str,
    ) -> Result<ConversationContext, PersistenceError> {
        let turn = Turn {
            role,
            content: text.to_string(),
        };
        self.with_key_lock(key, || async {
            let context = match self.store.get(key).await? {
                Some(mut existing) => {
                    existing.push(turn);
                    existing
                }
                None => ConversationContext::new(key.clone(), turn),
            };
            self.persist(context).await
        })
        .await
    }

    /// Fold the bot's own threaded reply into an existing context.
    ///
    /// Returns `None` when the thread has no stored context: the bot posted
    /// into a thread it is not tracking.
    pub async fn absorb_reply(
        &self,
        key: &ConversationKey,
        text: &str,
    ) -> Result<Option<ConversationContext>, PersistenceError> {
        self.with_key_lock(key, || async {
            match self.store.get(key).await? {
                Some(mut existing) => {
                    existing.push(Turn::assistant(text));
                    self.persist(existing).await.map(Some)
                }
                None => {
                    debug!(key = %key, "no context to extend");
                    Ok(None)
                }
            }
        })
        .await
    }

    async fn persist(
        &self,
        context: ConversationContext,
    ) -> Result<ConversationContext, PersistenceError> {
        self.store.put(&context).await?;
        debug!(key = %context.key(), turns = context.len(), "context persisted");
        Ok(context)
    }

    /// Run `f` while holding the in-process lock for `key`.
    async fn with_key_lock<F, Fut, T>(&self, key: &ConversationKey, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let lock = self.lock_for(key);
        let result = {
            let _guard = lock.lock().await;
            f().await
        };
        drop(lock);
        self.release(key);
        result
    }

    fn lock_for(&self, key: &ConversationKey) -> Arc<Mutex<()>> {
        Arc::clone(
            self.locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// Drop the key's lock entry once no other event holds it.
    fn release(&self, key: &ConversationKey) {
        self.locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
