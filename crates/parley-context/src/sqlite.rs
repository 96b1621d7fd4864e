use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, instrument};

use crate::error::{PersistenceError, Result};
use crate::store::ContextStore;
use crate::types::{ConversationContext, ConversationKey, Turn};

/// SQLite-backed context store.
///
/// Each context is one row holding its turns as a JSON array. Wraps a single
/// connection in a `Mutex`; callers are expected to have run
/// [`init_db`](crate::db::init_db) on it.
pub struct SqliteContextStore {
    db: Mutex<Connection>,
}

impl SqliteContextStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| PersistenceError::Unavailable("context store lock poisoned".into()))
    }
}

#[async_trait]
impl ContextStore for SqliteContextStore {
    #[instrument(skip(self), fields(key = %key))]
    async fn get(&self, key: &ConversationKey) -> Result<Option<ConversationContext>> {
        let raw: Option<String> = self
            .conn()?
            .query_row(
                "SELECT turns FROM conversation_contexts WHERE conversation_key = ?1",
                rusqlite::params![key.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => {
                let context = decode_turns(key, &json)?;
                debug!(turns = context.len(), "context loaded");
                Ok(Some(context))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, context), fields(key = %context.key(), turns = context.len()))]
    async fn put(&self, context: &ConversationContext) -> Result<()> {
        let turns = serde_json::to_string(context.turns()).map_err(|e| {
            PersistenceError::Corrupt {
                key: context.key().to_string(),
                reason: e.to_string(),
            }
        })?;
        let now = chrono::Utc::now().to_rfc3339();

        self.conn()?.execute(
            "INSERT INTO conversation_contexts
                 (conversation_key, turns, turn_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(conversation_key) DO UPDATE SET
                 turns      = excluded.turns,
                 turn_count = excluded.turn_count,
                 updated_at = excluded.updated_at",
            rusqlite::params![context.key().as_str(), turns, context.len() as i64, now],
        )?;
        Ok(())
    }
}

/// Validate a stored JSON turn list at the store boundary.
fn decode_turns(key: &ConversationKey, json: &str) -> Result<ConversationContext> {
    let turns: Vec<Turn> = serde_json::from_str(json).map_err(|e| PersistenceError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    if turns.is_empty() {
        return Err(PersistenceError::Corrupt {
            key: key.to_string(),
            reason: "stored context has no turns".into(),
        });
    }
    ConversationContext::from_turns(key.clone(), turns)
}
