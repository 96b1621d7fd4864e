use rusqlite::Connection;

use crate::error::Result;

/// Initialise the conversation context table.
///
/// Safe to call on every startup: uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS conversation_contexts (
            conversation_key TEXT PRIMARY KEY,
            turns            TEXT NOT NULL,
            turn_count       INTEGER NOT NULL,
            created_at       TEXT NOT NULL,
            updated_at       TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_contexts_updated
            ON conversation_contexts(updated_at DESC);",
    )?;
    Ok(())
}
