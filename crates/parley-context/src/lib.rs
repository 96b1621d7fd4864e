pub mod db;
pub mod error;
pub mod sqlite;
pub mod store;
pub mod types;

pub use error::PersistenceError;
pub use sqlite::SqliteContextStore;
pub use store::{ContextStore, MemoryContextStore};
pub use types::{ConversationContext, ConversationKey, Role, Turn};
