use parley_context::PersistenceError;

/// Errors surfaced to the caller of [`Bridge::handle`](crate::handler::Bridge::handle).
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// A host call that posts or decorates a message failed.
///
/// Best-effort: the bridge logs these and carries on.
#[derive(Debug, thiserror::Error)]
#[error("render failed: {0}")]
pub struct RenderError(pub String);
