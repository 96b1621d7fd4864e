//! The conversational bridge: decides whether an inbound chat message
//! addresses the assistant, keeps the per-thread conversation history, and
//! renders completions back into the host.

pub mod classify;
pub mod conversation;
pub mod error;
pub mod format;
pub mod handler;
pub mod host;
pub mod indicator;
pub mod orchestrator;

pub use classify::{classify, Decision};
pub use conversation::ConversationManager;
pub use error::{BridgeError, RenderError};
pub use handler::{Bridge, EventOutcome};
pub use host::{IdentityReader, MessageReader, OutboundRenderer, SettingsReader, StaticSettings};
pub use indicator::{Indicator, IndicatorState};
pub use orchestrator::{CompletionOrchestrator, Outcome};
