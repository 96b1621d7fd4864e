//! Collaborator interfaces the bridge consumes from the host platform.
//!
//! The gateway implements these over the Rocket.Chat REST API; tests use
//! in-memory fakes.

use async_trait::async_trait;

use parley_core::types::{AddressingPolicy, BotIdentity, MessageEvent, MessageId, Room};

use crate::error::RenderError;

#[async_trait]
pub trait IdentityReader: Send + Sync {
    /// The bot account, or `None` when it cannot be resolved.
    async fn bot_identity(&self) -> Option<BotIdentity>;
}

#[async_trait]
pub trait MessageReader: Send + Sync {
    /// Re-read a message by id, including its mention metadata.
    async fn message_by_id(&self, id: &MessageId) -> Option<MessageEvent>;
}

#[async_trait]
pub trait SettingsReader: Send + Sync {
    /// Current addressing policy. Called once per inbound event.
    async fn policy_flags(&self) -> AddressingPolicy;
}

#[async_trait]
pub trait OutboundRenderer: Send + Sync {
    /// Post `text` as a reply in the thread anchored on `thread`.
    async fn send_to_thread(
        &self,
        room: &Room,
        thread: &str,
        text: &str,
    ) -> Result<(), RenderError>;

    /// Post a notification into the room itself, outside any thread.
    async fn send_notification(&self, room: &Room, text: &str) -> Result<(), RenderError>;

    async fn add_indicator(&self, message: &MessageId, symbol: &str) -> Result<(), RenderError>;

    /// Remove every indicator the bot placed on `message`.
    async fn remove_indicators(&self, message: &MessageId) -> Result<(), RenderError>;
}

/// Fixed policy, for hosts without a live settings source.
pub struct StaticSettings(pub AddressingPolicy);

#[async_trait]
impl SettingsReader for StaticSettings {
    async fn policy_flags(&self) -> AddressingPolicy {
        self.0
    }
}
