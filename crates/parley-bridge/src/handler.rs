//! Per-event entry point.
//!
//! Received → Classified → Ignored
//!                       | ContextResolved → TurnAppended → CompletionRequested → Done
//!
//! Every event is handled independently. The policy is read once per event
//! and passed down explicitly.

use std::sync::Arc;

use tracing::{debug, info, warn};

use parley_context::Role;
use parley_core::types::MessageEvent;

use crate::classify::{classify, Decision};
use crate::conversation::ConversationManager;
use crate::error::BridgeError;
use crate::format::error_notification;
use crate::host::{IdentityReader, MessageReader, OutboundRenderer, SettingsReader};
use crate::orchestrator::{CompletionOrchestrator, Outcome};

/// Terminal state of one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Ignored,
    /// A self-echo folded into its thread's context.
    Absorbed,
    Responded(Outcome),
}

pub struct Bridge {
    identity: Arc<dyn IdentityReader>,
    messages: Arc<dyn MessageReader>,
    settings: Arc<dyn SettingsReader>,
    renderer: Arc<dyn OutboundRenderer>,
    conversations: ConversationManager,
    orchestrator: CompletionOrchestrator,
}

impl Bridge {
    pub fn new(
        identity: Arc<dyn IdentityReader>,
        messages: Arc<dyn MessageReader>,
        settings: Arc<dyn SettingsReader>,
        renderer: Arc<dyn OutboundRenderer>,
        conversations: ConversationManager,
        orchestrator: CompletionOrchestrator,
    ) -> Self {
        Self {
            identity,
            messages,
            settings,
            renderer,
            conversations,
            orchestrator,
        }
    }

    /// Run one inbound message through classification, persistence and
    /// completion.
    ///
    /// Only persistence failures are returned as errors. They are also
    /// reported into the room when the event asked for a reply, and no
    /// completion is requested.
    pub async fn handle(&self, mut event: MessageEvent) -> Result<EventOutcome, BridgeError> {
        let policy = self.settings.policy_flags().await;
        let bot = self.identity.bot_identity().await;

        // The host may have built the event before it knew the bot's id.
        if let Some(bot) = &bot {
            event.is_from_bot |= event.sender.id == bot.id;
        }

        let Some(event) = self.complete_metadata(event).await else {
            debug!("message could not be re-read, ignoring");
            return Ok(EventOutcome::Ignored);
        };

        let decision = classify(&event, &policy, bot.as_ref());
        let message_id = event.id.as_ref().map(|id| id.as_str()).unwrap_or_default();

        let key = match ConversationManager::resolve(&event, decision) {
            Some(key) if decision == Decision::SelfEcho || decision.requests_completion(&policy) => key,
            _ => {
                debug!(message = message_id, decision = decision.as_str(), "event ignored");
                return Ok(EventOutcome::Ignored);
            }
        };

        if decision == Decision::SelfEcho {
            let absorbed = match self.conversations.absorb_reply(&key, &event.text).await {
                Ok(absorbed) => absorbed,
                Err(e) => {
                    warn!(message = message_id, key = %key, error = %e, "failed to absorb reply");
                    return Err(e.into());
                }
            };
            return Ok(match absorbed {
                Some(context) => {
                    info!(message = message_id, key = %key, turns = context.len(), "reply absorbed");
                    EventOutcome::Absorbed
                }
                None => {
                    debug!(message = message_id, key = %key, "reply in untracked thread");
                    EventOutcome::Ignored
                }
            });
        }

        let context = match self
            .conversations
            .append_and_persist(&key, Role::User, &event.text)
            .await
        {
            Ok(context) => context,
            Err(e) => {
                warn!(message = message_id, key = %key, error = %e, "failed to persist user turn");
                if let Err(re) = self
                    .renderer
                    .send_notification(&event.room, &error_notification(&e.to_string()))
                    .await
                {
                    warn!(error = %re, "failed to render error notification");
                }
                return Err(e.into());
            }
        };

        let outcome = self
            .orchestrator
            .respond(&context, &event, policy.enable_reaction)
            .await;
        match &outcome {
            Outcome::Success { .. } => {
                info!(message = message_id, key = %key, decision = decision.as_str(), "responded")
            }
            Outcome::Failure { error_message } => {
                warn!(message = message_id, key = %key, error = %error_message, "response failed")
            }
        }
        Ok(EventOutcome::Responded(outcome))
    }

    /// Fill in mention metadata the push event left out by re-reading the
    /// message. Returns `None` when the message cannot be found.
    async fn complete_metadata(&self, mut event: MessageEvent) -> Option<MessageEvent> {
        if event.mentions.is_some() || event.is_from_bot {
            return Some(event);
        }
        let Some(id) = event.id.clone() else {
            return Some(event);
        };
        let full = self.messages.message_by_id(&id).await?;
        event.mentions = full.mentions;
        if event.thread_id.is_none() {
            event.thread_id = full.thread_id;
        }
        Some(event)
    }
}
