//! One completion round-trip for an actionable message.
//!
//! Sends the full context to the backend, renders the first choice into the
//! conversation thread, and reflects progress through message indicators.
//! The assistant turn is not persisted here: the bot's rendered reply comes
//! back as an inbound event and is absorbed as a self-echo.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use parley_agent::{CompletionBackend, CompletionError, CompletionOptions};
use parley_context::ConversationContext;
use parley_core::types::MessageEvent;

use crate::format::{error_notification, normalize_reply};
use crate::host::OutboundRenderer;
use crate::indicator::Indicator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { rendered_text: String },
    Failure { error_message: String },
}

pub struct CompletionOrchestrator {
    backend: Arc<dyn CompletionBackend>,
    renderer: Arc<dyn OutboundRenderer>,
    options: CompletionOptions,
}

impl CompletionOrchestrator {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        renderer: Arc<dyn OutboundRenderer>,
        options: CompletionOptions,
    ) -> Self {
        Self {
            backend,
            renderer,
            options,
        }
    }

    /// Request a completion for `context` and render the outcome.
    ///
    /// Never fails: backend errors become a notification in the room, and
    /// renderer errors are logged.
    #[instrument(skip_all, fields(key = %context.key(), backend = self.backend.name()))]
    pub async fn respond(
        &self,
        context: &ConversationContext,
        event: &MessageEvent,
        reactions: bool,
    ) -> Outcome {
        let mut indicator = event
            .id
            .clone()
            .map(|id| Indicator::new(Arc::clone(&self.renderer), id, reactions));
        if let Some(ind) = indicator.as_mut() {
            ind.working().await;
        }

        let options = self.options.clone().for_user(event.sender.username.clone());
        let result = self
            .backend
            .complete(context.turns(), &options)
            .await
            .and_then(|completion| {
                let text = completion
                    .first_text()
                    .map(normalize_reply)
                    .ok_or_else(|| CompletionError::Parse("response contained no choices".into()))?;
                Ok((completion, text))
            });

        match result {
            Ok((completion, text)) => {
                if let Err(e) = self
                    .renderer
                    .send_to_thread(&event.room, context.key().as_str(), &text)
                    .await
                {
                    warn!(error = %e, "failed to render reply");
                }
                if let Some(ind) = indicator.as_mut() {
                    ind.succeed().await;
                }
                info!(
                    turns = context.len(),
                    model = %completion.model,
                    tokens_in = completion.tokens_in,
                    tokens_out = completion.tokens_out,
                    "completion rendered"
                );
                Outcome::Success {
                    rendered_text: text,
                }
            }
            Err(e) => {
                let message = e.user_message();
                warn!(error = %e, "completion failed");
                if let Err(e) = self
                    .renderer
                    .send_notification(&event.room, &error_notification(&message))
                    .await
                {
                    warn!(error = %e, "failed to render error notification");
                }
                if let Some(ind) = indicator.as_mut() {
                    ind.fail().await;
                }
                Outcome::Failure {
                    error_message: message,
                }
            }
        }
    }
}
