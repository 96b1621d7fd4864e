//! Rocket.Chat REST host: implements the bridge collaborator traits.
//!
//! Authenticates as the bot account with `X-User-Id` / `X-Auth-Token`.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use parley_bridge::{IdentityReader, MessageReader, OutboundRenderer, RenderError};
use parley_core::config::RocketChatConfig;
use parley_core::types::{BotIdentity, MessageEvent, MessageId, Room, RoomKind, Sender};

use crate::error::HostError;

pub struct RocketChatHost {
    client: reqwest::Client,
    base_url: String,
    user_id: String,
    auth_token: String,
    /// Resolved once; failed lookups are retried on the next event.
    identity: OnceCell<BotIdentity>,
}

/// Rocket.Chat outgoing-webhook payload (only the fields we read).
#[derive(Debug, Clone, Deserialize)]
pub struct OutgoingWebhook {
    pub token: Option<String>,
    pub message_id: String,
    pub channel_id: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub text: String,
    /// Thread id, when the message was posted inside a thread.
    pub tmid: Option<String>,
}

// Rocket.Chat API response types (private, deserialization only)

#[derive(Debug, Deserialize)]
struct RcUser {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    username: String,
}

#[derive(Debug, Deserialize)]
struct RcReaction {
    #[serde(default)]
    usernames: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RcMessage {
    #[serde(rename = "_id")]
    id: String,
    rid: String,
    #[serde(default)]
    msg: String,
    tmid: Option<String>,
    u: RcUser,
    mentions: Option<Vec<RcUser>>,
    #[serde(default)]
    reactions: HashMap<String, RcReaction>,
}

#[derive(Debug, Deserialize)]
struct MessageEnvelope {
    message: RcMessage,
}

#[derive(Debug, Deserialize)]
struct RcRoom {
    #[serde(rename = "_id")]
    id: String,
    t: String,
    #[serde(default)]
    uids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RoomEnvelope {
    room: RcRoom,
}

impl RocketChatHost {
    pub fn new(config: &RocketChatConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.server_url.trim_end_matches('/').to_string(),
            user_id: config.user_id.clone(),
            auth_token: config.auth_token.clone(),
            identity: OnceCell::new(),
        }
    }

    /// Turn a webhook push into a bridge event.
    ///
    /// Returns `None` for rooms the bridge does not handle (livechat,
    /// discussions, ...). Mentions are left unset; the bridge re-reads the
    /// message to get them.
    pub async fn event_from_push(
        &self,
        push: &OutgoingWebhook,
    ) -> Result<Option<MessageEvent>, HostError> {
        let Some(room) = self.room(&push.channel_id).await? else {
            return Ok(None);
        };
        let bot = self.bot_identity().await;
        Ok(Some(event_from_push(push, room, bot.as_ref().map(|b| b.id.as_str()))))
    }

    async fn room(&self, room_id: &str) -> Result<Option<Room>, HostError> {
        let envelope: RoomEnvelope = self.get("rooms.info", &[("roomId", room_id)]).await?;
        Ok(room_from(envelope.room))
    }

    async fn message(&self, id: &MessageId) -> Result<RcMessage, HostError> {
        let envelope: MessageEnvelope = self.get("chat.getMessage", &[("msgId", id.as_str())]).await?;
        Ok(envelope.message)
    }

    async fn fetch_identity(&self) -> Result<BotIdentity, HostError> {
        let me: RcUser = self.get("me", &[]).await?;
        Ok(BotIdentity {
            id: me.id,
            handle: me.username,
        })
    }

    async fn react(&self, message: &MessageId, emoji: &str, on: bool) -> Result<(), HostError> {
        self.post(
            "chat.react",
            json!({ "messageId": message.as_str(), "emoji": emoji, "shouldReact": on }),
        )
        .await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T, HostError> {
        let resp = self
            .client
            .get(format!("{}/api/v1/{endpoint}", self.base_url))
            .header("X-User-Id", &self.user_id)
            .header("X-Auth-Token", &self.auth_token)
            .query(query)
            .send()
            .await?;
        let resp = check(endpoint, resp).await?;
        Ok(resp.json().await?)
    }

    async fn post(&self, endpoint: &str, body: Value) -> Result<(), HostError> {
        let resp = self
            .client
            .post(format!("{}/api/v1/{endpoint}", self.base_url))
            .header("X-User-Id", &self.user_id)
            .header("X-Auth-Token", &self.auth_token)
            .json(&body)
            .send()
            .await?;
        check(endpoint, resp).await?;
        Ok(())
    }
}

async fn check(endpoint: &str, resp: reqwest::Response) -> Result<reqwest::Response, HostError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(HostError::Api {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        message: extract_error(&body),
    })
}

/// Rocket.Chat reports failures as `{"success": false, "error": "..."}`.
fn extract_error(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| body.to_string())
}

fn room_from(room: RcRoom) -> Option<Room> {
    let kind = match room.t.as_str() {
        "d" => RoomKind::DirectMessage,
        "c" => RoomKind::Channel,
        "p" => RoomKind::PrivateGroup,
        other => {
            debug!(room = %room.id, kind = other, "unsupported room type");
            return None;
        }
    };
    let member_ids = if kind == RoomKind::DirectMessage {
        room.uids
    } else {
        Vec::new()
    };
    Some(Room {
        id: room.id,
        kind,
        member_ids,
    })
}

fn event_from_push(push: &OutgoingWebhook, room: Room, bot_id: Option<&str>) -> MessageEvent {
    MessageEvent {
        id: Some(MessageId::from(push.message_id.as_str())),
        thread_id: push.tmid.as_deref().map(MessageId::from),
        text: push.text.clone(),
        room,
        sender: Sender {
            id: push.user_id.clone(),
            username: push.user_name.clone(),
        },
        is_from_bot: bot_id.is_some_and(|id| id == push.user_id),
        mentions: None,
    }
}

fn event_from_message(message: RcMessage, room: Room, bot_id: Option<&str>) -> MessageEvent {
    MessageEvent {
        id: Some(MessageId::from(message.id)),
        thread_id: message.tmid.map(MessageId::from),
        text: message.msg,
        room,
        is_from_bot: bot_id.is_some_and(|id| id == message.u.id),
        sender: Sender {
            id: message.u.id,
            username: message.u.username,
        },
        mentions: message
            .mentions
            .map(|m| m.into_iter().map(|u| u.username).collect()),
    }
}

/// Emoji on the message that `handle` has reacted with.
fn own_reactions(reactions: &HashMap<String, RcReaction>, handle: &str) -> Vec<String> {
    reactions
        .iter()
        .filter(|(_, r)| r.usernames.iter().any(|u| u == handle))
        .map(|(emoji, _)| emoji.clone())
        .collect()
}

#[async_trait]
impl IdentityReader for RocketChatHost {
    async fn bot_identity(&self) -> Option<BotIdentity> {
        match self.identity.get_or_try_init(|| self.fetch_identity()).await {
            Ok(identity) => Some(identity.clone()),
            Err(e) => {
                warn!(error = %e, "could not resolve bot identity");
                None
            }
        }
    }
}

#[async_trait]
impl MessageReader for RocketChatHost {
    async fn message_by_id(&self, id: &MessageId) -> Option<MessageEvent> {
        let message = match self.message(id).await {
            Ok(m) => m,
            Err(e) => {
                warn!(message = %id, error = %e, "failed to re-read message");
                return None;
            }
        };
        let room = match self.room(&message.rid).await {
            Ok(room) => room?,
            Err(e) => {
                warn!(message = %id, error = %e, "failed to read room");
                return None;
            }
        };
        let bot = self.bot_identity().await;
        Some(event_from_message(message, room, bot.as_ref().map(|b| b.id.as_str())))
    }
}

#[async_trait]
impl OutboundRenderer for RocketChatHost {
    async fn send_to_thread(&self, room: &Room, thread: &str, text: &str) -> Result<(), RenderError> {
        self.post(
            "chat.sendMessage",
            json!({ "message": { "rid": room.id, "tmid": thread, "msg": text } }),
        )
        .await?;
        Ok(())
    }

    async fn send_notification(&self, room: &Room, text: &str) -> Result<(), RenderError> {
        self.post(
            "chat.sendMessage",
            json!({ "message": { "rid": room.id, "msg": text } }),
        )
        .await?;
        Ok(())
    }

    async fn add_indicator(&self, message: &MessageId, symbol: &str) -> Result<(), RenderError> {
        self.react(message, symbol, true).await?;
        Ok(())
    }

    async fn remove_indicators(&self, message: &MessageId) -> Result<(), RenderError> {
        let Some(bot) = self.bot_identity().await else {
            return Err(RenderError("bot identity unknown".into()));
        };
        let current = self.message(message).await?;
        for emoji in own_reactions(&current.reactions, &bot.handle) {
            self.react(message, &emoji, false).await?;
        }
        Ok(())
    }
}
