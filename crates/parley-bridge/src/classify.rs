//! Addressing decision: whether the assistant engages with a message.
//!
//! Pure and deterministic: no I/O, no clock, no settings lookups. Everything
//! the decision depends on is passed in.

use parley_core::types::{AddressingPolicy, BotIdentity, MessageEvent, RoomKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The bot's own reply inside a thread; absorbed into the context only.
    SelfEcho,
    /// Direct conversation between the sender and the bot.
    DirectEligible,
    /// Bot mentioned in a public channel.
    MentionEligible,
    /// Bot mentioned in a private group. Actionable only with
    /// `enable_in_private_room`.
    PrivateMentionEligible,
    Ignored,
}

impl Decision {
    /// Whether this decision leads to a completion request under `policy`.
    pub fn requests_completion(&self, policy: &AddressingPolicy) -> bool {
        match self {
            Decision::DirectEligible | Decision::MentionEligible => true,
            Decision::PrivateMentionEligible => policy.enable_in_private_room,
            Decision::SelfEcho | Decision::Ignored => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::SelfEcho => "self_echo",
            Decision::DirectEligible => "direct",
            Decision::MentionEligible => "mention",
            Decision::PrivateMentionEligible => "private_mention",
            Decision::Ignored => "ignored",
        }
    }
}

/// Classify one inbound message.
///
/// Messages without an id, or arriving while the bot identity is unknown,
/// are ignored.
pub fn classify(
    event: &MessageEvent,
    policy: &AddressingPolicy,
    bot: Option<&BotIdentity>,
) -> Decision {
    let Some(bot) = bot else {
        return Decision::Ignored;
    };
    if event.id.is_none() {
        return Decision::Ignored;
    }

    if event.is_from_bot {
        // A bot reply only matters when it is anchored to a thread.
        return if event.thread_id.is_some() {
            Decision::SelfEcho
        } else {
            Decision::Ignored
        };
    }

    let mentioned = policy.enable_mention && references_handle(event, &bot.handle);

    match event.room.kind {
        RoomKind::DirectMessage if event.room.has_member(&bot.id) => Decision::DirectEligible,
        RoomKind::Channel if mentioned => Decision::MentionEligible,
        RoomKind::PrivateGroup if mentioned => Decision::PrivateMentionEligible,
        _ => Decision::Ignored,
    }
}

/// Whether the message addresses `handle`.
///
/// Host mention metadata wins when present; otherwise the text is scanned
/// for an `@handle` token.
pub fn references_handle(event: &MessageEvent, handle: &str) -> bool {
    if handle.is_empty() {
        return false;
    }
    match &event.mentions {
        Some(mentions) => mentions.iter().any(|m| m.eq_ignore_ascii_case(handle)),
        None => contains_mention(&event.text, handle),
    }
}

/// `@handle` as a standalone token: not glued to a longer username on the
/// right, not part of an email address on the left.
fn contains_mention(text: &str, handle: &str) -> bool {
    let needle = format!("@{}", handle.to_ascii_lowercase());
    let haystack = text.to_ascii_lowercase();

    haystack.match_indices(&needle).any(|(start, m)| {
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !is_handle_char(c));
        before_ok && !continues_handle(&haystack[start + m.len()..])
    })
}

fn is_handle_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Whether `rest` extends the handle into a longer username.
/// A trailing `.` or `-` only counts when more name characters follow.
fn continues_handle(rest: &str) -> bool {
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) if c.is_alphanumeric() || c == '_' => true,
        Some('.' | '-') => chars.next().is_some_and(char::is_alphanumeric),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::types::{MessageId, Room, Sender};

    fn bot() -> BotIdentity {
        BotIdentity {
            id: "bot-id".into(),
            handle: "gpt".into(),
        }
    }

    fn event(kind: RoomKind, text: &str) -> MessageEvent {
        MessageEvent {
            id: Some(MessageId::from("m1")),
            thread_id: None,
            text: text.into(),
            room: Room {
                id: "r1".into(),
                kind,
                member_ids: match kind {
                    RoomKind::DirectMessage => vec!["alice-id".into(), "bot-id".into()],
                    _ => Vec::new(),
                },
            },
            sender: Sender {
                id: "alice-id".into(),
                username: "alice".into(),
            },
            is_from_bot: false,
            mentions: None,
        }
    }

    fn policy() -> AddressingPolicy {
        AddressingPolicy::default()
    }

    #[test]
    fn direct_message_with_bot_member() {
        let ev = event(RoomKind::DirectMessage, "Hello");
        assert_eq!(classify(&ev, &policy(), Some(&bot())), Decision::DirectEligible);
    }

    #[test]
    fn direct_message_ignores_mention_policy() {
        let ev = event(RoomKind::DirectMessage, "no mention here");
        let p = AddressingPolicy {
            enable_mention: false,
            ..policy()
        };
        assert_eq!(classify(&ev, &p, Some(&bot())), Decision::DirectEligible);
    }

    #[test]
    fn direct_message_without_bot_member_is_ignored() {
        let mut ev = event(RoomKind::DirectMessage, "Hello @gpt");
        ev.room.member_ids = vec!["alice-id".into(), "bob-id".into()];
        assert_eq!(classify(&ev, &policy(), Some(&bot())), Decision::Ignored);
    }

    #[test]
    fn channel_mention() {
        let ev = event(RoomKind::Channel, "@gpt what is rust?");
        assert_eq!(classify(&ev, &policy(), Some(&bot())), Decision::MentionEligible);
    }

    #[test]
    fn channel_mention_disabled() {
        let ev = event(RoomKind::Channel, "@gpt what is rust?");
        let p = AddressingPolicy {
            enable_mention: false,
            ..policy()
        };
        assert_eq!(classify(&ev, &p, Some(&bot())), Decision::Ignored);
    }

    #[test]
    fn channel_without_mention() {
        let ev = event(RoomKind::Channel, "just chatting");
        assert_eq!(classify(&ev, &policy(), Some(&bot())), Decision::Ignored);
    }

    #[test]
    fn private_group_mention_gated_by_policy() {
        let ev = event(RoomKind::PrivateGroup, "hey @gpt");
        let decision = classify(&ev, &policy(), Some(&bot()));
        assert_eq!(decision, Decision::PrivateMentionEligible);
        assert!(!decision.requests_completion(&policy()));

        let open = AddressingPolicy {
            enable_in_private_room: true,
            ..policy()
        };
        assert!(decision.requests_completion(&open));
    }

    #[test]
    fn bot_reply_in_thread_is_self_echo() {
        let mut ev = event(RoomKind::DirectMessage, "Hi there");
        ev.is_from_bot = true;
        ev.thread_id = Some(MessageId::from("m0"));
        assert_eq!(classify(&ev, &policy(), Some(&bot())), Decision::SelfEcho);
    }

    #[test]
    fn bot_message_without_thread_is_ignored() {
        for kind in [RoomKind::DirectMessage, RoomKind::Channel, RoomKind::PrivateGroup] {
            let mut ev = event(kind, "@gpt talking to myself");
            ev.is_from_bot = true;
            assert_eq!(classify(&ev, &policy(), Some(&bot())), Decision::Ignored);
        }
    }

    #[test]
    fn missing_id_or_identity_is_ignored() {
        let mut ev = event(RoomKind::DirectMessage, "Hello");
        assert_eq!(classify(&ev, &policy(), None), Decision::Ignored);
        ev.id = None;
        assert_eq!(classify(&ev, &policy(), Some(&bot())), Decision::Ignored);
    }

    #[test]
    fn mention_metadata_wins_over_text() {
        let mut ev = event(RoomKind::Channel, "@gpt hello");
        ev.mentions = Some(vec!["bob".into()]);
        assert_eq!(classify(&ev, &policy(), Some(&bot())), Decision::Ignored);

        ev.mentions = Some(vec!["GPT".into()]);
        ev.text = "no text mention".into();
        assert_eq!(classify(&ev, &policy(), Some(&bot())), Decision::MentionEligible);
    }

    #[test]
    fn mention_token_boundaries() {
        assert!(contains_mention("@gpt", "gpt"));
        assert!(contains_mention("hi @GPT, help", "gpt"));
        assert!(contains_mention("(@gpt)", "gpt"));
        assert!(contains_mention("ask @gpt.", "gpt"));
        assert!(!contains_mention("@gpt.bot hi", "gpt"));
        assert!(!contains_mention("@gpt4 hello", "gpt"));
        assert!(!contains_mention("mail me at me@gpt", "gpt"));
        assert!(!contains_mention("gpt without at", "gpt"));
    }

    #[test]
    fn empty_handle_never_matches() {
        let ev = event(RoomKind::Channel, "@ hello");
        assert!(!references_handle(&ev, ""));
    }
}
