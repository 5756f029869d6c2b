//! Conversations and the paid chat turn.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use hamdam_shared::pricing::reply_cost;
use hamdam_shared::types::{CharacterId, ConversationId, Personality, SafetyLevel};
use hamdam_store::{Conversation, Message};

use crate::collaborators::{ChatCollaborator, ChatRequest};
use crate::error::{ClientError, Result};
use crate::ledger;
use crate::router::Page;
use crate::state::{enter, lock, AppState, LoadingReset, SharedState};

pub const OUT_OF_COINS_MESSAGE: &str =
    "You don't have enough coins to send a message. Get a premium subscription for unlimited chat.";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub character_id: Option<String>,
    pub last_updated: String,
    pub unread: usize,
    pub last_message: Option<String>,
}

impl From<&Conversation> for ConversationSummary {
    fn from(c: &Conversation) -> Self {
        Self {
            id: c.id.to_string(),
            title: c.title.clone(),
            character_id: c.character_id.as_ref().map(|id| id.to_string()),
            last_updated: c.last_updated.to_rfc3339(),
            unread: c.unread_count(),
            last_message: c.messages.iter().rev().find_map(|m| m.content.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SendOutcome {
    /// A reply was appended. `cost` is `None` for premium users.
    Replied { cost: Option<u64> },
    /// Nothing was sent; an upsell message was appended instead.
    OutOfCoins,
    /// The provider returned no text; nothing was appended.
    EmptyReply,
    /// The error text was appended as an assistant message.
    Failed { message: String },
}

/// Conversations the caller may touch: their own, or any for an admin.
fn find_mut<'a>(
    conversations: &'a mut [Conversation],
    id: &ConversationId,
    guard: &mut AppState,
) -> Result<&'a mut Conversation> {
    let viewer = guard.session_user_id();
    let conv = conversations
        .iter_mut()
        .find(|c| &c.id == id)
        .ok_or(ClientError::ConversationNotFound)?;

    let owns = viewer.as_ref().is_some_and(|v| conv.belongs_to(v));
    if owns || guard.is_admin {
        Ok(conv)
    } else {
        Err(ClientError::ConversationNotFound)
    }
}

/// Open the conversation with `character_id`, creating it on first use.
pub fn start_chat(state: &SharedState, character_id: &CharacterId) -> Result<ConversationId> {
    let mut guard = enter(state)?;
    let user = guard.session_user()?;
    let is_admin = guard.is_admin;

    let character = guard
        .characters()
        .into_iter()
        .find(|c| &c.id == character_id && c.is_visible_to(Some(&user.id), is_admin))
        .ok_or(ClientError::CharacterNotFound)?;

    let mut conversations = guard.conversations();
    let id = match conversations.iter().find(|c| c.is_between(&user.id, character_id)) {
        Some(existing) => existing.id.clone(),
        None => {
            let conv = Conversation::start(&user.id, &character, Utc::now());
            let id = conv.id.clone();
            conversations.push(conv);
            guard.set_conversations(&conversations);
            info!(conversation_id = %id, character_id = %character_id, "conversation started");
            id
        }
    };

    guard.active_conversation = Some(id.clone());
    guard.page = Page::Chat;
    Ok(id)
}

/// Make `id` active and mark its replies read. Returns how many were unread.
pub fn open_conversation(state: &SharedState, id: &ConversationId) -> Result<usize> {
    let mut guard = enter(state)?;
    let mut conversations = guard.conversations();
    let conv = find_mut(&mut conversations, id, &mut guard)?;

    let changed = conv.mark_read();
    if changed > 0 {
        guard.set_conversations(&conversations);
    }
    guard.active_conversation = Some(id.clone());
    guard.page = Page::Chat;
    Ok(changed)
}

fn own_conversations(guard: &mut AppState) -> Result<Vec<Conversation>> {
    let user = guard.session_user()?;
    let mut own: Vec<Conversation> = guard
        .conversations()
        .into_iter()
        .filter(|c| c.belongs_to(&user.id))
        .collect();
    own.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
    Ok(own)
}

/// The current user's conversations, most recently updated first.
pub fn list_conversations(state: &SharedState) -> Result<Vec<ConversationSummary>> {
    let mut guard = enter(state)?;
    Ok(own_conversations(&mut guard)?
        .iter()
        .map(ConversationSummary::from)
        .collect())
}

/// Every conversation, for the admin panel.
pub fn list_all_conversations(state: &SharedState) -> Result<Vec<ConversationSummary>> {
    let mut guard = enter(state)?;
    guard.require_admin()?;
    let mut all = guard.conversations();
    all.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
    Ok(all.iter().map(ConversationSummary::from).collect())
}

pub fn active_conversation(state: &SharedState) -> Result<Option<Conversation>> {
    let mut guard = enter(state)?;
    let Some(id) = guard.active_conversation.clone() else {
        return Ok(None);
    };
    Ok(guard.conversations().into_iter().find(|c| c.id == id))
}

/// Unread replies across the current user's conversations. Zero when
/// logged out.
pub fn unread_count(state: &SharedState) -> Result<usize> {
    let mut guard = enter(state)?;
    match own_conversations(&mut guard) {
        Ok(own) => Ok(own.iter().map(Conversation::unread_count).sum()),
        Err(ClientError::NotLoggedIn) => Ok(0),
        Err(e) => Err(e),
    }
}

pub fn set_personality(
    state: &SharedState,
    id: &ConversationId,
    personality: Personality,
) -> Result<()> {
    let mut guard = enter(state)?;
    let mut conversations = guard.conversations();
    find_mut(&mut conversations, id, &mut guard)?.personality = personality;
    guard.set_conversations(&conversations);
    Ok(())
}

pub fn set_safety_level(state: &SharedState, id: &ConversationId, level: SafetyLevel) -> Result<()> {
    let mut guard = enter(state)?;
    let mut conversations = guard.conversations();
    find_mut(&mut conversations, id, &mut guard)?.safety_level = level;
    guard.set_conversations(&conversations);
    Ok(())
}

/// Delete a conversation and its history. Owner or admin.
///
/// If it was the open one, the owner's next most recent conversation opens
/// instead, or the view returns to the landing page.
pub fn delete_conversation(state: &SharedState, id: &ConversationId) -> Result<()> {
    let mut guard = enter(state)?;
    let mut conversations = guard.conversations();
    find_mut(&mut conversations, id, &mut guard)?;

    conversations.retain(|c| &c.id != id);
    guard.set_conversations(&conversations);
    info!(conversation_id = %id, "conversation deleted");

    if guard.active_conversation.as_ref() == Some(id) {
        let next = own_conversations(&mut guard)
            .ok()
            .and_then(|own| own.into_iter().next())
            .map(|c| c.id);
        match next {
            Some(next) => guard.active_conversation = Some(next),
            None => {
                guard.active_conversation = None;
                guard.page = Page::Landing;
            }
        }
    }
    Ok(())
}

/// Append `message` to conversation `id` if it still exists.
pub(crate) fn append_if_present(guard: &mut AppState, id: &ConversationId, message: Message) {
    let mut conversations = guard.conversations();
    match conversations.iter_mut().find(|c| &c.id == id) {
        Some(conv) => {
            conv.push(message, Utc::now());
            guard.set_conversations(&conversations);
        }
        None => warn!(conversation_id = %id, "conversation removed while a reply was pending"),
    }
}

/// Send `input` in the open conversation and wait for the reply.
///
/// Non-premium users pay for each reply by its length; with no coins left
/// the message is not sent. Provider failures become an assistant message.
pub async fn send_message(
    state: &SharedState,
    chat: &dyn ChatCollaborator,
    input: &str,
) -> Result<SendOutcome> {
    let text = input.trim();
    if text.is_empty() {
        return Err(ClientError::Validation("Message is empty".into()));
    }

    let (conv_id, user_id, premium, request) = {
        let mut guard = enter(state)?;
        if guard.is_loading {
            return Err(ClientError::Busy);
        }
        let user = guard.session_user()?;
        let conv_id = guard
            .active_conversation
            .clone()
            .ok_or(ClientError::NoActiveConversation)?;
        let now = Utc::now();
        let premium = user.is_premium_at(now);

        let mut conversations = guard.conversations();
        let conv = find_mut(&mut conversations, &conv_id, &mut guard)?;

        if !premium && user.balance == 0 {
            conv.push(Message::upsell(OUT_OF_COINS_MESSAGE, now), now);
            guard.set_conversations(&conversations);
            info!(user_id = %user.id, "chat blocked, no coins left");
            return Ok(SendOutcome::OutOfCoins);
        }

        conv.push(Message::user(text, now), now);
        let request = ChatRequest::from_conversation(conv);
        guard.set_conversations(&conversations);
        guard.is_loading = true;

        (conv_id, user.id, premium, request)
    };
    let loading = LoadingReset::new(state);

    debug!(conversation_id = %conv_id, turns = request.messages.len(), "dispatching chat request");
    let result = chat.complete(request).await;

    let mut guard = lock(state)?;
    loading.finish(&mut guard);

    match result {
        Ok(reply) => {
            let Some(reply) = reply.text.filter(|t| !t.is_empty()) else {
                warn!(conversation_id = %conv_id, "provider returned an empty reply");
                return Ok(SendOutcome::EmptyReply);
            };

            let cost = if premium {
                None
            } else {
                let cost = reply_cost(&reply);
                let mut users = guard.users();
                if let Some(user) = users.iter_mut().find(|u| u.id == user_id) {
                    user.balance = ledger::deduct(user.balance, cost);
                    debug!(user_id = %user_id, cost, balance = user.balance, "reply charged");
                }
                guard.commit_users(&users);
                Some(cost)
            };

            append_if_present(&mut guard, &conv_id, Message::reply(reply, cost, Utc::now()));
            Ok(SendOutcome::Replied { cost })
        }
        Err(e) => {
            warn!(conversation_id = %conv_id, error = %e, "chat request failed");
            let message = e.to_string();
            append_if_present(&mut guard, &conv_id, Message::assistant(&message, Utc::now()));
            Ok(SendOutcome::Failed { message })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Duration;

    use crate::collaborators::{ChatReply, CollaboratorError};
    use crate::commands::accounts::sign_up;
    use crate::config::ClientConfig;
    use hamdam_shared::premium::Subscription;
    use hamdam_shared::types::Role;
    use hamdam_store::SliceStore;

    /// Replays canned replies and records what it was asked.
    struct ScriptedChat {
        replies: Mutex<Vec<std::result::Result<Option<String>, String>>>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedChat {
        fn new(replies: Vec<std::result::Result<Option<String>, String>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatCollaborator for ScriptedChat {
        async fn complete(
            &self,
            request: ChatRequest,
        ) -> std::result::Result<ChatReply, CollaboratorError> {
            self.seen.lock().unwrap().push(request);
            match self.replies.lock().unwrap().remove(0) {
                Ok(text) => Ok(ChatReply { text }),
                Err(message) => Err(CollaboratorError::Provider(message)),
            }
        }
    }

    /// Never answers.
    struct SilentChat;

    #[async_trait]
    impl ChatCollaborator for SilentChat {
        async fn complete(
            &self,
            _request: ChatRequest,
        ) -> std::result::Result<ChatReply, CollaboratorError> {
            std::future::pending().await
        }
    }

    fn shared(starting_balance: u64) -> SharedState {
        let config = ClientConfig {
            starting_balance,
            ..ClientConfig::default()
        };
        AppState::new(SliceStore::in_memory(), config).into_shared()
    }

    fn first_character(state: &SharedState) -> CharacterId {
        state.lock().unwrap().characters()[0].id.clone()
    }

    fn messages(state: &SharedState) -> Vec<Message> {
        active_conversation(state).unwrap().unwrap().messages
    }

    fn balance(state: &SharedState) -> u64 {
        state.lock().unwrap().session_user().unwrap().balance
    }

    #[test]
    fn start_chat_reuses_the_pair() {
        let state = shared(0);
        sign_up(&state, "a@example.com", "pw").unwrap();
        let character = first_character(&state);

        let first = start_chat(&state, &character).unwrap();
        let second = start_chat(&state, &character).unwrap();
        assert_eq!(first, second);

        let conv = active_conversation(&state).unwrap().unwrap();
        assert!(conv.title.starts_with("Chat with "));
        assert_eq!(conv.personality, Personality::Friendly);
        assert_eq!(conv.safety_level, SafetyLevel::Default);
        assert_eq!(list_conversations(&state).unwrap().len(), 1);
    }

    #[test]
    fn stored_conversations_survive_bad_neighbours() {
        let state = shared(0);
        let account = sign_up(&state, "legacy@example.com", "pw").unwrap();
        let (first, second) = {
            let mut guard = state.lock().unwrap();
            let characters = guard.characters();
            (characters[0].id.clone(), characters[1].id.clone())
        };

        let legacy = serde_json::json!({
            "id": "conv_legacy",
            "title": "Chat with an old friend",
            "messages": [],
            "personality": "Playful",
            "systemPrompt": "be kind",
            "safetyLevel": "آسان\u{200c}گیر",
            "lastUpdated": "2025-01-01T00:00:00.000Z",
            "characterId": first.as_str(),
            "userId": account.id.as_str(),
        });
        let broken = serde_json::json!({ "id": "conv_broken", "title": 42 });
        state
            .lock()
            .unwrap()
            .store
            .set_raw(hamdam_shared::constants::slices::CONVERSATIONS, serde_json::json!([legacy, broken]));

        let listed = list_conversations(&state).unwrap();
        assert_eq!(listed.len(), 1);

        start_chat(&state, &second).unwrap();

        let mut guard = state.lock().unwrap();
        let stored = guard
            .store
            .raw(hamdam_shared::constants::slices::CONVERSATIONS)
            .unwrap();
        let ids: Vec<&str> = stored
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|c| c["id"].as_str())
            .collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&"conv_legacy"));
        assert!(ids.contains(&"conv_broken"));

        let legacy = guard
            .conversations()
            .into_iter()
            .find(|c| c.id.as_str() == "conv_legacy")
            .unwrap();
        assert_eq!(legacy.safety_level, SafetyLevel::Relaxed);
    }

    #[test]
    fn start_chat_requires_login() {
        let state = shared(0);
        let character = first_character(&state);
        assert!(matches!(start_chat(&state, &character), Err(ClientError::NotLoggedIn)));
    }

    #[tokio::test]
    async fn reply_is_charged_and_unread() {
        let state = shared(10);
        sign_up(&state, "a@example.com", "pw").unwrap();
        start_chat(&state, &first_character(&state)).unwrap();

        let chat = ScriptedChat::new(vec![Ok(Some("Hi there!".into()))]);
        let outcome = send_message(&state, &chat, "  hello  ").await.unwrap();
        assert_eq!(outcome, SendOutcome::Replied { cost: Some(1) });
        assert_eq!(balance(&state), 9);

        let msgs = messages(&state);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].content.as_deref(), Some("hello"));
        assert_eq!(msgs[1].is_read, Some(false));
        assert_eq!(msgs[1].cost, Some(1));
        assert_eq!(unread_count(&state).unwrap(), 1);

        let seen = chat.seen.lock().unwrap();
        assert_eq!(seen[0].messages.last().map(|t| t.role), Some(Role::User));
        assert!(!state.lock().unwrap().is_loading);
    }

    #[tokio::test]
    async fn zero_balance_is_blocked_before_dispatch() {
        let state = shared(0);
        sign_up(&state, "a@example.com", "pw").unwrap();
        start_chat(&state, &first_character(&state)).unwrap();

        let chat = ScriptedChat::new(vec![]);
        let outcome = send_message(&state, &chat, "hello").await.unwrap();
        assert_eq!(outcome, SendOutcome::OutOfCoins);
        assert!(chat.seen.lock().unwrap().is_empty());

        let msgs = messages(&state);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].action, Some(hamdam_store::MessageAction::Purchase));
    }

    #[tokio::test]
    async fn premium_is_never_charged() {
        let state = shared(0);
        sign_up(&state, "a@example.com", "pw").unwrap();
        {
            let mut guard = state.lock().unwrap();
            let mut user = guard.session_user().unwrap();
            user.subscription = Some(Subscription::until(Utc::now() + Duration::days(1)));
            guard.commit_user(&user);
        }
        start_chat(&state, &first_character(&state)).unwrap();

        let long_reply = "x".repeat(2_000);
        let chat = ScriptedChat::new(vec![Ok(Some(long_reply))]);
        let outcome = send_message(&state, &chat, "hello").await.unwrap();
        assert_eq!(outcome, SendOutcome::Replied { cost: None });
        assert_eq!(balance(&state), 0);
        assert_eq!(messages(&state)[1].cost, None);
    }

    #[tokio::test]
    async fn charge_clamps_at_zero() {
        let state = shared(3);
        sign_up(&state, "a@example.com", "pw").unwrap();
        start_chat(&state, &first_character(&state)).unwrap();

        let chat = ScriptedChat::new(vec![Ok(Some("y".repeat(2_000)))]);
        let outcome = send_message(&state, &chat, "tell me a story").await.unwrap();
        assert_eq!(outcome, SendOutcome::Replied { cost: Some(10) });
        assert_eq!(balance(&state), 0);
    }

    #[tokio::test]
    async fn failures_and_empty_replies() {
        let state = shared(5);
        sign_up(&state, "a@example.com", "pw").unwrap();
        start_chat(&state, &first_character(&state)).unwrap();

        let chat = ScriptedChat::new(vec![Err("provider down".into()), Ok(None)]);

        let failed = send_message(&state, &chat, "one").await.unwrap();
        assert_eq!(failed, SendOutcome::Failed { message: "provider down".into() });
        let empty = send_message(&state, &chat, "two").await.unwrap();
        assert_eq!(empty, SendOutcome::EmptyReply);

        let msgs = messages(&state);
        let contents: Vec<Option<&str>> = msgs.iter().map(|m| m.content.as_deref()).collect();
        assert_eq!(contents, vec![Some("one"), Some("provider down"), Some("two")]);
        assert_eq!(msgs[1].is_read, None);
        assert_eq!(balance(&state), 5);
    }

    #[tokio::test]
    async fn abandoned_request_does_not_leave_the_session_busy() {
        let state = shared(5);
        sign_up(&state, "a@example.com", "pw").unwrap();
        start_chat(&state, &first_character(&state)).unwrap();

        let abandoned = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            send_message(&state, &SilentChat, "hello?"),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(!state.lock().unwrap().is_loading);

        let chat = ScriptedChat::new(vec![Ok(Some("back".into()))]);
        let outcome = send_message(&state, &chat, "still there").await.unwrap();
        assert_eq!(outcome, SendOutcome::Replied { cost: Some(1) });
    }

    #[tokio::test]
    async fn whitespace_reply_is_kept_and_charged() {
        let state = shared(5);
        sign_up(&state, "a@example.com", "pw").unwrap();
        start_chat(&state, &first_character(&state)).unwrap();

        let chat = ScriptedChat::new(vec![Ok(Some("  ".into()))]);
        let outcome = send_message(&state, &chat, "hi").await.unwrap();
        assert_eq!(outcome, SendOutcome::Replied { cost: Some(1) });
        assert_eq!(messages(&state).last().unwrap().content.as_deref(), Some("  "));
        assert_eq!(balance(&state), 4);
    }

    #[test]
    fn opening_marks_replies_read() {
        let state = shared(0);
        sign_up(&state, "a@example.com", "pw").unwrap();
        let id = start_chat(&state, &first_character(&state)).unwrap();
        {
            let mut guard = state.lock().unwrap();
            let mut conversations = guard.conversations();
            conversations[0].push(Message::reply("hey", Some(1), Utc::now()), Utc::now());
            guard.set_conversations(&conversations);
        }
        assert_eq!(unread_count(&state).unwrap(), 1);
        assert_eq!(open_conversation(&state, &id).unwrap(), 1);
        assert_eq!(unread_count(&state).unwrap(), 0);
    }

    #[test]
    fn deleting_active_conversation_moves_to_next_most_recent() {
        let state = shared(0);
        sign_up(&state, "a@example.com", "pw").unwrap();
        let characters: Vec<CharacterId> = state
            .lock()
            .unwrap()
            .characters()
            .iter()
            .map(|c| c.id.clone())
            .collect();

        let older = start_chat(&state, &characters[0]).unwrap();
        let newer = start_chat(&state, &characters[1]).unwrap();
        {
            let mut guard = state.lock().unwrap();
            let mut conversations = guard.conversations();
            for conv in conversations.iter_mut() {
                if conv.id == older {
                    conv.last_updated = Utc::now() - Duration::hours(2);
                }
            }
            guard.set_conversations(&conversations);
        }

        delete_conversation(&state, &newer).unwrap();
        assert_eq!(state.lock().unwrap().active_conversation, Some(older.clone()));

        delete_conversation(&state, &older).unwrap();
        let guard = state.lock().unwrap();
        assert_eq!(guard.active_conversation, None);
        assert_eq!(guard.page, Page::Landing);
    }

    #[test]
    fn others_cannot_touch_a_conversation() {
        let state = shared(0);
        sign_up(&state, "a@example.com", "pw").unwrap();
        let id = start_chat(&state, &first_character(&state)).unwrap();

        sign_up(&state, "b@example.com", "pw").unwrap();
        assert!(matches!(
            set_personality(&state, &id, Personality::Playful),
            Err(ClientError::ConversationNotFound)
        ));
        assert!(matches!(
            delete_conversation(&state, &id),
            Err(ClientError::ConversationNotFound)
        ));

        state.lock().unwrap().is_admin = true;
        set_safety_level(&state, &id, SafetyLevel::Relaxed).unwrap();
        delete_conversation(&state, &id).unwrap();
        assert!(list_all_conversations(&state).unwrap().is_empty());
    }
}
