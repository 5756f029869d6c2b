//! Domain records persisted inside the slices.
//!
//! Field names follow the camelCase layout the slices have always been
//! written with, and every optional field tolerates being absent so older
//! documents stay readable.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use hamdam_shared::premium::{self, Subscription};
use hamdam_shared::types::{
    CharacterId, ConversationId, MessageId, Personality, Role, SafetyLevel, UserId, VisitorId,
};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    /// Stored in plaintext, as it always has been.
    pub password: String,
    /// Coins. Mutations clamp at zero instead of failing.
    #[serde(deserialize_with = "whole_coins")]
    pub balance: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
}

/// Older records may hold fractional or negative balances; they are read
/// rounded down and clamped at zero.
fn whole_coins<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Coins {
        Whole(u64),
        Fraction(f64),
    }

    Ok(match Coins::deserialize(deserializer)? {
        Coins::Whole(coins) => coins,
        Coins::Fraction(coins) if coins.is_finite() && coins > 0.0 => coins.floor() as u64,
        Coins::Fraction(_) => 0,
    })
}

impl User {
    pub fn is_premium_at(&self, now: DateTime<Utc>) -> bool {
        premium::is_premium(self.subscription.as_ref(), now)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.subscription.as_ref().and_then(|s| s.expires_at)
    }
}

// ---------------------------------------------------------------------------
// Character
// ---------------------------------------------------------------------------

/// A companion profile users can chat with.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub age: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_type: Option<String>,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gif_url: Option<String>,
    pub bio: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roleplay_description: Option<String>,
    /// Handed verbatim to the chat provider as the system instruction.
    pub system_prompt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub about: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<UserId>,
}

impl Character {
    /// Public characters are visible to everyone; private ones only to
    /// their creator and to an admin session.
    pub fn is_visible_to(&self, viewer: Option<&UserId>, is_admin: bool) -> bool {
        if is_admin || !self.is_private {
            return true;
        }
        matches!((viewer, self.creator_id.as_ref()), (Some(v), Some(c)) if v == c)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Call-to-action attached to an assistant message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageAction {
    Purchase,
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_is_loading: Option<bool>,
    pub timestamp: DateTime<Utc>,
    /// Only set on assistant replies; drives unread badges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_read: Option<bool>,
    /// Coins deducted for this reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<MessageAction>,
}

impl Message {
    fn base(role: Role, now: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: None,
            image_url: None,
            image_is_loading: None,
            timestamp: now,
            is_read: None,
            cost: None,
            action: None,
        }
    }

    pub fn user(content: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::base(Role::User, now)
        }
    }

    /// Plain assistant text (errors, notices). Not counted as unread.
    pub fn assistant(content: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::base(Role::Assistant, now)
        }
    }

    /// A model reply, unread until the conversation is opened.
    pub fn reply(content: impl Into<String>, cost: Option<u64>, now: DateTime<Utc>) -> Self {
        Self {
            content: Some(content.into()),
            is_read: Some(false),
            cost,
            ..Self::base(Role::Assistant, now)
        }
    }

    pub fn upsell(content: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            content: Some(content.into()),
            action: Some(MessageAction::Purchase),
            ..Self::base(Role::Assistant, now)
        }
    }

    pub fn image(url: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            image_url: Some(url.into()),
            ..Self::base(Role::Assistant, now)
        }
    }

    pub fn image_loading(now: DateTime<Utc>) -> Self {
        Self {
            image_is_loading: Some(true),
            ..Self::base(Role::Assistant, now)
        }
    }

    pub fn is_unread_reply(&self) -> bool {
        self.role == Role::Assistant && self.is_read == Some(false)
    }

    pub fn has_text(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// The message history between one user and one character.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub personality: Personality,
    pub system_prompt: String,
    #[serde(default)]
    pub safety_level: SafetyLevel,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_id: Option<CharacterId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl Conversation {
    pub fn start(user_id: &UserId, character: &Character, now: DateTime<Utc>) -> Self {
        Self {
            id: ConversationId::new(),
            title: format!("Chat with {}", character.name),
            messages: Vec::new(),
            personality: Personality::default(),
            system_prompt: character.system_prompt.clone(),
            safety_level: SafetyLevel::default(),
            last_updated: now,
            character_id: Some(character.id.clone()),
            user_id: Some(user_id.clone()),
        }
    }

    pub fn belongs_to(&self, user_id: &UserId) -> bool {
        self.user_id.as_ref() == Some(user_id)
    }

    pub fn is_between(&self, user_id: &UserId, character_id: &CharacterId) -> bool {
        self.belongs_to(user_id) && self.character_id.as_ref() == Some(character_id)
    }

    pub fn push(&mut self, message: Message, now: DateTime<Utc>) {
        self.messages.push(message);
        self.last_updated = now;
    }

    pub fn unread_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_unread_reply()).count()
    }

    /// Mark every unread reply as read. Returns how many changed.
    pub fn mark_read(&mut self) -> usize {
        let mut changed = 0;
        for message in self.messages.iter_mut().filter(|m| m.is_unread_reply()) {
            message.is_read = Some(true);
            changed += 1;
        }
        changed
    }

    pub fn message_mut(&mut self, id: &MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| &m.id == id)
    }
}

// ---------------------------------------------------------------------------
// Access control
// ---------------------------------------------------------------------------

/// Visitors denied access to the whole application.
pub type BanList = Vec<VisitorId>;

/// Failed admin logins per visitor.
pub type LoginAttempts = HashMap<VisitorId, u32>;
