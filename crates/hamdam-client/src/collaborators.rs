//! Contracts for the chat and image providers.
//!
//! The session only sees these traits; concrete HTTP clients live in
//! [`crate::services`] and tests substitute in-process fakes.

use async_trait::async_trait;
use thiserror::Error;

use hamdam_shared::constants::DEFAULT_SYSTEM_INSTRUCTION;
use hamdam_shared::types::{Role, SafetyLevel};
use hamdam_store::{Conversation, Message};

#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("The {0} API key is not configured. Please contact the administrator.")]
    MissingApiKey(&'static str),

    #[error("Could not reach the provider: {0}")]
    Http(#[from] reqwest::Error),

    #[error("The provider answered with status {status}")]
    Status { status: u16, body: String },

    #[error("The image service response did not contain an image")]
    NoImage,

    #[error("Image generation was blocked by safety settings")]
    SafetyBlocked,

    #[error("The request timed out")]
    Timeout,

    #[error("{0}")]
    Provider(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub system_instruction: String,
    pub messages: Vec<ChatTurn>,
    pub safety_level: Option<SafetyLevel>,
}

impl ChatRequest {
    /// History of `conversation` with empty and image-only messages dropped.
    pub fn from_conversation(conversation: &Conversation) -> Self {
        Self::from_messages(
            &conversation.system_prompt,
            &conversation.messages,
            Some(conversation.safety_level),
        )
    }

    pub fn from_messages(
        system_instruction: &str,
        messages: &[Message],
        safety_level: Option<SafetyLevel>,
    ) -> Self {
        let system_instruction = if system_instruction.trim().is_empty() {
            DEFAULT_SYSTEM_INSTRUCTION.to_string()
        } else {
            system_instruction.to_string()
        };

        let messages = messages
            .iter()
            .filter(|m| m.has_text())
            .filter_map(|m| {
                Some(ChatTurn {
                    role: m.role,
                    content: m.content.clone()?,
                })
            })
            .collect();

        Self {
            system_instruction,
            messages,
            safety_level,
        }
    }
}

/// `None` means the provider answered without any text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub text: Option<String>,
}

#[async_trait]
pub trait ChatCollaborator: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatReply, CollaboratorError>;
}

/// Negative prompt and style preset are passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRequest {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub style_preset: Option<String>,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait ImageCollaborator: Send + Sync {
    /// Image URL or `data:` URL.
    async fn generate(&self, request: ImageRequest) -> Result<String, CollaboratorError>;
}
