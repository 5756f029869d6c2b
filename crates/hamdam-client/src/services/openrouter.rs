//! OpenRouter chat completions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use hamdam_shared::constants::APP_NAME;
use hamdam_shared::types::Role;

use crate::collaborators::{ChatCollaborator, ChatReply, ChatRequest, CollaboratorError};

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

#[derive(Debug, Serialize, PartialEq, Eq)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// System message first, then the history. Anything not from the assistant
/// is sent as `user`.
fn wire_messages(request: &ChatRequest) -> Vec<WireMessage<'_>> {
    std::iter::once(WireMessage {
        role: "system",
        content: request.system_instruction.as_str(),
    })
    .chain(request.messages.iter().map(|turn| WireMessage {
        role: match turn.role {
            Role::Assistant => "assistant",
            Role::User | Role::System => "user",
        },
        content: turn.content.as_str(),
    }))
    .collect()
}

fn reply_text(response: CompletionResponse) -> ChatReply {
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|t| !t.is_empty());
    ChatReply { text }
}

pub struct OpenRouterClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl OpenRouterClient {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model: model.into(),
        }
    }
}

#[async_trait]
impl ChatCollaborator for OpenRouterClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatReply, CollaboratorError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(CollaboratorError::MissingApiKey("OPENROUTER_API_KEY"))?;

        // OpenRouter has no per-request content filter switch.
        tracing::debug!(
            model = %self.model,
            turns = request.messages.len(),
            safety_level = ?request.safety_level,
            "requesting chat completion"
        );

        let body = CompletionBody {
            model: &self.model,
            messages: wire_messages(&request),
        };

        let resp = self
            .http
            .post(OPENROUTER_URL)
            .bearer_auth(api_key)
            .header("X-Title", APP_NAME)
            .json(&body)
            .send()
            .await?;

        let response: CompletionResponse = super::read_json("OpenRouter", resp).await?;
        Ok(reply_text(response))
    }
}
