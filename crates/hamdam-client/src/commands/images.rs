//! In-chat image requests and character portraits.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use hamdam_shared::constants::{
    BLURRED_PLACEHOLDER_URL, PORTRAIT_NEGATIVE_PROMPT, PORTRAIT_STYLE_PRESET,
};
use hamdam_store::Message;

use crate::catalog::CharacterDraft;
use crate::collaborators::{ImageCollaborator, ImageRequest};
use crate::commands::chat::append_if_present;
use crate::error::{ClientError, Result};
use crate::state::{enter, lock, LoadingReset, SharedState};

pub const IMAGE_PROMPT_PREFIX: &str = "[image]";

pub const IMAGE_UPSELL_MESSAGE: &str =
    "Activate a subscription to see images without blur and create unlimited images.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ImageOutcome {
    /// Non-premium: a blurred placeholder and an upsell were appended.
    Blurred,
    Generated { url: String },
    /// The placeholder now carries the error text.
    Failed { message: String },
}

/// Ask for an image in the open conversation.
pub async fn generate_image(
    state: &SharedState,
    images: &dyn ImageCollaborator,
    prompt: &str,
) -> Result<ImageOutcome> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(ClientError::Validation("Describe the image first".into()));
    }

    let (conv_id, placeholder_id) = {
        let mut guard = enter(state)?;
        if guard.is_loading {
            return Err(ClientError::Busy);
        }
        let user = guard.session_user()?;
        let conv_id = guard
            .active_conversation
            .clone()
            .ok_or(ClientError::NoActiveConversation)?;
        let viewer = user.id.clone();
        let is_admin = guard.is_admin;

        let mut conversations = guard.conversations();
        let conv = conversations
            .iter_mut()
            .find(|c| c.id == conv_id && (is_admin || c.belongs_to(&viewer)))
            .ok_or(ClientError::ConversationNotFound)?;

        let now = Utc::now();
        conv.push(Message::user(format!("{IMAGE_PROMPT_PREFIX} {prompt}"), now), now);

        if !user.is_premium_at(now) {
            conv.push(Message::image(BLURRED_PLACEHOLDER_URL, now), now);
            conv.push(Message::upsell(IMAGE_UPSELL_MESSAGE, now), now);
            guard.set_conversations(&conversations);
            info!(user_id = %user.id, "image request answered with blurred placeholder");
            return Ok(ImageOutcome::Blurred);
        }

        let placeholder = Message::image_loading(now);
        let placeholder_id = placeholder.id.clone();
        conv.push(placeholder, now);
        guard.set_conversations(&conversations);
        guard.is_loading = true;

        (conv_id, placeholder_id)
    };
    let loading = LoadingReset::new(state);

    let result = images.generate(ImageRequest::new(prompt)).await;

    let mut guard = lock(state)?;
    loading.finish(&mut guard);

    let outcome = match result {
        Ok(url) => ImageOutcome::Generated { url },
        Err(e) => {
            warn!(conversation_id = %conv_id, error = %e, "image generation failed");
            ImageOutcome::Failed {
                message: format!("Image generation failed: {e}"),
            }
        }
    };

    let mut conversations = guard.conversations();
    let now = Utc::now();
    let placeholder = conversations
        .iter_mut()
        .find(|c| c.id == conv_id)
        .and_then(|conv| {
            conv.last_updated = now;
            conv.message_mut(&placeholder_id)
        });

    match placeholder {
        Some(msg) => {
            msg.image_is_loading = Some(false);
            match &outcome {
                ImageOutcome::Generated { url } => msg.image_url = Some(url.clone()),
                ImageOutcome::Failed { message } => msg.content = Some(message.clone()),
                ImageOutcome::Blurred => {}
            }
            guard.set_conversations(&conversations);
        }
        None => {
            // Placeholder gone with its conversation; report the outcome only.
            if let ImageOutcome::Failed { message } = &outcome {
                append_if_present(&mut guard, &conv_id, Message::assistant(message, now));
            }
        }
    }

    Ok(outcome)
}

/// Generate the portrait for a creator draft. Premium only.
pub async fn generate_portrait(
    state: &SharedState,
    images: &dyn ImageCollaborator,
    draft: &CharacterDraft,
) -> Result<String> {
    {
        let mut guard = enter(state)?;
        let user = guard.session_user()?;
        if !user.is_premium_at(Utc::now()) {
            return Err(ClientError::PremiumRequired);
        }
    }

    let request = ImageRequest {
        prompt: draft.portrait_prompt(),
        negative_prompt: Some(PORTRAIT_NEGATIVE_PROMPT.to_string()),
        style_preset: Some(PORTRAIT_STYLE_PRESET.to_string()),
    };

    let url = images.generate(request).await?;
    info!("character portrait generated");
    Ok(url)
}
