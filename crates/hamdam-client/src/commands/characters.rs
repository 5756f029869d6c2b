use chrono::Utc;
use tracing::info;

use hamdam_shared::types::CharacterId;
use hamdam_store::Character;

use crate::catalog::{self, CharacterDraft};
use crate::error::{ClientError, Result};
use crate::router::Page;
use crate::state::{enter, SharedState};

/// Characters the current viewer may see, narrowed by the active tag filter.
pub fn list_characters(state: &SharedState) -> Result<Vec<Character>> {
    let mut guard = enter(state)?;
    let viewer = guard.session_user_id();
    let characters = guard.characters();
    let tag = guard.filter_tag.clone();

    Ok(
        catalog::visible_characters(&characters, viewer.as_ref(), guard.is_admin, tag.as_deref())
            .into_iter()
            .cloned()
            .collect(),
    )
}

/// Tags offered by the filter bar.
pub fn available_tags(state: &SharedState) -> Result<Vec<String>> {
    let mut guard = enter(state)?;
    let viewer = guard.session_user_id();
    let characters = guard.characters();
    let visible = catalog::visible_characters(&characters, viewer.as_ref(), guard.is_admin, None);
    Ok(catalog::tags_in_use(&visible))
}

pub fn set_filter_tag(state: &SharedState, tag: Option<String>) -> Result<()> {
    let mut guard = enter(state)?;
    guard.filter_tag = tag.filter(|t| !t.trim().is_empty());
    Ok(())
}

/// Build a private character from the creator's answers. Premium only.
pub fn create_character(state: &SharedState, draft: CharacterDraft) -> Result<Character> {
    let mut guard = enter(state)?;
    let user = guard.session_user()?;
    if !user.is_premium_at(Utc::now()) {
        return Err(ClientError::PremiumRequired);
    }

    let character = draft.into_character(&user.id)?;
    let mut characters = guard.characters();
    characters.push(character.clone());
    guard.set_characters(&characters);
    guard.page = Page::Landing;

    info!(character_id = %character.id, creator = %user.id, "character created");
    Ok(character)
}

/// Replace a character from the chat screen editor.
///
/// Allowed for its creator and for admins. When the open conversation is
/// with this character and the system prompt changed, the conversation
/// picks up the new prompt.
pub fn update_character(state: &SharedState, character: Character) -> Result<()> {
    let mut guard = enter(state)?;
    let viewer = guard.session_user_id();
    let mut characters = guard.characters();

    let existing = characters
        .iter()
        .find(|c| c.id == character.id)
        .ok_or(ClientError::CharacterNotFound)?;
    let is_creator = viewer.is_some() && existing.creator_id == viewer;
    if !guard.is_admin && !is_creator {
        return Err(ClientError::AdminRequired);
    }

    if let Some(active) = guard.active_conversation.clone() {
        let mut conversations = guard.conversations();
        if let Some(conv) = conversations.iter_mut().find(|c| c.id == active) {
            if conv.character_id.as_ref() == Some(&character.id)
                && conv.system_prompt != character.system_prompt
            {
                conv.system_prompt = character.system_prompt.clone();
                guard.set_conversations(&conversations);
            }
        }
    }

    catalog::upsert(&mut characters, character);
    guard.set_characters(&characters);
    Ok(())
}

/// Admin insert-or-replace.
pub fn save_character(state: &SharedState, character: Character) -> Result<()> {
    let mut guard = enter(state)?;
    guard.require_admin()?;

    let mut characters = guard.characters();
    info!(character_id = %character.id, "character saved");
    catalog::upsert(&mut characters, character);
    guard.set_characters(&characters);
    Ok(())
}

pub fn delete_character(state: &SharedState, id: &CharacterId) -> Result<()> {
    let mut guard = enter(state)?;
    guard.require_admin()?;

    let mut characters = guard.characters();
    let before = characters.len();
    characters.retain(|c| &c.id != id);
    if characters.len() == before {
        return Err(ClientError::CharacterNotFound);
    }
    guard.set_characters(&characters);
    info!(character_id = %id, "character deleted");
    Ok(())
}
