use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use hamdam_shared::constants::slices;
use hamdam_shared::types::{CharacterId, Theme};
use hamdam_store::backup::{BackupPayload, ImportStats};

use crate::commands::chat::start_chat;
use crate::error::{ClientError, Result};
use crate::router::{self, AuthMode, NavigationOutcome, Page};
use crate::state::{enter, SharedState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub theme: Theme,
    pub chat_muted: bool,
}

pub fn get_settings(state: &SharedState) -> Result<Settings> {
    let mut guard = enter(state)?;
    Ok(Settings {
        theme: guard.theme(),
        chat_muted: guard.muted(),
    })
}

pub fn toggle_theme(state: &SharedState) -> Result<Theme> {
    let mut guard = enter(state)?;
    let theme = guard.theme().toggled();
    guard.set_theme(theme);
    Ok(theme)
}

pub fn set_chat_muted(state: &SharedState, muted: bool) -> Result<()> {
    let mut guard = enter(state)?;
    guard.set_muted(muted);
    Ok(())
}

pub fn current_page(state: &SharedState) -> Result<Page> {
    Ok(enter(state)?.page)
}

pub fn navigate(state: &SharedState, page: Page) -> Result<Page> {
    let mut guard = enter(state)?;
    guard.page = page;
    Ok(page)
}

pub fn navigate_to_auth(state: &SharedState, mode: AuthMode) -> Result<Page> {
    navigate(state, Page::Auth(mode))
}

/// Pick a character from the catalogue. Anonymous visitors are asked to log
/// in; everyone else lands in the chat with that character.
pub fn select_character(state: &SharedState, id: &CharacterId) -> Result<NavigationOutcome> {
    let logged_in = enter(state)?.current_user().is_some();
    let outcome = router::route_to_chat(logged_in);
    if let NavigationOutcome::Navigated { .. } = outcome {
        start_chat(state, id)?;
    }
    Ok(outcome)
}

pub fn open_character_creator(state: &SharedState) -> Result<NavigationOutcome> {
    let mut guard = enter(state)?;
    let user = guard.current_user();
    let premium = match &user {
        Some(_) => guard.session_user()?.is_premium_at(Utc::now()),
        None => false,
    };

    let outcome = router::route_to_creator(user.is_some(), premium);
    if let NavigationOutcome::Navigated { page } = outcome {
        guard.page = page;
    }
    Ok(outcome)
}

/// Snapshot every slice as pretty JSON. Admin only, since it contains
/// account passwords.
pub fn export_backup(state: &SharedState) -> Result<String> {
    let mut guard = enter(state)?;
    guard.require_admin()?;

    let payload = guard.store.export_backup(slices::ALL);
    let json = serde_json::to_string_pretty(&payload)
        .map_err(|e| ClientError::Validation(format!("Serialization failed: {e}")))?;

    info!(slices = payload.slices.len(), "backup exported");
    Ok(json)
}

/// Restore slices from a backup. Unknown slices are skipped.
pub fn import_backup(state: &SharedState, json: &str) -> Result<ImportStats> {
    let mut guard = enter(state)?;
    guard.require_admin()?;

    let payload: BackupPayload = serde_json::from_str(json)
        .map_err(|e| ClientError::Validation(format!("Invalid backup file: {e}")))?;
    Ok(guard.store.import_backup(&payload, slices::ALL))
}
