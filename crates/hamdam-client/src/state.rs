//! Session state shared by every command.
//!
//! [`AppState`] is wrapped in `Arc<Mutex<>>` ([`SharedState`]). Commands hold
//! the lock for their whole synchronous section, so ledger mutations and their
//! audit entries are applied one at a time. The guard is always dropped
//! before awaiting a provider call.

use std::sync::{Arc, Mutex, MutexGuard};

use hamdam_shared::constants::slices;
use hamdam_shared::types::{ConversationId, Theme, UserId, VisitorId};
use hamdam_store::audit;
use hamdam_store::{
    AuditLog, AuditLogEntry, BanList, Character, Conversation, Database, LoginAttempts,
    MemoryBackend, SliceStore, User,
};

use crate::catalog;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::gate::{self, Authenticator, StaticCredentials};
use crate::router::Page;

pub type SharedState = Arc<Mutex<AppState>>;

pub struct AppState {
    /// Persistent slices.
    pub store: SliceStore,

    pub config: ClientConfig,

    /// `None` when admin credentials are not configured.
    pub authenticator: Option<Box<dyn Authenticator>>,

    /// Stable per-installation identifier used by the ban list.
    pub visitor_id: VisitorId,

    /// Granted by a successful admin login. Never persisted.
    pub is_admin: bool,

    pub page: Page,

    pub active_conversation: Option<ConversationId>,

    /// Tag the character list is narrowed to.
    pub filter_tag: Option<String>,

    /// A chat or image request is in flight.
    pub is_loading: bool,
}

impl AppState {
    pub fn new(mut store: SliceStore, config: ClientConfig) -> Self {
        let visitor_id = store.get(slices::VISITOR_ID, VisitorId::new);
        let authenticator = config
            .admin_credentials()
            .map(|(user, pass)| Box::new(StaticCredentials::new(user, pass)) as Box<dyn Authenticator>);

        Self {
            store,
            config,
            authenticator,
            visitor_id,
            is_admin: false,
            page: Page::Landing,
            active_conversation: None,
            filter_tag: None,
            is_loading: false,
        }
    }

    /// Open the on-disk store described by `config`.
    ///
    /// If the database cannot be opened the session runs on an in-memory
    /// store instead; nothing it writes survives the process.
    pub fn open(config: ClientConfig) -> Self {
        let opened = match &config.data_dir {
            Some(dir) => Database::open_in_dir(dir),
            None => Database::new(),
        };

        let store = match opened.or_else(|e| {
            tracing::error!(error = %e, "failed to open database, falling back to in-memory storage");
            Database::open_in_memory()
        }) {
            Ok(db) => SliceStore::new(db),
            Err(e) => {
                tracing::error!(error = %e, "in-memory database unavailable, using plain memory");
                SliceStore::new(MemoryBackend::new())
            }
        };

        Self::new(store, config)
    }

    pub fn into_shared(self) -> SharedState {
        Arc::new(Mutex::new(self))
    }

    // -- slices --

    pub fn users(&mut self) -> Vec<User> {
        self.store.get_list(slices::USERS, Vec::new)
    }

    pub fn current_user(&mut self) -> Option<User> {
        self.store.get(slices::CURRENT_USER, || None)
    }

    pub fn set_current_user(&mut self, user: Option<&User>) {
        self.store.set(slices::CURRENT_USER, &user);
    }

    pub fn characters(&mut self) -> Vec<Character> {
        self.store.get_list(slices::CHARACTERS, catalog::default_characters)
    }

    pub fn set_characters(&mut self, characters: &[Character]) {
        self.store.set(slices::CHARACTERS, &characters);
    }

    pub fn conversations(&mut self) -> Vec<Conversation> {
        self.store.get_list(slices::CONVERSATIONS, Vec::new)
    }

    pub fn set_conversations(&mut self, conversations: &[Conversation]) {
        self.store.set(slices::CONVERSATIONS, &conversations);
    }

    pub fn bans(&mut self) -> BanList {
        self.store.get_list(slices::BANNED_IDS, BanList::new)
    }

    pub fn set_bans(&mut self, bans: &BanList) {
        self.store.set(slices::BANNED_IDS, bans);
    }

    pub fn attempts(&mut self) -> LoginAttempts {
        self.store.get(slices::LOGIN_ATTEMPTS, LoginAttempts::new)
    }

    pub fn set_attempts(&mut self, attempts: &LoginAttempts) {
        self.store.set(slices::LOGIN_ATTEMPTS, attempts);
    }

    pub fn audit_log(&mut self) -> AuditLog {
        self.store.get_list(slices::AUDIT_LOG, AuditLog::new)
    }

    pub fn theme(&mut self) -> Theme {
        self.store.get(slices::THEME, Theme::default)
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.store.set(slices::THEME, &theme);
    }

    pub fn muted(&mut self) -> bool {
        self.store.get(slices::CHAT_MUTED, || false)
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.store.set(slices::CHAT_MUTED, &muted);
    }

    // -- writes that keep slices consistent --

    /// Replace the users slice and refresh the current-user slice from it.
    pub fn commit_users(&mut self, users: &[User]) {
        self.store.set(slices::USERS, &users);

        if let Some(current) = self.current_user() {
            if let Some(updated) = users.iter().find(|u| u.id == current.id) {
                if *updated != current {
                    self.set_current_user(Some(updated));
                }
            }
        }
    }

    /// Replace one user in place.
    pub fn commit_user(&mut self, user: &User) {
        let mut users = self.users();
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user.clone(),
            None => users.push(user.clone()),
        }
        self.commit_users(&users);
    }

    pub fn append_audit(&mut self, entry: AuditLogEntry) {
        let mut log = self.audit_log();
        audit::append(&mut log, entry);
        self.store.set(slices::AUDIT_LOG, &log);
    }

    // -- guards --

    pub fn ensure_not_banned(&mut self) -> Result<()> {
        let bans = self.bans();
        if gate::is_banned(&bans, &self.visitor_id) {
            return Err(ClientError::Banned);
        }
        Ok(())
    }

    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(ClientError::AdminRequired)
        }
    }

    /// The logged-in user, as currently stored in the users slice.
    pub fn session_user(&mut self) -> Result<User> {
        let current = self.current_user().ok_or(ClientError::NotLoggedIn)?;
        let stored = self.users().into_iter().find(|u| u.id == current.id);
        Ok(stored.unwrap_or(current))
    }

    pub fn session_user_id(&mut self) -> Option<UserId> {
        self.current_user().map(|u| u.id)
    }
}

/// Lock the session and refuse banned visitors before anything else.
pub fn enter(state: &SharedState) -> Result<MutexGuard<'_, AppState>> {
    let mut guard = lock(state)?;
    guard.ensure_not_banned()?;
    Ok(guard)
}

/// Lock without the ban check, for the tail of an in-flight request.
pub fn lock(state: &SharedState) -> Result<MutexGuard<'_, AppState>> {
    state.lock().map_err(|_| ClientError::LockPoisoned)
}

/// Clears [`AppState::is_loading`] if the request holding it is dropped
/// before [`finish`](Self::finish) runs.
pub struct LoadingReset<'a> {
    state: Option<&'a SharedState>,
}

impl<'a> LoadingReset<'a> {
    /// Call right after setting `is_loading`, with no await in between.
    pub fn new(state: &'a SharedState) -> Self {
        Self { state: Some(state) }
    }

    pub fn finish(mut self, guard: &mut AppState) {
        guard.is_loading = false;
        self.state = None;
    }
}

impl Drop for LoadingReset<'_> {
    fn drop(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };
        match state.lock() {
            Ok(mut guard) => {
                guard.is_loading = false;
                tracing::debug!("request abandoned, loading flag cleared");
            }
            Err(_) => tracing::warn!("request abandoned on a poisoned session"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: &str, balance: u64) -> User {
        User {
            id: UserId::from(id),
            email: format!("{id}@example.com"),
            password: "pw".into(),
            balance,
            created_at: Utc::now(),
            subscription: None,
        }
    }

    #[test]
    fn visitor_id_is_stable_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..ClientConfig::default()
        };

        let first = AppState::open(config.clone()).visitor_id;
        let second = AppState::open(config).visitor_id;
        assert_eq!(first, second);
        assert!(first.as_str().starts_with("visitor_"));
    }

    #[test]
    fn fresh_store_is_seeded_with_default_characters() {
        let mut state = AppState::new(SliceStore::in_memory(), ClientConfig::default());
        assert!(!state.characters().is_empty());
    }

    #[test]
    fn commit_user_keeps_current_user_in_sync() {
        let mut state = AppState::new(SliceStore::in_memory(), ClientConfig::default());
        let u1 = user("u1", 5);
        state.commit_users(&[u1.clone(), user("u2", 1)]);
        state.set_current_user(Some(&u1));

        let updated = User { balance: 2, ..u1 };
        state.commit_user(&updated);

        assert_eq!(state.current_user(), Some(updated.clone()));
        assert_eq!(state.users().len(), 2);
        assert_eq!(state.session_user().unwrap().balance, 2);
    }

    #[test]
    fn banned_visitor_is_refused() {
        let shared = AppState::new(SliceStore::in_memory(), ClientConfig::default()).into_shared();
        {
            let mut guard = lock(&shared).unwrap();
            let visitor = guard.visitor_id.clone();
            guard.set_bans(&vec![visitor]);
        }
        assert!(matches!(enter(&shared), Err(ClientError::Banned)));
    }

    #[test]
    fn admin_disabled_without_credentials() {
        let state = AppState::new(SliceStore::in_memory(), ClientConfig::default());
        assert!(state.authenticator.is_none());
        assert!(state.require_admin().is_err());
    }
}
